//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.


// ANSI styling for REPL output.
//
// Plain 16-color palette codes, so output follows the terminal's own theme.

pub const BOLD: &str = "\x1b[1m";
pub const ITALIC: &str = "\x1b[3m";
pub const R: &str = "\x1b[0m";

// Result tables
pub const BORDER: &str = "\x1b[90m";
pub const HEADER: &str = "\x1b[1;36m";
pub const KIND: &str = "\x1b[90m";
pub const TEXT: &str = "\x1b[39m";
pub const NULL_CLR: &str = "\x1b[90m";
pub const FOOTER: &str = "\x1b[90m";

// Messages
pub const ERROR: &str = "\x1b[1;31m";
pub const SUCCESS: &str = "\x1b[32m";
pub const TIMER: &str = "\x1b[90m";

// Banner and help
pub const BAN_BORDER: &str = "\x1b[34m";
pub const BAN_TITLE: &str = "\x1b[1;36m";
pub const BAN_INFO: &str = "\x1b[39m";
pub const HINT: &str = "\x1b[90m";
pub const COMMAND: &str = "\x1b[36m";
