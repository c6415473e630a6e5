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


use reedline::{ValidationResult, Validator};

/// A statement is complete once its parentheses and quotes are closed and it
/// ends with `;`. Dot commands are always complete.
pub struct SqlValidator;

impl Validator for SqlValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('.') {
            return ValidationResult::Complete;
        }

        let scan = scan(trimmed);
        if scan.depth > 0 || scan.open_quote {
            return ValidationResult::Incomplete;
        }
        if scan.last_code_char != Some(';') {
            return ValidationResult::Incomplete;
        }
        ValidationResult::Complete
    }
}

struct Scan {
    depth: i32,
    open_quote: bool,
    /// Last character outside quotes and `--` comments.
    last_code_char: Option<char>,
}

fn scan(sql: &str) -> Scan {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut last = None;
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                last = Some(ch);
            }
            Some(_) => {}
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    last = Some(ch);
                }
                '-' if chars.peek() == Some(&'-') => {
                    // comment runs to end of line
                    for c in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '(' => {
                    depth += 1;
                    last = Some(ch);
                }
                ')' => {
                    depth -= 1;
                    last = Some(ch);
                }
                c if c.is_whitespace() => {}
                c => last = Some(c),
            },
        }
    }
    Scan {
        depth,
        open_quote: quote.is_some(),
        last_code_char: last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(line: &str) -> bool {
        matches!(SqlValidator.validate(line), ValidationResult::Complete)
    }

    #[test]
    fn needs_terminating_semicolon() {
        assert!(!complete("SELECT a FROM t"));
        assert!(complete("SELECT a FROM t;"));
        assert!(complete(".tables"));
    }

    #[test]
    fn semicolon_inside_quotes_or_comment_does_not_count() {
        assert!(!complete("SELECT ';"));
        assert!(!complete("SELECT a FROM t -- done;"));
        assert!(!complete("SELECT count(a;"));
    }
}
