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


//! A miniature tabular query engine.
//!
//! Tables of typed rows are queried with SQL-like semantics: filter, grouping,
//! post-aggregate filtering, multi-key ordering and limits. The core works on
//! structured [`Query`] values; the [`sql`] module translates SQL text into
//! them and keeps a small table registry.

pub mod error;
pub mod expr;
pub mod fetch;
pub mod functions;
pub mod grouping;
pub mod ordering;
pub mod session;
pub mod sql;
pub mod table;
pub mod value;

pub use error::{Error, Result};
pub use expr::{Expr, Token, TokenSet};
pub use fetch::{Catalog, Fetcher};
pub use ordering::{Direction, OrderKey};
pub use session::{Query, Session, Source};
pub use table::{Row, Table};
pub use value::Value;
