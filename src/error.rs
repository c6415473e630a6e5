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


//! Error type shared by the table model, the evaluator and the pipeline.

/// Errors surfaced by query execution.
///
/// Nothing in the pipeline recovers from these: the first error aborts the
/// whole query and is returned to the caller of [`crate::Session::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A row's length does not match the table's field count.
    ShapeMismatch { expected: usize, found: usize },
    /// Two tables chained side by side have different row counts.
    RowCountMismatch { left: usize, right: usize },
    /// An expression references a column the table does not have.
    UnknownColumn(String),
    /// A call names a function that is not in the built-in registry.
    UnknownFunction(String),
    /// Wrong arity or an argument the function cannot accept.
    InvalidArgument(String),
    /// Incompatible scalar kinds in evaluation or ordering.
    TypeMismatch(String),
    /// `*` used somewhere it cannot be evaluated.
    Wildcard(String),
    /// The fetcher failed to resolve a source.
    Source(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected} values, found {found}")
            }
            Error::RowCountMismatch { left, right } => {
                write!(f, "row count mismatch: {left} vs {right}")
            }
            Error::UnknownColumn(name) => write!(f, "column '{name}' not found"),
            Error::UnknownFunction(name) => write!(f, "unknown function '{name}'"),
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            Error::Wildcard(msg) => write!(f, "wildcard error: {msg}"),
            Error::Source(msg) => write!(f, "source error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
