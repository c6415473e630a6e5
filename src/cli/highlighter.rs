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


use nu_ansi_term::{Color, Style};
use reedline::{Highlighter, StyledText};

/// Keywords of the supported SQL subset.
pub const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "DISTINCT", "FROM", "WHERE", "GROUP", "BY", "ALL", "HAVING", "ORDER", "ASC",
    "DESC", "LIMIT", "AS", "CREATE", "OR", "REPLACE", "TABLE", "IF", "NOT", "EXISTS", "DROP",
    "CAST", "IN", "BETWEEN", "LIKE", "ILIKE", "IS", "NULL", "TRUE", "FALSE", "AND",
];

const WORD_OPERATORS: &[&str] = &["AND", "OR", "NOT", "IN", "LIKE", "ILIKE", "IS", "BETWEEN"];

fn keyword_style() -> Style {
    Style::new().bold().fg(Color::Blue)
}
fn function_style() -> Style {
    Style::new().bold().fg(Color::Cyan)
}
fn string_style() -> Style {
    Style::new().fg(Color::Yellow)
}
fn ident_style() -> Style {
    Style::new().fg(Color::Green)
}
fn number_style() -> Style {
    Style::new().fg(Color::Magenta)
}
fn operator_style() -> Style {
    Style::new().fg(Color::Blue)
}
fn comment_style() -> Style {
    Style::new().italic().fg(Color::DarkGray)
}

pub struct SqlHighlighter {
    functions: Vec<&'static str>,
}

impl SqlHighlighter {
    pub fn new() -> Self {
        SqlHighlighter {
            functions: recruit_query::functions::names(),
        }
    }

    fn word_style(&self, word: &str, next: Option<u8>) -> Style {
        let upper = word.to_ascii_uppercase();
        if WORD_OPERATORS.contains(&upper.as_str()) {
            operator_style()
        } else if SQL_KEYWORDS.contains(&upper.as_str()) {
            keyword_style()
        } else if next == Some(b'(')
            && self
                .functions
                .iter()
                .any(|f| f.eq_ignore_ascii_case(word))
        {
            function_style()
        } else {
            Style::default()
        }
    }
}

impl Highlighter for SqlHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.starts_with('.') {
            styled.push((Style::new().fg(Color::Cyan), line.to_string()));
            return styled;
        }

        let bytes = line.as_bytes();
        let len = bytes.len();
        let mut i = 0;
        while i < len {
            let b = bytes[i];
            let start = i;

            // -- comment to end of line
            if b == b'-' && bytes.get(i + 1) == Some(&b'-') {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                styled.push((comment_style(), line[start..i].to_string()));
                continue;
            }

            // 'string' or "identifier"
            if b == b'\'' || b == b'"' {
                i += 1;
                while i < len && bytes[i] != b {
                    i += 1;
                }
                i = (i + 1).min(len);
                let style = if b == b'\'' {
                    string_style()
                } else {
                    ident_style()
                };
                styled.push((style, line[start..i].to_string()));
                continue;
            }

            if b.is_ascii_digit() {
                while i < len && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                styled.push((number_style(), line[start..i].to_string()));
                continue;
            }

            if b.is_ascii_alphabetic() || b == b'_' {
                while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let word = &line[start..i];
                let style = self.word_style(word, bytes.get(i).copied());
                styled.push((style, word.to_string()));
                continue;
            }

            if matches!(b, b'=' | b'<' | b'>' | b'!' | b'|') {
                i += 1;
                while i < len && matches!(bytes[i], b'=' | b'>' | b'|') {
                    i += 1;
                }
                styled.push((operator_style(), line[start..i].to_string()));
                continue;
            }

            // Whitespace, punctuation and any non-ASCII text: copy through up
            // to the next interesting byte so multi-byte chars stay intact.
            i += 1;
            while i < len
                && !bytes[i].is_ascii_alphanumeric()
                && !matches!(
                    bytes[i],
                    b'_' | b'\'' | b'"' | b'-' | b'=' | b'<' | b'>' | b'!' | b'|'
                )
            {
                i += 1;
            }
            styled.push((Style::default(), line[start..i].to_string()));
        }

        styled
    }
}
