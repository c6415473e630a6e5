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


use std::sync::{Arc, Mutex, MutexGuard};

use reedline::{Completer, Span, Suggestion};

use crate::highlighter::SQL_KEYWORDS;

const DOT_COMMANDS: &[(&str, &str)] = &[
    (".mode", "Set output format: table|csv|json"),
    (".tables", "List stored tables"),
    (".timer", "Show query time: on|off"),
    (".help", "Show available commands"),
    (".quit", "Exit the REPL"),
];

/// Subsequence fuzzy match. Returns (score, matched_indices) or None.
fn fuzzy_match(pattern: &str, candidate: &str) -> Option<(i32, Vec<usize>)> {
    let pat: Vec<char> = pattern.to_lowercase().chars().collect();
    let mut pi = 0;
    let mut indices = Vec::new();
    let mut score = 0i32;
    let mut prev_match = false;

    for (ci, ch) in candidate.to_lowercase().chars().enumerate() {
        if pi < pat.len() && ch == pat[pi] {
            indices.push(ci);
            score += if prev_match { 3 } else { 1 };
            if ci == 0 {
                score += 5;
            }
            prev_match = true;
            pi += 1;
        } else {
            prev_match = false;
        }
    }
    (pi == pat.len()).then_some((score, indices))
}

#[derive(Debug, PartialEq)]
enum CompletionContext {
    Table,
    Column,
    DotCommand,
}

fn detect_context(before: &str) -> CompletionContext {
    let upper = before.to_ascii_uppercase();
    if upper.trim_start().starts_with('.') {
        return CompletionContext::DotCommand;
    }
    let last_from = upper.rfind("FROM ");
    let last_col = ["SELECT ", "WHERE ", "BY ", "HAVING "]
        .iter()
        .filter_map(|kw| upper.rfind(kw))
        .max();
    match (last_from, last_col) {
        (Some(t), Some(c)) if t > c => CompletionContext::Table,
        (Some(_), None) => CompletionContext::Table,
        _ => CompletionContext::Column,
    }
}

// ---------------------------------------------------------------------------
// Shared state, refreshed by the REPL loop after each statement
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TableInfo {
    pub name: String,
    pub nrows: usize,
    pub ncols: usize,
}

#[derive(Default)]
struct CompletionState {
    columns: Vec<String>,
    tables: Vec<TableInfo>,
}

fn lock(state: &Arc<Mutex<CompletionState>>) -> MutexGuard<'_, CompletionState> {
    // Completion data is best effort; a poisoned lock still holds usable data.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
pub struct CompletionUpdater {
    state: Arc<Mutex<CompletionState>>,
}

impl CompletionUpdater {
    pub fn set_columns(&self, columns: Vec<String>) {
        lock(&self.state).columns = columns;
    }

    pub fn set_tables(&self, tables: Vec<TableInfo>) {
        lock(&self.state).tables = tables;
    }
}

// ---------------------------------------------------------------------------
// SqlCompleter
// ---------------------------------------------------------------------------

pub struct SqlCompleter {
    state: Arc<Mutex<CompletionState>>,
    functions: Vec<&'static str>,
    csv_files: Vec<String>,
}

impl SqlCompleter {
    pub fn new() -> (Self, CompletionUpdater) {
        let csv_files = std::fs::read_dir(".")
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".csv"))
            .collect();
        let state = Arc::new(Mutex::new(CompletionState::default()));
        let updater = CompletionUpdater {
            state: Arc::clone(&state),
        };
        let completer = SqlCompleter {
            state,
            functions: recruit_query::functions::names(),
            csv_files,
        };
        (completer, updater)
    }
}

fn suggestion(value: String, description: &str, span: Span, indices: Vec<usize>) -> Suggestion {
    Suggestion {
        value,
        description: Some(description.to_string()),
        style: None,
        extra: None,
        span,
        append_whitespace: false,
        match_indices: Some(indices),
    }
}

impl Completer for SqlCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let before = &line[..pos];
        let context = detect_context(before);

        if context == CompletionContext::DotCommand {
            let dot_start = before.rfind('.').unwrap_or(0);
            let span = Span::new(dot_start, pos);
            return DOT_COMMANDS
                .iter()
                .filter_map(|&(cmd, desc)| {
                    let (_, indices) = fuzzy_match(&before[dot_start..], cmd)?;
                    Some(suggestion(cmd.to_string(), desc, span, indices))
                })
                .collect();
        }

        let word_start = before
            .rfind(|c: char| c.is_whitespace() || c == ',' || c == '(')
            .map(|i| i + 1)
            .unwrap_or(0);
        let prefix = &before[word_start..];
        if prefix.is_empty() {
            return vec![];
        }
        let span = Span::new(word_start, pos);
        let mut candidates: Vec<(i32, Suggestion)> = Vec::new();
        let mut offer = |value: String, desc: &str| {
            if let Some((score, indices)) = fuzzy_match(prefix, &value) {
                candidates.push((score, suggestion(value, desc, span, indices)));
            }
        };

        let st = lock(&self.state);
        match context {
            CompletionContext::Table => {
                for t in &st.tables {
                    offer(t.name.clone(), &format!("{} rows, {} cols", t.nrows, t.ncols));
                }
                for f in &self.csv_files {
                    offer(format!("read_csv('{f}')"), "csv file");
                }
            }
            CompletionContext::Column | CompletionContext::DotCommand => {
                for col in &st.columns {
                    offer(col.clone(), "column");
                }
                for f in &self.functions {
                    let desc = if recruit_query::functions::is_aggregate_name(f) {
                        "aggregate"
                    } else {
                        "function"
                    };
                    offer(f.to_string(), desc);
                }
                for kw in SQL_KEYWORDS {
                    offer(kw.to_string(), "keyword");
                }
            }
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        candidates.into_iter().map(|(_, s)| s).collect()
    }
}
