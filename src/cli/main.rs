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


mod completer;
mod highlighter;
mod prompt;
mod theme;
mod validator;

use clap::Parser;
use std::path::{Path, PathBuf};

use reedline::{
    default_emacs_keybindings, DescriptionMode, Emacs, FileBackedHistory, IdeMenu, KeyCode,
    KeyModifiers, MenuBuilder, Reedline, ReedlineEvent, ReedlineMenu, Signal,
};
use tracing_subscriber::EnvFilter;

use recruit_query::sql::{Database, ExecResult, SqlResult};
use recruit_query::{Catalog, Table, Value};

use completer::{CompletionUpdater, SqlCompleter, TableInfo};
use highlighter::SqlHighlighter;
use prompt::SqlPrompt;
use validator::SqlValidator;

#[derive(Parser)]
#[command(
    name = "recruit-query",
    version,
    about = "Run SQL queries over CSV tables"
)]
struct Args {
    /// SQL query or CSV file path
    input: Option<String>,
    /// Execute SQL from file
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Execute SQL init script before entering REPL
    #[arg(short, long)]
    init: Option<PathBuf>,
    /// Show query execution time
    #[arg(short, long)]
    timer: bool,
    /// Directory that dotted table names and relative CSV paths resolve against
    #[arg(short, long, value_name = "DIR")]
    data: Option<PathBuf>,
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut db = make_database(args.data.as_deref());

    // Non-interactive: execute single query (with optional --init)
    if let Some(ref input) = args.input {
        if !input.ends_with(".csv") {
            if let Some(ref init) = args.init {
                run_init_script(&mut db, init);
            }
            run_session_query(&mut db, input, args.timer);
            return;
        }
    }

    // Non-interactive: execute SQL from file (with optional --init)
    if let Some(ref file) = args.file {
        if let Some(ref init) = args.init {
            run_init_script(&mut db, init);
        }
        run_sql_file(&mut db, file, args.timer);
        return;
    }

    run_repl(db, args.input.as_deref(), args.init.as_deref());
}

fn make_database(data: Option<&Path>) -> Database {
    match data {
        Some(dir) => Database::with_catalog(Catalog::with_base_dir(dir)),
        None => Database::new(),
    }
}

fn run_init_script(db: &mut Database, path: &Path) {
    if let Err(e) = db.execute_script_file(path) {
        eprintln!(
            "{}Error in init script {}: {e}{}",
            theme::ERROR,
            path.display(),
            theme::R
        );
        std::process::exit(1);
    }
}

fn print_elapsed(start: std::time::Instant) {
    eprintln!(
        "{}Run Time: {:.3}s{}",
        theme::TIMER,
        start.elapsed().as_secs_f64(),
        theme::R
    );
}

fn run_session_query(db: &mut Database, sql: &str, timer: bool) {
    let start = std::time::Instant::now();
    match db.execute(sql) {
        Ok(ExecResult::Query(result)) => print_result(&result, OutputFormat::Table),
        Ok(ExecResult::Ddl(msg)) => println!("{}{msg}{}", theme::SUCCESS, theme::R),
        Err(e) => {
            eprintln!("{}Error: {e}{}", theme::ERROR, theme::R);
            std::process::exit(1);
        }
    }
    if timer {
        print_elapsed(start);
    }
}

fn run_sql_file(db: &mut Database, path: &Path, timer: bool) {
    let contents = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        std::process::exit(1);
    });
    let dialect = sqlparser::dialect::DuckDbDialect {};
    let stmts = match sqlparser::parser::Parser::parse_sql(&dialect, &contents) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "{}Error parsing {}: {e}{}",
                theme::ERROR,
                path.display(),
                theme::R
            );
            std::process::exit(1);
        }
    };
    for stmt in &stmts {
        let sql = stmt.to_string();
        let start = std::time::Instant::now();
        match db.execute(&sql) {
            Ok(ExecResult::Query(result)) => print_result(&result, OutputFormat::Table),
            Ok(ExecResult::Ddl(msg)) => println!("{}{msg}{}", theme::SUCCESS, theme::R),
            Err(e) => {
                eprintln!("{}Error: {e}{}", theme::ERROR, theme::R);
                continue;
            }
        }
        if timer {
            print_elapsed(start);
        }
    }
}

fn run_repl(mut db: Database, preload_csv: Option<&str>, init: Option<&Path>) {
    print_banner();

    if let Some(init_path) = init {
        if let Err(e) = db.execute_script_file(init_path) {
            eprintln!(
                "{}Error in init script {}: {e}{}",
                theme::ERROR,
                init_path.display(),
                theme::R
            );
            return;
        }
    }

    if let Some(csv_path) = preload_csv {
        let sql = format!(
            "CREATE TABLE t AS SELECT * FROM read_csv('{}')",
            csv_path.replace('\'', "''")
        );
        match db.execute(&sql) {
            Ok(ExecResult::Ddl(msg)) => println!("{}{msg}{}", theme::SUCCESS, theme::R),
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}Error loading {csv_path}: {e}{}", theme::ERROR, theme::R);
                return;
            }
        }
    }

    let (completer, comp_updater) = SqlCompleter::new();
    update_tables(&comp_updater, &db);

    let hinter = reedline::DefaultHinter::default()
        .with_style(nu_ansi_term::Style::new().fg(nu_ansi_term::Color::DarkGray));

    let ide_menu = IdeMenu::default()
        .with_name("completion_menu")
        .with_min_completion_width(20)
        .with_max_completion_width(60)
        .with_max_completion_height(10)
        .with_padding(1)
        .with_description_mode(DescriptionMode::PreferRight)
        .with_min_description_width(20)
        .with_max_description_width(40)
        .with_default_border();

    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings.add_binding(
        KeyModifiers::SHIFT,
        KeyCode::BackTab,
        ReedlineEvent::MenuPrevious,
    );

    let history_path = dirs_or_home().join(".recruit_query_history");
    let history = match FileBackedHistory::with_file(1000, history_path.clone()) {
        Ok(history) => Some(history),
        Err(e) => {
            eprintln!(
                "{}Warning: history disabled ({}): {}{}",
                theme::ERROR,
                history_path.display(),
                e,
                theme::R
            );
            None
        }
    };

    let editor = Reedline::create()
        .with_completer(Box::new(completer))
        .with_highlighter(Box::new(SqlHighlighter::new()))
        .with_validator(Box::new(SqlValidator))
        .with_hinter(Box::new(hinter))
        .with_menu(ReedlineMenu::EngineCompleter(Box::new(ide_menu)))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));
    let mut editor = if let Some(history) = history {
        editor.with_history(Box::new(history))
    } else {
        editor
    };

    let prompt = SqlPrompt;
    let mut format = OutputFormat::Table;
    let mut show_timer = false;

    loop {
        match editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                if trimmed.starts_with('.') {
                    if !handle_dot_command(trimmed, &mut format, &mut show_timer, &db) {
                        break;
                    }
                    continue;
                }

                // Validator ensured the statement ends with ';'
                let sql = trimmed.trim_end_matches(';').trim();
                if sql.is_empty() {
                    continue;
                }

                let start = std::time::Instant::now();
                match db.execute(sql) {
                    Ok(ExecResult::Query(result)) => {
                        comp_updater.set_columns(result.columns().to_vec());
                        print_result(&result, format);
                    }
                    Ok(ExecResult::Ddl(msg)) => {
                        println!("{}{msg}{}", theme::SUCCESS, theme::R);
                        update_tables(&comp_updater, &db);
                    }
                    Err(e) => {
                        eprintln!("{}Error: {e}{}", theme::ERROR, theme::R);
                        continue;
                    }
                }
                if show_timer {
                    print_elapsed(start);
                }
            }
            Ok(Signal::CtrlD) => break,
            Ok(Signal::CtrlC) => continue,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }
}

fn update_tables(updater: &CompletionUpdater, db: &Database) {
    let tables = db
        .table_names()
        .into_iter()
        .filter_map(|name| {
            db.table_info(name).map(|(nrows, ncols)| TableInfo {
                name: name.to_string(),
                nrows,
                ncols,
            })
        })
        .collect();
    updater.set_tables(tables);
}

// ---------------------------------------------------------------------------
// Output formatting
// ---------------------------------------------------------------------------

fn print_result(result: &SqlResult, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_table(&result.table),
        OutputFormat::Csv => print_csv(&result.table),
        OutputFormat::Json => print_json(&result.table),
    }
}

const HEAD_ROWS: usize = 20;
const TAIL_ROWS: usize = 20;

/// Kind of a column, taken from its first non-null value.
fn column_kind(table: &Table, col: usize) -> &'static str {
    table
        .column(col)
        .find(|v| !v.is_null())
        .map_or("null", Value::kind)
}

fn render_row(row: &[Value]) -> (Vec<String>, Vec<bool>) {
    (
        row.iter().map(|v| v.to_string()).collect(),
        row.iter().map(Value::is_null).collect(),
    )
}

fn print_table(table: &Table) {
    use std::fmt::Write;
    use std::io::Write as IoWrite;
    use theme::*;
    let mut out = String::with_capacity(4096);

    let nrows = table.len();
    let ncols = table.width();

    if ncols == 0 {
        println!("{FOOTER}(empty result){R}");
        return;
    }

    let col_names = table.fields();
    let col_kinds: Vec<&str> = (0..ncols).map(|c| column_kind(table, c)).collect();
    let is_right: Vec<bool> = col_kinds
        .iter()
        .map(|k| matches!(*k, "int" | "float"))
        .collect();

    let show_dots = nrows > HEAD_ROWS + TAIL_ROWS;
    let head_n = if show_dots { HEAD_ROWS } else { nrows };
    let tail_n = if show_dots { TAIL_ROWS } else { 0 };
    let shown = head_n + tail_n;

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(shown + 1);
    let mut is_null: Vec<Vec<bool>> = Vec::with_capacity(shown + 1);
    for row in &table.rows()[..head_n] {
        let (text, nulls) = render_row(row);
        cells.push(text);
        is_null.push(nulls);
    }
    if show_dots {
        cells.push(vec!["\u{00b7}\u{00b7}\u{00b7}".to_string(); ncols]);
        is_null.push(vec![false; ncols]);
        for row in &table.rows()[nrows - tail_n..] {
            let (text, nulls) = render_row(row);
            cells.push(text);
            is_null.push(nulls);
        }
    }

    let footer_left = if show_dots {
        format!("{nrows} rows ({shown} shown)")
    } else {
        format!("{nrows} rows")
    };
    let footer_right = format!("{ncols} columns");
    let footer_min = footer_left.len() + footer_right.len() + 3;

    let mut w: Vec<usize> = (0..ncols)
        .map(|c| {
            let mut max = col_names[c].chars().count().max(col_kinds[c].len());
            for row in &cells {
                max = max.max(row[c].chars().count());
            }
            max
        })
        .collect();

    let mut inner_width: usize = w.iter().map(|x| x + 2).sum::<usize>() + ncols - 1;
    if inner_width < footer_min {
        let extra = footer_min - inner_width;
        w[ncols - 1] += extra;
        inner_width += extra;
    }
    let mut buf = String::with_capacity(inner_width * 2);

    macro_rules! hline {
        ($left:expr, $mid:expr, $right:expr) => {{
            buf.clear();
            buf.push_str(BORDER);
            buf.push($left);
            for c in 0..ncols {
                if c > 0 {
                    buf.push($mid);
                }
                for _ in 0..w[c] + 2 {
                    buf.push('\u{2500}');
                }
            }
            buf.push($right);
            buf.push_str(R);
            let _ = writeln!(out, "{buf}");
        }};
    }

    macro_rules! bar {
        () => {{
            buf.push_str(BORDER);
            buf.push('\u{2502}');
            buf.push_str(R);
        }};
    }

    hline!('\u{250c}', '\u{252c}', '\u{2510}');

    buf.clear();
    for c in 0..ncols {
        bar!();
        let _ = write!(buf, " {BOLD}{HEADER}{:^width$}{R} ", col_names[c], width = w[c]);
    }
    bar!();
    let _ = writeln!(out, "{buf}");

    buf.clear();
    for c in 0..ncols {
        bar!();
        let _ = write!(buf, " {KIND}{:^width$}{R} ", col_kinds[c], width = w[c]);
    }
    bar!();
    let _ = writeln!(out, "{buf}");

    hline!('\u{251c}', '\u{253c}', '\u{2524}');

    let dots_idx = show_dots.then_some(head_n);
    for (ri, row) in cells.iter().enumerate() {
        buf.clear();
        let is_dots = dots_idx == Some(ri);
        for c in 0..ncols {
            bar!();
            if is_dots {
                let _ = write!(buf, " {FOOTER}{:^width$}{R} ", row[c], width = w[c]);
            } else if is_null[ri][c] {
                let _ = write!(buf, " {ITALIC}{NULL_CLR}{:>width$}{R} ", row[c], width = w[c]);
            } else if is_right[c] {
                let _ = write!(buf, " {TEXT}{:>width$}{R} ", row[c], width = w[c]);
            } else {
                let _ = write!(buf, " {TEXT}{:<width$}{R} ", row[c], width = w[c]);
            }
        }
        bar!();
        let _ = writeln!(out, "{buf}");
    }

    hline!('\u{251c}', '\u{2534}', '\u{2524}');

    let pad = inner_width - footer_left.len() - footer_right.len() - 2;
    let _ = writeln!(
        out,
        "{BORDER}\u{2502}{R} {FOOTER}{footer_left}{:pad$}{footer_right}{R} {BORDER}\u{2502}{R}",
        ""
    );
    let _ = writeln!(
        out,
        "{BORDER}\u{2514}{}\u{2518}{R}",
        "\u{2500}".repeat(inner_width)
    );

    // Single write to stdout to avoid per-line flushes
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = lock.write_all(out.as_bytes());
}

fn print_csv(table: &Table) {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    let mut write_all = || -> Result<(), csv::Error> {
        writer.write_record(table.fields())?;
        for row in table.iter() {
            writer.write_record(row.iter().map(|v| match v {
                Value::Null => String::new(),
                v => v.to_string(),
            }))?;
        }
        writer.flush()?;
        Ok(())
    };
    if let Err(e) = write_all() {
        eprintln!("{}Error: {e}{}", theme::ERROR, theme::R);
    }
}

fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn json_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Float(f) if !f.is_finite() => "null".to_string(),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => value.to_string(),
        Value::Text(s) => json_string(s),
    }
}

fn print_json(table: &Table) {
    let nrows = table.len();
    println!("[");
    for (i, row) in table.iter().enumerate() {
        let pairs: Vec<String> = table
            .fields()
            .iter()
            .zip(row.iter())
            .map(|(name, value)| format!("{}: {}", json_string(name), json_value(value)))
            .collect();
        let comma = if i + 1 < nrows { "," } else { "" };
        println!("  {{{}}}{comma}", pairs.join(", "));
    }
    println!("]");
}

// ---------------------------------------------------------------------------
// Dot commands
// ---------------------------------------------------------------------------

/// Returns false when the REPL should exit.
fn handle_dot_command(
    cmd: &str,
    format: &mut OutputFormat,
    timer: &mut bool,
    db: &Database,
) -> bool {
    use theme::*;

    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let Some(&name) = parts.first() else {
        return true;
    };
    match name {
        ".mode" => match parts.get(1) {
            Some(&"table") => {
                *format = OutputFormat::Table;
                println!("{SUCCESS}Output mode: table{R}");
            }
            Some(&"csv") => {
                *format = OutputFormat::Csv;
                println!("{SUCCESS}Output mode: csv{R}");
            }
            Some(&"json") => {
                *format = OutputFormat::Json;
                println!("{SUCCESS}Output mode: json{R}");
            }
            Some(_) => println!("{ERROR}Unknown mode. Use: table, csv, json{R}"),
            None => println!("{FOOTER}Usage: .mode table|csv|json{R}"),
        },
        ".timer" => match parts.get(1) {
            Some(&"on") => {
                *timer = true;
                println!("{SUCCESS}Timer: on{R}");
            }
            Some(&"off") => {
                *timer = false;
                println!("{SUCCESS}Timer: off{R}");
            }
            _ => println!("{FOOTER}Usage: .timer on|off{R}"),
        },
        ".tables" => {
            let names = db.table_names();
            if names.is_empty() {
                println!("{FOOTER}No stored tables.{R}");
            }
            for name in names {
                if let Some((nrows, ncols)) = db.table_info(name) {
                    println!("  {HEADER}{name:20}{R} {FOOTER}{nrows} rows, {ncols} cols{R}");
                }
            }
        }
        ".help" => print_help(),
        ".quit" | ".exit" => return false,
        _ => println!("{ERROR}Unknown command: {name}. Type .help for commands.{R}"),
    }
    true
}

// ---------------------------------------------------------------------------
// Banner & help
// ---------------------------------------------------------------------------

fn print_banner() {
    use theme::*;

    let title = "recruit-query";
    let ver = env!("CARGO_PKG_VERSION");
    let hash = env!("GIT_HASH");
    let arch = std::env::consts::ARCH;
    let tag = format!("v{ver}  \u{b7}  {hash}  \u{b7}  {arch}");
    let help = "type .help for commands";
    let tag_w = tag.chars().count();
    let help_w = help.chars().count();
    let w = tag_w.max(help_w).max(title.len() + 2);
    let fill = w - title.len() - 2;
    println!(
        "{BAN_BORDER}\u{256d}\u{2500} {BOLD}{BAN_TITLE}{title}{R}{BAN_BORDER} \u{2500}{}\u{256e}{R}",
        "\u{2500}".repeat(fill)
    );
    println!(
        "{BAN_BORDER}\u{2502}{R} {BAN_INFO}{tag}{}{R} {BAN_BORDER}\u{2502}{R}",
        " ".repeat(w - tag_w)
    );
    println!(
        "{BAN_BORDER}\u{2502}{R} {HINT}{help}{}{R} {BAN_BORDER}\u{2502}{R}",
        " ".repeat(w - help_w)
    );
    println!("{BAN_BORDER}\u{2570}{}\u{256f}{R}", "\u{2500}".repeat(w + 2));
    println!();
}

fn print_help() {
    use theme::*;

    println!("{BOLD}{HEADER}Commands:{R}");
    println!("  {COMMAND}.mode table|csv|json{R}  {HINT}Set output format{R}");
    println!("  {COMMAND}.tables{R}               {HINT}List stored tables{R}");
    println!("  {COMMAND}.timer on|off{R}         {HINT}Show query execution time{R}");
    println!("  {COMMAND}.help{R}                 {HINT}Show this help{R}");
    println!("  {COMMAND}.quit{R}                 {HINT}Exit{R}");
    println!();
    println!("{BOLD}{HEADER}SQL:{R}");
    println!("  {TEXT}SELECT dept, count(*) FROM read_csv('staff.csv') GROUP BY dept;{R}");
    println!("  {TEXT}CREATE TABLE t AS SELECT * FROM read_csv('staff.csv') WHERE age > 30;{R}");
    println!("  {TEXT}SELECT name, salary FROM t ORDER BY salary DESC LIMIT 5;{R}");
    println!("  {TEXT}DROP TABLE t;{R}");
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_strings_escape_control_characters() {
        assert_eq!(json_string("plain"), "\"plain\"");
        assert_eq!(
            json_string("a\"b\\c\n\td\r\u{1}"),
            "\"a\\\"b\\\\c\\n\\td\\r\\u0001\""
        );
    }
}
