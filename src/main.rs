//! Purpose: `colmap` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (human tables on a TTY, JSON otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Table files are only ever opened read-only.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod table_info_json;

use colmap::api::{
    ColumnRequest, Error, ErrorKind, LocalClient, NameEncoding, ReaderOptions, RejectPolicy,
    TableRef, TimestampIndexRule, ValidationReport, ValidationStatus, ViewMode, ViewRequest,
    to_exit_code,
};
use table_info_json::{partition_json, table_info_json, view_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let options = ReaderOptions::new()
        .with_name_encoding(cli.name_encoding.into())
        .with_timestamp_index_rule(cli.ts_index_rule.into());
    let mut client = LocalClient::new().with_options(options);
    if let Some(dir) = cli.dir {
        client = client.with_data_root(dir);
    }
    let color_mode = cli.color;

    let result = command_dispatch::dispatch_command(cli.command, &client);

    result
        .map_err(add_missing_table_hint)
        .map_err(add_type_hint)
        .map_err(add_corrupt_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Debug, Parser)]
#[command(
    name = "colmap",
    version,
    about = "Zero-copy columnar views over date-partitioned table files",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Reads `_meta`, `_txn` and per-partition `<column>.d` files without copying.

Mental model:
  - `table` inspects the schema and commit state
  - `partitions` lists partition directories and their row extents
  - `read` maps columns and prints their values
"#,
    after_help = r#"EXAMPLES
  $ colmap table list
  $ colmap table info trades
  $ colmap partitions trades
  $ colmap read trades --column price:DOUBLE --column ts:TIMESTAMP --limit 5

LEARN MORE
  Default data root: $COLMAP_DATA_ROOT, else ~/.questdb/ROOT/db (override with --dir)
  Verbose logs: RUST_LOG=debug colmap ...

  $ colmap <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Data root holding one directory per table (default: ~/.questdb/ROOT/db)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        long,
        global = true,
        default_value = "utf16",
        value_enum,
        help = "Column name encoding in _meta: utf16|utf8"
    )]
    name_encoding: NameEncodingCli,
    #[arg(
        long,
        global = true,
        default_value = "non-negative",
        value_enum,
        help = "Which timestamp index values designate a column: non-negative|positive"
    )]
    ts_index_rule: TsIndexRuleCli,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum NameEncodingCli {
    Utf16,
    Utf8,
}

impl From<NameEncodingCli> for NameEncoding {
    fn from(value: NameEncodingCli) -> Self {
        match value {
            NameEncodingCli::Utf16 => NameEncoding::Utf16,
            NameEncodingCli::Utf8 => NameEncoding::NullStrippedUtf8,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TsIndexRuleCli {
    NonNegative,
    Positive,
}

impl From<TsIndexRuleCli> for TimestampIndexRule {
    fn from(value: TsIndexRuleCli) -> Self {
        match value {
            TsIndexRuleCli::NonNegative => TimestampIndexRule::NonNegative,
            TsIndexRuleCli::Positive => TimestampIndexRule::Positive,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Inspect tables under the data root",
        long_about = r#"List tables and show decoded metadata plus commit state."#,
        after_help = r#"EXAMPLES
  $ colmap table list
  $ colmap table info trades
  $ colmap --dir /srv/db table info ./trades

NOTES
  - A table is any directory under the data root that contains a _meta file"#
    )]
    Table {
        #[command(subcommand)]
        command: TableCommand,
    },
    #[command(
        arg_required_else_help = true,
        about = "List partitions and their row extents",
        long_about = r#"Resolve partition directories from the commit log.

The last partition's row count comes from the transient row count; earlier
partitions use their stored sizes. Unpartitioned tables have one `default` partition."#,
        after_help = r#"EXAMPLES
  $ colmap partitions trades"#
    )]
    Partitions {
        #[arg(help = "Table name or path")]
        table: String,
    },
    #[command(
        arg_required_else_help = true,
        about = "Map columns and print their values as JSON",
        long_about = r#"Memory-map the requested columns and emit one view per partition.

Each --column names a column and the type it is expected to have. Columns come out
in schema order. The designated timestamp column, when requested, becomes the index."#,
        after_help = r#"EXAMPLES
  $ colmap read trades --column price:DOUBLE
  $ colmap read trades --column qty:INT --column ts:TIMESTAMP --concat
  $ colmap read trades --column sym:SYMBOL --column price:DOUBLE --skip-rejected

NOTES
  - Only fixed-width types can be mapped (no STRING/SYMBOL/BINARY/LONG256)
  - `--concat` copies all partitions into one anonymous read-only mapping
  - `--skip-rejected` leaves out mismatched or unmappable columns instead of failing"#
    )]
    Read {
        #[arg(help = "Table name or path")]
        table: String,
        #[arg(
            long = "column",
            short = 'c',
            value_name = "NAME:TYPE",
            required = true,
            help = "Repeatable column request, e.g. price:DOUBLE"
        )]
        columns: Vec<String>,
        #[arg(long, help = "Emit one whole-table view instead of one per partition")]
        concat: bool,
        #[arg(long, help = "Emit at most N rows per view")]
        limit: Option<usize>,
        #[arg(long, help = "Skip rejected columns instead of failing")]
        skip_rejected: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Diagnose table health",
        long_about = r#"Cross-check metadata, the commit log, and files on disk for one table (or all)."#,
        after_help = r#"EXAMPLES
  $ colmap doctor trades
  $ colmap doctor --all
  $ colmap doctor --all --json

NOTES
  - Human-readable output is the default.
  - Use --json for machine-readable output.
  - Exits nonzero when corruption is detected."#
    )]
    Doctor {
        #[arg(help = "Table name or path", required = false)]
        table: Option<String>,
        #[arg(long, help = "Validate all tables under the data root")]
        all: bool,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Print version info as JSON",
        long_about = r#"Emit version info as JSON (stable, machine-readable)."#,
        after_help = r#"EXAMPLES
  $ colmap version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout."#,
        after_help = r#"EXAMPLES
  $ colmap completion bash > ~/.local/share/bash-completion/completions/colmap
  $ colmap completion zsh > ~/.zfunc/_colmap
  $ colmap completion fish > ~/.config/fish/completions/colmap.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
enum TableCommand {
    #[command(about = "List tables under the data root")]
    List,
    #[command(arg_required_else_help = true, about = "Show schema and commit state")]
    Info {
        #[arg(help = "Table name or path")]
        table: String,
    },
}

fn build_view_request(
    columns: &[String],
    concat: bool,
    skip_rejected: bool,
) -> Result<ViewRequest, Error> {
    let requests = columns
        .iter()
        .map(|raw| ColumnRequest::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let mode = if concat {
        ViewMode::Concatenated
    } else {
        ViewMode::PerPartition
    };
    let policy = if skip_rejected {
        RejectPolicy::Skip
    } else {
        RejectPolicy::Fail
    };
    Ok(ViewRequest::new()
        .with_columns(requests)
        .with_mode(mode)
        .with_reject_policy(policy))
}

fn add_missing_table_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::TableNotFound || err.hint().is_some() {
        return err;
    }
    err.with_hint("List tables with `colmap table list`, or pass --dir for a different data root.")
}

fn add_type_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::TypeMismatch => err.with_hint(
            "Check column types with `colmap table info <table>`, or pass --skip-rejected.",
        ),
        ErrorKind::UnsupportedType => err.with_hint(
            "Only fixed-width columns can be mapped. Drop the column or pass --skip-rejected.",
        ),
        ErrorKind::ColumnFileMissing => err.with_hint(
            "The partition lacks this column file. Run `colmap doctor <table>` for details.",
        ),
        _ => err,
    }
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Check read access to the table directory.")
        }
        ErrorKind::Io => err.with_hint("I/O error. Check the path and filesystem."),
        _ => err,
    }
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Table files look inconsistent. Run `colmap doctor <table>`, or retry with --name-encoding/--ts-index-rule if the files come from another engine version.",
    )
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share command/context if it persists.",
    )
}

fn emit_doctor_human(report: &ValidationReport) {
    let label = report
        .table_ref
        .clone()
        .unwrap_or_else(|| report.path.to_string_lossy().to_string());
    match report.status {
        ValidationStatus::Ok => {
            let rows = report.row_count.unwrap_or_default();
            let partitions = report.partition_count.unwrap_or_default();
            println!("OK: {label} ({rows} rows in {partitions} partitions)");
        }
        ValidationStatus::Corrupt => {
            println!("CORRUPT: {label} ({} issues)", report.issue_count);
            for issue in &report.issues {
                let mut line = format!("  - [{}] {}", issue.code, issue.message);
                if let Some(column) = &issue.column {
                    line.push_str(&format!(" (column: {column})"));
                }
                if let Some(path) = &issue.path {
                    line.push_str(&format!(" (path: {})", path.display()));
                }
                println!("{line}");
            }
            for hint in &report.remediation_hints {
                println!("  hint: {hint}");
            }
        }
    }
}

fn report_json(report: &ValidationReport) -> Value {
    serde_json::to_value(report).unwrap_or_else(|err| {
        json!({
            "path": report.path.to_string_lossy(),
            "status": "corrupt",
            "issues": [{ "code": "encode", "message": err.to_string() }],
        })
    })
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("colmap {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "colmap",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn short_display_path(path: &Path, base_dir: &Path) -> String {
    if let Ok(relative) = path.strip_prefix(base_dir) {
        if !relative.as_os_str().is_empty() {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

fn emit_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, width) in widths.iter_mut().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_cells = headers.iter().map(|header| header.to_string()).collect::<Vec<_>>();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_table_line(&header_cells, &widths));
    for row in rows {
        lines.push(format_table_line(row, &widths));
    }
    lines.join("\n")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line.trim_end().to_string()
}

/// Pretty on a terminal, one line otherwise. `--color` only affects stderr.
fn emit_json(value: Value) {
    println!("{}", json_text(&value, io::stdout().is_terminal()));
}

fn json_text(value: &Value, pretty: bool) -> String {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::TableNotFound => "table not found".to_string(),
        ErrorKind::Corrupt => "malformed table files".to_string(),
        ErrorKind::UnsupportedType => "unsupported column type".to_string(),
        ErrorKind::TypeMismatch => "column type mismatch".to_string(),
        ErrorKind::ColumnFileMissing => "column file missing".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(column) = err.column() {
        lines.push(format!(
            "{} {column}",
            colorize_label("column:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!(
            "{} {offset}",
            colorize_label("offset:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `colmap --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "colmap") else {
        return "Try `colmap --help`.".to_string();
    };

    let mut parts = Vec::new();
    for token in tokens.iter().skip(pos + 1) {
        if token.starts_with('-') || token.starts_with('<') || token.starts_with('[') {
            break;
        }
        parts.push(*token);
    }

    if parts.is_empty() {
        return "Try `colmap --help`.".to_string();
    }
    format!("Try `colmap {} --help`.", parts.join(" "))
}
