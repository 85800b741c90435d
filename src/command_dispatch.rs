//! Purpose: Hold top-level CLI command dispatch for `colmap`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command is read-only; exit codes come from `to_exit_code`.
//! Invariants: Helpers in `main.rs` own output formatting and hints.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    client: &LocalClient,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "colmap", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Table { command } => match command {
            TableCommand::List => {
                let names = client.list_tables()?;
                if io::stdout().is_terminal() {
                    if names.is_empty() {
                        println!("No tables found in {}.", client.data_root().display());
                    } else {
                        let rows = names.iter().map(|name| vec![name.clone()]).collect::<Vec<_>>();
                        emit_table(&["NAME"], &rows);
                    }
                } else {
                    let tables = names
                        .iter()
                        .map(|name| {
                            json!({
                                "name": name,
                                "path": client.data_root().join(name).display().to_string(),
                            })
                        })
                        .collect::<Vec<_>>();
                    emit_json(json!({ "tables": tables }));
                }
                Ok(RunOutcome::ok())
            }
            TableCommand::Info { table } => {
                let table_ref = TableRef::parse(&table);
                let opened = client.open_table(&table_ref)?;
                emit_json(table_info_json(&table_ref.describe(), &opened));
                Ok(RunOutcome::ok())
            }
        },
        Command::Partitions { table } => {
            let table_ref = TableRef::parse(&table);
            let opened = client.open_table(&table_ref)?;
            if io::stdout().is_terminal() {
                let rows = opened
                    .partitions()
                    .iter()
                    .map(|partition| {
                        vec![
                            partition.id.to_string(),
                            short_display_path(&partition.path, opened.root()),
                            partition.row_offset.to_string(),
                            partition.row_count.to_string(),
                        ]
                    })
                    .collect::<Vec<_>>();
                emit_table(&["ID", "DIR", "OFFSET", "ROWS"], &rows);
            } else {
                let partitions = opened.partitions().iter().map(partition_json).collect::<Vec<_>>();
                emit_json(json!({
                    "table": table_ref.describe(),
                    "partition_by": opened.metadata().partition_by.to_string(),
                    "row_count": opened.row_count(),
                    "partitions": partitions,
                }));
            }
            Ok(RunOutcome::ok())
        }
        Command::Read {
            table,
            columns,
            concat,
            limit,
            skip_rejected,
        } => {
            let request = build_view_request(&columns, concat, skip_rejected)?;
            let table_ref = TableRef::parse(&table);
            let opened = client.open_table(&table_ref)?;
            let views = opened.views(&request)?;
            let values = views
                .iter()
                .map(|view| view_json(view, limit))
                .collect::<Vec<_>>();
            emit_json(json!({
                "table": table_ref.describe(),
                "mode": if concat { "concatenated" } else { "per_partition" },
                "row_count": opened.row_count(),
                "views": values,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Doctor { table, all, json } => {
            if all && table.is_some() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("--all cannot be combined with a table name")
                    .with_hint("Use --all by itself, or provide a single table."));
            }
            if !all && table.is_none() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("doctor requires a table name or --all")
                    .with_hint("Use `colmap doctor <table>` or `colmap doctor --all`."));
            }
            let reports = if let Some(table) = table {
                vec![client.validate_table(&TableRef::parse(&table))?]
            } else {
                let mut reports = Vec::new();
                for name in client.list_tables()? {
                    reports.push(client.validate_table(&TableRef::name(name))?);
                }
                reports
            };

            if json {
                let values = reports.iter().map(report_json).collect::<Vec<_>>();
                emit_json(json!({ "reports": values }));
            } else if reports.is_empty() {
                println!("No tables found in {}.", client.data_root().display());
            } else {
                for report in &reports {
                    emit_doctor_human(report);
                }
            }

            let has_corrupt = reports
                .iter()
                .any(|report| report.status == ValidationStatus::Corrupt);
            let exit_code = if has_corrupt {
                to_exit_code(ErrorKind::Corrupt)
            } else {
                0
            };
            Ok(RunOutcome::with_code(exit_code))
        }
    }
}
