//! Schema probe command.

use console::style;

use mx_core::error::MxResult;
use mx_store::{probe, ReadOnlyDb};

use crate::OutputFormat;

pub async fn run(db_path: &std::path::Path, format: OutputFormat) -> MxResult<()> {
    let db_path = db_path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let db = ReadOnlyDb::open(&db_path)?;
        probe(&db)
    })
    .await
    .map_err(|e| mx_core::MxError::Internal(format!("probe task panicked: {e}")))??;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "supported": result.is_supported(),
                "missing": result.missing_required,
                "tables": result.columns.iter().map(|(table, columns)| {
                    serde_json::json!({
                        "name": table,
                        "present": result.has_table(table),
                        "columns": columns,
                    })
                }).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            if result.is_supported() {
                println!("{} schema is supported", style("OK").green().bold());
            } else {
                println!(
                    "{} schema is not supported, missing: {}",
                    style("UNSUPPORTED").red().bold(),
                    result.missing_required.join(", ")
                );
            }
            println!();
            for (table, columns) in &result.columns {
                if result.has_table(table) {
                    let cols: Vec<&str> = columns.iter().map(String::as_str).collect();
                    println!("  {} ({})", style(table).bold(), cols.join(", "));
                } else {
                    println!("  {} {}", style(table).dim(), style("absent").dim());
                }
            }
        }
    }

    Ok(())
}
