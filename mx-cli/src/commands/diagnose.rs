//! Access diagnostics command.

use console::style;

use mx_core::error::MxResult;
use mx_store::MessageStore;

pub async fn run(db_path: &std::path::Path) -> MxResult<()> {
    let store = MessageStore::new(db_path);

    // Attempt a load so the diagnostics reflect a real access path.
    // The outcome itself is part of the report, not a command failure.
    match store.load_page(0).await {
        Ok(page) => {
            println!(
                "{} loaded page 0 ({} conversations)",
                style("OK").green().bold(),
                page.conversations.len()
            );
        }
        Err(err) => {
            println!("{} {err}", style("FAILED").red().bold());
        }
    }

    println!();
    println!("{}", style("Diagnostics").bold().underlined());
    for line in store.diagnostics_report().lines() {
        println!("  {line}");
    }
    Ok(())
}
