//! Conversation listing commands.

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;

use mx_core::config::AppConfig;
use mx_core::error::MxResult;
use mx_store::{timestamp, SelectionKey};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ChatsAction {
    /// List conversations, most recently active first.
    List {
        /// Page number (1-based).
        #[arg(short, long, default_value = "1")]
        page: i64,
    },
    /// Show details for one conversation.
    Get {
        /// Conversation guid.
        guid: String,
    },
}

pub async fn run(
    config: &AppConfig,
    db_path: &std::path::Path,
    action: ChatsAction,
    format: OutputFormat,
) -> MxResult<()> {
    let store = super::open_store(config, db_path);

    match action {
        ChatsAction::List { page } => {
            let page_index = page.max(1) - 1;
            let result = store.load_page(page_index).await?;

            match format {
                OutputFormat::Json => {
                    let json: Vec<_> = result
                        .conversations
                        .iter()
                        .map(|c| {
                            serde_json::json!({
                                "identifier": c.identifier,
                                "rowid": c.row_id,
                                "title": c.title,
                                "participants": c.participant_handles,
                                "preview": c.preview,
                                "last_activity": c.last_activity.map(timestamp::format_iso8601),
                                "is_group": c.is_group,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                OutputFormat::Text => {
                    if result.conversations.is_empty() {
                        println!("No conversations found.");
                        return Ok(());
                    }

                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);
                    table.set_header(vec!["Title", "Preview", "Last Activity", "Group"]);

                    for c in &result.conversations {
                        let preview = c.preview.as_deref().unwrap_or("-");
                        let date = c
                            .last_activity
                            .map(timestamp::format_iso8601)
                            .unwrap_or_else(|| "-".to_string());
                        let date_short = if date.len() > 10 { date[..10].to_string() } else { date };

                        table.add_row(vec![
                            super::truncate(&c.title, 30),
                            super::truncate(preview, 40),
                            date_short,
                            if c.is_group { "yes" } else { "-" }.to_string(),
                        ]);
                    }

                    println!("{table}");
                    let page_size = config.export.page_size.max(1) as i64;
                    println!(
                        "\nPage {}/{} ({} conversations, {} messages total)",
                        page,
                        (result.total_chats + page_size - 1) / page_size,
                        result.total_chats,
                        result.total_messages
                    );
                }
            }
        }
        ChatsAction::Get { guid } => {
            let conversation =
                super::find_conversation(&store, &SelectionKey::Guid(guid.clone())).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&conversation)?);
                }
                OutputFormat::Text => {
                    println!("{}", style("Conversation").bold().underlined());
                    println!("  Title:        {}", conversation.title);
                    println!("  Identifier:   {}", conversation.identifier);
                    println!(
                        "  Type:         {}",
                        if conversation.is_group { "group" } else { "direct" }
                    );
                    if let Some(date) = conversation.last_activity {
                        println!("  Last active:  {}", timestamp::format_iso8601(date));
                    }
                    if !conversation.participant_handles.is_empty() {
                        println!();
                        println!("{}", style("Participants").bold().underlined());
                        for (i, handle) in conversation.participant_handles.iter().enumerate() {
                            match conversation.display_name_at(i) {
                                Some(name) if name != handle => {
                                    println!("  - {name} ({handle})")
                                }
                                _ => println!("  - {handle}"),
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
