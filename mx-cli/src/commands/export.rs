//! Export command.

use std::path::PathBuf;
use std::str::FromStr;

use console::style;

use mx_core::config::AppConfig;
use mx_core::error::MxResult;
use mx_core::MxError;
use mx_export::{export, ExportBundle, ExportFormat};
use mx_store::SelectionKey;

pub struct ExportArgs {
    pub chat: String,
    pub by_rowid: bool,
    pub format: String,
    pub output: Option<String>,
    pub passphrase: Option<String>,
}

pub async fn run(config: &AppConfig, db_path: &std::path::Path, args: ExportArgs) -> MxResult<()> {
    let format = ExportFormat::from_str(&args.format)?;

    let key = if args.by_rowid {
        let row_id = args
            .chat
            .parse::<i64>()
            .map_err(|_| MxError::Config(format!("not a row id: {}", args.chat)))?;
        SelectionKey::RowId(row_id)
    } else {
        SelectionKey::Guid(args.chat.clone())
    };

    // Prompt before any database work so a typo'd passphrase flow
    // never leaves a half-finished export behind.
    let passphrase = match format {
        ExportFormat::Encrypted => Some(match args.passphrase {
            Some(p) => p,
            None => dialoguer::Password::new()
                .with_prompt("Passphrase")
                .with_confirmation("Confirm passphrase", "Passphrases do not match")
                .interact()
                .map_err(|e| MxError::Internal(format!("passphrase prompt failed: {e}")))?,
        }),
        _ => None,
    };
    if matches!(format, ExportFormat::Encrypted)
        && passphrase.as_deref().map(str::is_empty).unwrap_or(true)
    {
        return Err(MxError::PassphraseMissing);
    }

    let store = super::open_store(config, db_path);
    let conversation = super::find_conversation(&store, &key).await?;
    let messages = store
        .load_messages(&conversation.identifier, conversation.selection_key())
        .await?;

    let bundle = ExportBundle::new(conversation, messages);
    let dest = destination(config, &bundle, format, args.output.as_deref());

    export(&bundle, format, &dest, passphrase.as_deref())?;

    println!(
        "{} exported {} messages from \"{}\" to {}",
        style("OK").green().bold(),
        bundle.messages.len(),
        bundle.conversation.title,
        dest.display()
    );
    Ok(())
}

/// Explicit output path, or a name derived from the chat title in the
/// configured output directory.
fn destination(
    config: &AppConfig,
    bundle: &ExportBundle,
    format: ExportFormat,
    output: Option<&str>,
) -> PathBuf {
    match output {
        Some(path) => PathBuf::from(path),
        None => {
            let stem = sanitize_file_stem(&bundle.conversation.title);
            config
                .effective_output_dir()
                .join(format!("{stem}.{}", format.extension()))
        }
    }
}

fn sanitize_file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "conversation".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Alice Smith"), "Alice_Smith");
        assert_eq!(sanitize_file_stem("+1 (555) 123"), "_1__555__123");
        assert_eq!(sanitize_file_stem(""), "conversation");
    }
}
