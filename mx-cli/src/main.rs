//! msgexport CLI - export conversations from a local messages database.
//!
//! Reads the source database read-only, adapts to whichever schema
//! version it finds, and writes conversations to text, JSON, SQLite,
//! or an encrypted container.

mod commands;

use clap::{Parser, Subcommand};
use tracing::info;

use mx_core::config::AppConfig;
use mx_core::error::MxResult;
use mx_core::logging;
use mx_core::platform::Platform;

/// msgexport - chat history export tool.
#[derive(Parser)]
#[command(
    name = "msgexport",
    version,
    about = "Export conversations from a local messages database",
    long_about = "Reads a chat.db-style messages database read-only and exports \
                  conversations to plain text, JSON, SQLite, or an encrypted container.\n\
                  Tolerates schema differences across OS versions."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the source database (overrides config and default).
    #[arg(short, long, global = true)]
    db: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List and inspect conversations.
    Chats {
        #[command(subcommand)]
        action: commands::chats::ChatsAction,
    },
    /// Probe the source database schema and report support.
    Schema,
    /// Export one conversation to a file.
    Export {
        /// Conversation guid, or row id when --by-rowid is set.
        chat: String,
        /// Treat the chat argument as a numeric row id.
        #[arg(long)]
        by_rowid: bool,
        /// Export format (text, json, sqlite, encrypted).
        #[arg(short = 'F', long, default_value = "json")]
        export_format: String,
        /// Destination file. Derived from the chat title when omitted.
        #[arg(short, long)]
        output: Option<String>,
        /// Passphrase for encrypted export. Prompted when omitted.
        #[arg(short, long)]
        passphrase: Option<String>,
    },
    /// Decrypt an encrypted export container.
    Decrypt {
        /// Container file to decrypt.
        input: String,
        /// Destination for the decrypted JSON.
        output: String,
        /// Passphrase. Prompted when omitted.
        #[arg(short, long)]
        passphrase: Option<String>,
    },
    /// Run access diagnostics against the source database.
    Diagnose,
}

#[tokio::main]
async fn main() -> MxResult<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let log_dir = Platform::data_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join("logs");
    let _guard = logging::init_logging(log_level, &log_dir, false)?;

    let config_path = cli.config.as_deref().map(std::path::Path::new);
    let config = if let Some(path) = config_path {
        AppConfig::load_from_file(path)?
    } else {
        AppConfig::load_default()?
    };

    info!("msgexport v{}", mx_core::constants::APP_VERSION);

    let db_path = commands::resolve_db_path(&config, cli.db.as_deref())?;

    match cli.command {
        Commands::Chats { action } => {
            commands::chats::run(&config, &db_path, action, cli.format).await
        }
        Commands::Schema => commands::schema::run(&db_path, cli.format).await,
        Commands::Export {
            chat,
            by_rowid,
            export_format,
            output,
            passphrase,
        } => {
            commands::export::run(
                &config,
                &db_path,
                commands::export::ExportArgs {
                    chat,
                    by_rowid,
                    format: export_format,
                    output,
                    passphrase,
                },
            )
            .await
        }
        Commands::Decrypt {
            input,
            output,
            passphrase,
        } => commands::decrypt::run(&input, &output, passphrase).await,
        Commands::Diagnose => commands::diagnose::run(&db_path).await,
    }
}
