//! # MCP Memory CLI (`mcpm`)
//!
//! ## Usage
//!
//! ```bash
//! mcpm --config ./config/mcpm.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mcpm serve` | Start the HTTP ingestion and query service |
//! | `mcpm scan <PATH\|->` | Extract blocks from pages and send them |
//! | `mcpm resend` | Retry queued blocks that were not acknowledged |
//! | `mcpm pending` | List queued blocks that were not acknowledged |
//! | `mcpm search [QUERY]` | Search stored records |
//! | `mcpm get <id>` | Show one record |
//! | `mcpm delete <id>` | Delete one record |
//! | `mcpm clear` | Delete every record |
//! | `mcpm stats` | Summarize the store |
//! | `mcpm export` | Dump every record as JSON |
//! | `mcpm hash <TEXT>` | Print the content hash of a text |
//!
//! `get`, `delete`, `clear`, `stats`, `export`, `search` and `scan --local`
//! open the store file directly and must not run against a file that a
//! running `mcpm serve` owns.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mcp_memory::pages::SourceOverrides;
use mcp_memory::{config, export, get, logging, scan, search, server, stats};
use mcp_memory_core::hash::content_hash;

/// MCP Memory: capture and search delimited memory blocks from AI chats.
#[derive(Parser)]
#[command(name = "mcpm", version)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/mcpm.toml")]
    config: PathBuf,

    /// Log filter, overriding RUST_LOG (e.g. `debug`, `mcp_memory=trace`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Disable ANSI colors in log output (also honored: `NO_COLOR`).
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service.
    Serve,

    /// Extract blocks from a file, a directory, or stdin (`-`) and send them.
    Scan {
        /// File, directory, or `-` for stdin.
        target: String,

        /// Source URL recorded with every block (defaults to `file://<path>`).
        #[arg(long)]
        url: Option<String>,

        /// Source title recorded with every block (defaults to the file name).
        #[arg(long)]
        title: Option<String>,

        /// Write into the local store file instead of the HTTP endpoint.
        #[arg(long)]
        local: bool,
    },

    /// Retry queued blocks that were not acknowledged.
    Resend {
        #[arg(long)]
        local: bool,
    },

    /// List queued blocks that were not acknowledged.
    Pending,

    /// Search stored records.
    Search {
        /// Case-insensitive text matched against content and tags.
        query: Option<String>,

        /// Comma-separated tags; records with any of them match.
        #[arg(long)]
        tags: Option<String>,

        /// Only records saved at or after this time (RFC 3339 or YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one record.
    Get { id: String },

    /// Delete one record.
    Delete { id: String },

    /// Delete every record.
    Clear,

    /// Summarize the store.
    Stats,

    /// Dump every record as a JSON array.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the content hash of a text, as the agent computes it.
    Hash { text: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        config: config_path,
        log_level,
        no_color,
        command,
    } = Cli::parse();

    let color = !no_color && std::env::var_os("NO_COLOR").is_none();
    logging::init_logging(log_level.as_deref(), color)?;

    // `hash` runs without a config file.
    let load = || config::load_config(&config_path);

    match command {
        Commands::Hash { text } => {
            println!("{}", content_hash(&text));
        }
        Commands::Serve => {
            server::run_server(&load()?).await?;
        }
        Commands::Scan {
            target,
            url,
            title,
            local,
        } => {
            scan::run_scan(&load()?, &target, SourceOverrides { url, title }, local).await?;
        }
        Commands::Resend { local } => {
            scan::run_resend(&load()?, local).await?;
        }
        Commands::Pending => {
            scan::run_pending(&load()?).await?;
        }
        Commands::Search {
            query,
            tags,
            since,
            limit,
        } => {
            search::run_search(&load()?, query, tags, since, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&load()?, &id).await?;
        }
        Commands::Delete { id } => {
            get::run_delete(&load()?, &id).await?;
        }
        Commands::Clear => {
            get::run_clear(&load()?).await?;
        }
        Commands::Stats => {
            stats::run_stats(&load()?).await?;
        }
        Commands::Export { output } => {
            export::run_export(&load()?, output.as_deref()).await?;
        }
    }

    Ok(())
}
