use crate::config::{Paths, UserConfig};
use crate::search::SearchClient;
use crate::tui;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ubunolia",
    version,
    about = "Terminal browser for the archived Ubuntu IRC logs"
)]
pub struct Cli {
    /// Override the config root directory (default: ~/.ubunolia).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive two-pane session (the default).
    Tui,
    /// List the indexed channels.
    Channels,
    /// Transcript lines matching a minute stamp in one channel.
    Logs {
        /// Minute stamp, e.g. "2017-05-16T09:41".
        timestamp: String,
        channel: String,
    },
    /// Summarize a user's history.
    Whois { username: String },
    /// Timestamp of a user's most recent line.
    Seen { username: String },
    /// Full-text search, optionally restricted to one channel.
    Search {
        query: String,
        #[arg(long)]
        channel: Option<String>,
    },
    /// The most active usernames.
    Top {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Total number of indexed log lines.
    Count,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None | Some(Commands::Tui) => tui::run(cli.root),
        Some(command) => {
            env_logger::init();
            run_headless(cli.root, command)
        }
    }
}

fn run_headless(root: Option<PathBuf>, command: Commands) -> Result<()> {
    let paths = Paths::new(root)?;
    let config = UserConfig::load(&paths)?;
    let client = SearchClient::new(&config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Tui => unreachable!("handled by the caller"),
        Commands::Channels => {
            for channel in client.channels()? {
                writeln!(out, "{channel}")?;
            }
        }
        Commands::Logs { timestamp, channel } => {
            for line in client.log_lines(&timestamp, &channel)? {
                writeln!(out, "{line}")?;
            }
        }
        Commands::Whois { username } => {
            let info = client.whois(&username)?;
            writeln!(out, "{}", info.describe(&username))?;
        }
        Commands::Seen { username } => {
            writeln!(out, "{}", client.last_seen(&username)?)?;
        }
        Commands::Search { query, channel } => {
            for line in client.search_lines(&query, channel.as_deref())? {
                writeln!(out, "{line}")?;
            }
        }
        Commands::Top { limit } => {
            for username in client.top_users(limit)? {
                writeln!(out, "{username}")?;
            }
        }
        Commands::Count => {
            writeln!(out, "{}", client.total_records()?)?;
        }
    }
    Ok(())
}
