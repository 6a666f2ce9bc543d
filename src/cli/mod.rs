pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedmirror")]
#[command(about = "Mirror an RSS/Atom feed into an append-only archive", long_about = None)]
pub struct Cli {
    /// Archive directory (default: <data dir>/feedmirror)
    #[arg(short, long, global = true)]
    pub archive: Option<PathBuf>,

    /// Configuration file (default: ~/.config/feedmirror/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or open the archive and print its keys
    Init,
    /// Ingest a feed document and store new items
    Update {
        /// Feed URL or path to a feed file
        source: String,

        /// Fetch each new item's link and store it under scrap/
        #[arg(long)]
        scrap: bool,
    },
    /// Re-run update on an interval until interrupted
    Watch {
        /// Feed URL or path to a feed file
        source: String,

        /// Update interval (e.g., "1h", "30m", "6h", "1d")
        #[arg(short, long, default_value = "1h")]
        interval: String,

        /// Skip initial update on start
        #[arg(long)]
        no_initial_update: bool,

        /// Fetch each new item's link and store it under scrap/
        #[arg(long)]
        scrap: bool,
    },
    /// List stored item identifiers
    List,
    /// Print a stored record (or scrap/<id>, scrapped/<id>)
    Get {
        id: String,
    },
    /// Print the body scraped for an item
    Scrapped {
        id: String,
    },
    /// Store an item directly
    Save(SaveArgs),
    /// Replace the feed metadata
    SetMeta {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        link: String,
    },
    /// Show the feed metadata
    Meta,
    /// Write stored items as an RSS 2.0 document
    Export {
        /// Maximum number of items (default: mirror.export_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct SaveArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub link: Option<String>,
    #[arg(long)]
    pub guid: Option<String>,
    /// RFC 3339 publication date
    #[arg(long)]
    pub date: Option<String>,
    /// File whose content is stored as scrapped/<id>
    #[arg(long)]
    pub body: Option<PathBuf>,
}
