use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "comicshelf")]
#[command(author, version, about = "Comic archive library scanner and indexer")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override storage.data_dir
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override library.roots (repeatable)
    #[arg(long = "root", global = true)]
    pub roots: Vec<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the library and update the index
    Scan {
        /// Only rescan these paths (each must be inside a root)
        #[arg(long = "path")]
        paths: Vec<PathBuf>,

        /// Incremental scan of all roots; implied by --path
        #[arg(long)]
        incremental: bool,
    },

    /// List series
    Series,

    /// List the issues of a series in reading order
    Issues {
        /// Series id
        series_id: String,
    },

    /// Show one issue and its pages
    Issue {
        /// Issue id
        issue_id: String,
    },

    /// Extract a page image
    Page {
        issue_id: String,

        /// Zero-based page index
        index: usize,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render the cover thumbnail as JPEG
    Thumbnail {
        issue_id: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Record reading progress
    Progress {
        issue_id: String,

        /// Zero-based current page
        page: u32,

        /// Mark the issue as read
        #[arg(long)]
        read: bool,
    },

    /// Delete series without live issues
    Prune {
        /// Also purge every retired issue row
        #[arg(long)]
        retired: bool,
    },

    /// Show recent scan runs
    Runs {
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
