//! CLI argument parsing using clap.

use clap::{
    Args, Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::Settings;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Documentation index server
#[derive(Parser, Debug)]
#[command(
    name = "doctree",
    version = env!("CARGO_PKG_VERSION"),
    about = "Index documentation trees and serve them over HTTP",
    long_about = "Keeps documentation indexes in sync with source directories on disk \
                  and serves them, with a web client, over HTTP.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  doctree add ~/src/github.com/org/repo --name github.com/org/repo\n  doctree serve\n  doctree serve --http 0.0.0.0:3333 --cloud\n  doctree list"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true, env = "DOCTREE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the auto-index state and the indexes
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings from file and environment with global CLI overrides applied.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        Ok(settings)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the auto-indexer and the HTTP server
    #[command(
        about = "Start the server",
        long_about = "Reindex stale projects, watch every registered project, and serve the indexes over HTTP."
    )]
    Serve(ServeArgs),

    /// Register a directory for auto-indexing
    #[command(about = "Register a directory and index it now")]
    Add {
        /// Directory to track
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Stop tracking a project
    #[command(about = "Unregister a project")]
    Remove {
        /// Registered project name
        name: String,
    },

    /// Index a directory once without registering it
    #[command(about = "Build an index for a directory")]
    Index {
        /// Directory to index
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Show registered projects
    #[command(about = "List registered projects and whether each is stale")]
    List,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to listen on (overrides config)
    #[arg(long, value_name = "ADDR")]
    pub http: Option<String>,

    /// Run in cloud mode
    #[arg(long)]
    pub cloud: bool,
}

impl ServeArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(bind) = &self.http {
            settings.http.bind = bind.clone();
        }
        if self.cloud {
            settings.http.cloud_mode = true;
        }
    }
}
