use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tcgscrape", about = "CLI for scraping and managing TCG Collector", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log into tcgcollector.com and save session cookies
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Log out by removing saved session data
    Logout,
    /// Scrape a single set page
    Run {
        /// URL of the set to scrape
        url: String,
        /// Output path (file or directory)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Select sets from the index and scrape each into its own folder
    Multi {
        /// Output root folder
        #[arg(short, long)]
        output: PathBuf,
        /// How many sets to scrape at the same time
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Overwrite existing files instead of skipping them
        #[arg(short, long)]
        force: bool,
    },
}
