use anyhow::Result;
use clap::Parser;

use tcg_collector_scrape::cli::{Cli, Command};
use tcg_collector_scrape::{app, logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Login { email, password } => app::login(config, &email, &password).await,
        Command::Logout => app::logout(),
        Command::Run { url, output } => app::run_single(config, &url, &output).await,
        Command::Multi {
            output,
            concurrency,
            force,
        } => app::run_multi(config, &output, concurrency, force).await,
    }
}
