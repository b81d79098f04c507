mod body;
mod cli;
mod config;
mod git;
mod github;
mod logging;
mod model;
mod project;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;

    // Load config
    let config = config::load_config()?;

    cli::run(command, &config).await
}
