//! MDM Console CLI

use clap::ArgMatches;
use mdm_console::cli::{build_cli, resolve_config};
use mdm_console::logging::init_tracing;
use mdm_console::{user_message, Console};

async fn run(matches: &ArgMatches) -> anyhow::Result<String> {
    let config = resolve_config(matches)?;
    tracing::debug!("Using API at {}", config.base_url);
    let console = Console::new(config)?;
    console.run(matches).await
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"), matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", user_message(&e));
            std::process::exit(1);
        }
    }
}
