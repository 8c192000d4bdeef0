use anyhow::Result;
use clap::{CommandFactory, Parser};

use qachat::{run_repl_mode, run_web_server, setup_from_cli, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Some(shell) = cli.generate {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    let config = setup_from_cli(&cli)?;

    if cli.web {
        return run_web_server(&config).await;
    }

    run_repl_mode(&config).await
}
