mod cli;
mod config;
mod error;
mod load;
mod normalize;
mod schema;
mod sheet;

use anyhow::Result;
use clap::Parser;

use cli::commands::import::handle_import_command;
use cli::commands::schema::handle_schema_command;
use cli::commands::sheets::handle_sheets_command;
use cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // .env is optional; DATABASE_URL may come from the real environment
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Import(args) => handle_import_command(args, cli.config.as_deref()).await,
        Commands::Sheets(args) => handle_sheets_command(args).await,
        Commands::Schema(args) => handle_schema_command(args).await,
    }
}
