use std::error::Error;

use clap::{Parser, Subcommand};
use recipe_api::{
    config::Config,
    readiness::{wait_for_db, WaitOptions},
    server::{run_migrations, serve},
    state::State,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Recipe API server")]
struct Args {
    /// Overrides DATABASE_URL.
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Overrides BIND_ADDRESS.
    #[arg(long, env = "BIND_ADDRESS", global = true)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Wait for the database, migrate, then serve (default).
    Serve,
    /// Apply pending migrations and exit.
    Migrate,
    /// Block until the database accepts connections.
    WaitForDb,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    let options = WaitOptions {
        attempts: config.db_wait_attempts,
        interval: config.db_wait_interval,
        max_connections: config.db_max_connections,
        ..WaitOptions::default()
    };
    let pool = wait_for_db(&config.database_url, options).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::WaitForDb => {}
        Command::Migrate => run_migrations(&pool).await?,
        Command::Serve => {
            run_migrations(&pool).await?;
            serve(State::new(pool, config)).await?;
        }
    }

    Ok(())
}
