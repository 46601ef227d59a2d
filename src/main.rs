use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reeldigest::app::AppContext;
use reeldigest::cli::{commands, Cli, Commands, UsersAction};
use reeldigest::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(connections) = cli.connections {
        config.fetch.max_connections = connections.max(1);
    }
    let ctx = AppContext::with_config(config)?;

    match cli.command {
        Commands::Run { age, dry_run } => {
            commands::run(&ctx, age.as_deref(), dry_run).await?;
        }
        Commands::Once { age, dry_run } => {
            commands::once(&ctx, age.as_deref(), dry_run).await?;
        }
        Commands::Users { action } => match action {
            UsersAction::List => commands::list_users(&ctx)?,
            UsersAction::Add { name } => commands::add_user(&ctx, &name)?,
            UsersAction::Remove { name } => commands::remove_user(&ctx, &name)?,
        },
    }

    Ok(())
}
