use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

use tubekit::config::Config;
use tubekit::repository::{SeaOrmUserRepository, SeaOrmVideoRepository};
use tubekit::routes::{create_routes, register};
use tubekit::services::{build_store, FfprobeCommand};
use tubekit::state::AppState;
use tubekit::telemetry::init_tracing;

#[derive(Parser)]
#[command(name = "tubekit", version, about = "Video metadata and asset upload service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply migrations and start the HTTP server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Create a user, prompting for the password
    CreateUser {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("invalid configuration")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    Migrator::up(&db, None).await.context("failed to run migrations")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            tracing::info!("Migrations applied");
        }
        Command::CreateUser { email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let users = SeaOrmUserRepository::new(db);
            let user = register(&users, &email, &password).await?;
            println!("Created user {} ({})", user.email, user.id);
        }
        Command::Serve => {
            let store = build_store(&config.storage)
                .await
                .context("failed to initialise asset storage")?;
            let probe = Arc::new(FfprobeCommand::new(
                config.ffprobe_path.clone(),
                config.probe_timeout,
            ));
            let port = config.port;
            tracing::info!(platform = %config.platform, "Starting tubekit");

            let state = AppState::new(
                config,
                Arc::new(SeaOrmUserRepository::new(db.clone())),
                Arc::new(SeaOrmVideoRepository::new(db)),
                store,
                probe,
            );
            let app = create_routes(state);

            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
            tracing::info!("Listening on {}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
