use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use common::storage::filesystem::FilesystemBlobStore;
use tracing::{Level, info};

use rehagoal_server::config::AppConfig;
use rehagoal_server::database::init_db;
use rehagoal_server::seed::ensure_bootstrap_admin;
use rehagoal_server::service::identity::IdentityService;
use rehagoal_server::state::AppState;

#[derive(Parser)]
#[command(name = "rehagoal-server", version, about = "RehaGoal workflow server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create a principal together with its profile.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, env = "REHAGOAL_NEW_USER_PASSWORD")]
        password: String,
        /// Grant staff rights.
        #[arg(long)]
        staff: bool,
    },
    /// Delete a principal, its profile, workflows and their content.
    DeleteUser {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;

    let blob_store = FilesystemBlobStore::new(
        PathBuf::from(&config.storage.files_dir),
        config.storage.max_content_size,
    )
    .await
    .context("Failed to open blob store")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            if let Some(admin) = &config.auth.bootstrap_admin {
                ensure_bootstrap_admin(&db, admin)
                    .await
                    .map_err(|e| anyhow!("Failed to seed bootstrap admin: {e:?}"))?;
            }

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let state = AppState {
                db,
                blob_store: Arc::new(blob_store),
                config,
            };
            let app = rehagoal_server::build_router(state);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Server running at http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Command::CreateUser {
            username,
            password,
            staff,
        } => {
            let (user, profile) = IdentityService::new(&db)
                .create_principal(&username, &password, staff)
                .await
                .map_err(|e| anyhow!("Failed to create user: {e:?}"))?;
            info!(user_id = user.id, profile_id = %profile.id, "Created user {}", user.username);
        }
        Command::DeleteUser { username } => {
            let removed = IdentityService::new(&db)
                .delete_principal(&username, &blob_store)
                .await
                .map_err(|e| anyhow!("Failed to delete user: {e:?}"))?;
            info!(workflows = removed, "Deleted user {}", username);
        }
    }

    Ok(())
}
