//! TradeVault - Encrypted Exchange Credential Vault
//! Mission: Keep exchange API secrets encrypted at rest, revealed only to
//! their owner, under one process-wide master key

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradevault_backend::api::{create_router, identity::IdentityVerifier, VaultApiState};
use tradevault_backend::vault::{CredentialStore, KeyHandle};

#[derive(Parser)]
#[command(name = "tradevault", about = "Encrypted exchange credential vault")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the vault API server (default)
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Print a fresh base64-encoded 256-bit master key and exit.
    /// Touches no live state; the operator installs the value into
    /// MASTER_ENCRYPTION_KEY.
    GenerateMasterKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve { port: 3000 }) {
        Command::Serve { port } => serve(port).await,
        Command::GenerateMasterKey => generate_master_key(),
    }
}

async fn serve(port: u16) -> Result<()> {
    info!("🚀 TradeVault starting");

    // Fatal if the master key is missing or malformed; never retried
    let key = KeyHandle::load_from_env().context("Master key configuration is invalid")?;
    info!("🔑 Master key loaded");

    let db_path = env::var("VAULT_DB_PATH").unwrap_or_else(|_| "tradevault.db".to_string());
    let store = Arc::new(CredentialStore::new(&db_path, key)?);
    info!("💾 Credential store initialized at: {}", db_path);

    let jwt_secret = env::var("JWT_SECRET")
        .unwrap_or_else(|_| "dev-secret-change-in-production-minimum-32-characters".to_string());
    let verifier = Arc::new(IdentityVerifier::new(jwt_secret));

    let app = create_router(VaultApiState::new(store, verifier))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("🎯 Vault API listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn generate_master_key() -> Result<()> {
    let encoded = KeyHandle::generate_base64()?;
    println!("{}", encoded);
    eprintln!("Install this value as MASTER_ENCRYPTION_KEY before starting the server.");
    Ok(())
}

/// Initialize tracing with env-filter support
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradevault_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
