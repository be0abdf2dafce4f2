//! LexAI HTTP server.
//!
//! Model settings come from `LEXAI_CONFIG` / `LEXAI_*` variables (see
//! `RuntimeConfig::load`); listen address, database and token settings from
//! the variables listed in `lexai_server::config`.

use std::sync::Arc;

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use lexai_runtime::{GeminiProvider, LexAi, RuntimeConfig};
use lexai_server::{router, Accounts, ServerConfig, Store, TokenKeys};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RuntimeConfig::load(None).context("Failed to load configuration")?;
    let server = ServerConfig::from_env().context("Invalid server settings")?;

    // A missing key still starts the server; analyses then degrade
    let provider =
        GeminiProvider::from_config_lenient(&config).context("Failed to create Gemini provider")?;
    let lexai = Arc::new(LexAi::new(Arc::new(provider), &config));

    let store = Store::open(&server.database)
        .with_context(|| format!("Failed to open database {}", server.database.display()))?;
    let tokens = match &server.jwt_secret {
        Some(secret) => TokenKeys::new(secret.expose_secret().as_bytes(), server.token_ttl),
        None => {
            tracing::warn!(
                "LEXAI_JWT_SECRET not set, using a random secret; tokens end with the process"
            );
            TokenKeys::random(server.token_ttl)
        }
    };
    let accounts = Accounts::new(store, tokens);

    let listener = tokio::net::TcpListener::bind(server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", server.bind))?;
    tracing::info!(
        bind = %server.bind,
        database = %server.database.display(),
        primary_model = %config.primary_model,
        fallback_model = %config.fallback_model,
        chat_model = %config.chat_model,
        "Starting LexAI API"
    );

    axum::serve(listener, router(lexai, accounts)).await?;
    Ok(())
}
