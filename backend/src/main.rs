//! Course marketplace server entry-point.
//!
//! Loads `MARKET_*` settings, reads the token signing secret, runs pending
//! migrations when a database is configured and serves `/api/v1`.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{WrapErr, eyre};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use course_market::inbound::http::health::HealthState;
use course_market::inbound::http::token_config::{BuildMode, signing_secret_from_env};
use course_market::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use course_market::server::{MarketSettings, ServerConfig, create_server};

#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = MarketSettings::load().map_err(|err| eyre!("loading settings: {err}"))?;
    let secret = signing_secret_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("loading token signing secret")?;

    let mut config = ServerConfig::new(
        settings.bind_addr()?,
        Arc::new(secret),
        settings.blob_root(),
    )
    .with_token_validity(settings.token_validity()?)
    .with_policy(settings.storage_policy()?);

    match settings.database_url.as_deref() {
        Some(url) => {
            run_pending_migrations(url)
                .await
                .wrap_err("applying database migrations")?;
            let pool = DbPool::new(PoolConfig::new(url))
                .await
                .wrap_err("connecting to the database")?;
            config = config.with_db_pool(pool);
        }
        None => info!("no database configured; using in-memory storage"),
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome.wrap_err("HTTP server failed")
}
