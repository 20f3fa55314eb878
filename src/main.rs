#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::api::router;
use crate::config::Config;
use crate::config::PrioritizedLanguages;
use crate::handler::UrlAliasHandler;
use crate::storage::Memory;
use crate::storage::Postgres;
use crate::storage::Storage;

mod aliases;
mod api;
mod config;
mod graceful_shutdown;
mod handler;
mod languages;
mod locations;
mod root;
mod slug;
mod storage;
#[cfg(test)]
mod tests;
mod utils;

const DEFAULT_RUST_LOG: &str = "urlalias=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let config = Config::from_env()?;

    let app = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Using Postgres storage");

            setup_app(Postgres::new(database_url).await?, &config).await?
        }
        None => {
            tracing::info!("`DATABASE_URL` is not set, using memory storage");

            setup_app(Memory::new(), &config).await?
        }
    };

    let listener = TcpListener::bind(config.address).await?;
    tracing::info!("Listening on {}", config.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if the root location or its root entry can not be created
pub async fn setup_app<S: Storage>(storage: S, config: &Config) -> Result<Router> {
    let handler = UrlAliasHandler::new(
        storage,
        config.languages.clone(),
        config.root_location_id,
        config.conflict_policy.disambiguation(),
    );

    handler.ensure_root().await?;

    Ok(create_router(
        handler,
        PrioritizedLanguages(Arc::new(config.prioritized_languages.clone())),
    ))
}

/// Create the router for the alias service
fn create_router<S: Storage>(
    handler: UrlAliasHandler<S>,
    prioritized_languages: PrioritizedLanguages,
) -> Router {
    Router::new()
        .nest("/api", router::<S>())
        .fallback(get(root::root::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(handler))
        .layer(Extension(prioritized_languages))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}
