use anyhow::Context;
use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{email, Config};

mod error;
mod extract;
mod reset;

pub use error::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Clone)]
pub struct AppState {
    email: Arc<email::Client>,
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let client = Arc::new(config.email_client()?);

    // The relay check runs alongside the listener and never blocks it.
    tokio::spawn({
        let client = client.clone();
        async move { client.self_check().await }
    });

    let app = app(client);

    announce(config.port);

    axum::Server::bind(&SocketAddr::from(([0, 0, 0, 0], config.port)))
        .serve(app.into_make_service())
        .await
        .context("serve failed")
}

fn announce(port: u16) {
    info!("Pudo Email Service is running:{port}");
}

pub fn app(email: Arc<email::Client>) -> Router {
    reset::routes()
        .with_state(AppState { email })
        .layer(TraceLayer::new_for_http())
        .route("/health", get(health))
        .layer(CorsLayer::very_permissive())
}

#[derive(Debug, Serialize)]
struct Health {
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    let health = Health {
        version: env!("CARGO_PKG_VERSION"),
    };

    ([("cache-control", "no-cache")], Json(health))
}
