//! # Recipes Server
//!
//! Recipe-and-pantry management API built with Rust, Axum, and Tokio.
//! Users authenticate through a magic-link flow, manage pantry shelves
//! and items, author recipes with ingredients, build a meal plan, and
//! derive a grocery list from unmet ingredients.
//!
//! ## Architecture
//! - `server`: Core server initialization and route wiring
//! - `config`: Environment variable configuration management
//! - `auth`: Payload codec, magic links, sessions, nonce registry
//! - `database`: Postgres pool, models, embedded migrations
//! - `services`: Grocery list derivation
//! - `routes`: HTTP route handlers organized by functionality
//!
//! ## Environment Setup
//! Requires `MAGIC_LINK_SECRET`, `SESSION_SECRET`, `ORIGIN`, and
//! `DATABASE_URL`; a `.env` file is loaded if present. The process
//! refuses to start without them.
//!
//! ## Running the Server
//! ```bash
//! cargo run
//! ```

mod auth;
mod config;
mod database;
mod error;
mod routes;
mod server;
mod services;
mod validation;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Console output with compact formatting; RUST_LOG controls levels
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!("Starting recipes server...");
    tracing::info!(
        "Package: {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    // Run until process termination
    server::start().await;
}
