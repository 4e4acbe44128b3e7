//! checkout-swift
//!
//! A member ledger for a retail checkout: records live in memory, persist to
//! device-local storage in guest mode or to a cloud account row when signed
//! in, and move between devices via JSON export or compressed share links.

mod cli;
mod config;
mod errors;
mod extract;
mod models;
mod persist;
mod remote;
mod share;
mod store;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Data directory: {:?}", config.data_dir);

    if let Err(e) = cli::run(config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
