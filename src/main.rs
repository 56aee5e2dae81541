use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use course_office::{api, config::Config, db::Database};
use tracing::{error, info};

#[derive(Parser)]
struct Opts {
    #[clap(short, long, env = "COURSE_OFFICE_CONFIG")]
    config: Option<PathBuf>,
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for ctrl-c");
    }
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = match &opts.config {
        Some(path) => Config::load(path)
            .await
            .with_context(|| format!("load config from {}", path.display()))?,
        None => Config::default(),
    };

    let db = Database::open(&config.database.url)
        .await
        .with_context(|| "open database")?;
    db.bootstrap(&config.transformer(), config.seed_admin.as_ref())
        .await
        .with_context(|| "bootstrap database")?;

    let router = api::router(api::AppState::new(db.pool().clone(), &config));
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind {}", config.listen))?;
    info!(listen = %config.listen, "serving");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "serve")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    if let Err(e) = run(opts).await {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
