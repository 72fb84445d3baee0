mod alerts;
mod analysis;
mod config;
mod db;
mod decimal;
mod dispatch;
mod error;
mod metrics;
mod routes;
mod server;
mod state;
mod websites;

use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use config::{CliArgs, DashboardConfig};
use db::DashboardDb;
use dispatch::mailer::HttpMailTransport;
use state::DashboardState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Initialize tracing, optionally into a log file
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitals_dashboard=info,tower_http=info".into());
    let _log_guard = match &args.log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "dashboard.log".into());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            None
        }
    };

    info!("Starting vitals-dashboard v{}", env!("CARGO_PKG_VERSION"));

    let config = DashboardConfig::from_args(args);
    info!("Data dir: {:?}", config.data_dir);
    info!("Digest dispatch: {}", config.mail_endpoint.is_some());
    info!("LLM analysis: {}", config.llm_endpoint.is_some());

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!("Failed to create data dir {:?}: {}", config.data_dir, e);
        std::process::exit(1);
    }

    let port = config.port;
    let db = DashboardDb::new(&config.data_dir)?;
    let state = Arc::new(DashboardState::new(config, db)?);

    // Spawn the digest dispatcher only when a mail gateway is configured
    let _dispatcher_handle = match &state.config.mail_endpoint {
        Some(endpoint) => {
            let mailer = HttpMailTransport::new(endpoint, &state.config.mail_from)?;
            Some(dispatch::engine::spawn_dispatcher(
                state.clone(),
                Arc::new(mailer),
            ))
        }
        None => {
            info!("No mail endpoint configured; digest dispatch disabled");
            None
        }
    };

    // Build and start HTTP server
    let router = server::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Dashboard listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard shutting down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal");
}
