//! Demo server exposing the `/demo` routes with request logging.
//!
//! Logging comes from the `logging` section of the files in `MOZI_CONFIG`.
//! Without one, a console subscriber filtered by `RUST_LOG` is used.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use mozi_core::{CoreError, Settings};
use tracing::{info, warn};

/// Address the demo server binds to, overridable with `MOZI_ADDR`.
const DEFAULT_ADDR: &str = "127.0.0.1:8000";

fn init_tracing(settings: &Settings) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    match settings.logger_loader().load() {
        Ok(config) => {
            info!(
                env = %settings.env,
                loggers = config.loggers().len(),
                "Logging configured from {:?}",
                settings.config_files
            );
            Ok(())
        }
        Err(e @ (CoreError::NoLoggingConfig | CoreError::ConfigNotFound { .. })) => {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(if settings.is_debug() { "debug" } else { "info" }));

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(true))
                .try_init()
                .context("Failed to install console subscriber")?;

            warn!("{}; logging to console", e);
            Ok(())
        }
        Err(e) => Err(e).context("Invalid logging configuration"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    init_tracing(&settings)?;

    let addr: SocketAddr = std::env::var("MOZI_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .context("Invalid MOZI_ADDR")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("[{}] Listening on {}", settings.app_name, addr);

    axum::serve(
        listener,
        mozi_api::demo::router().into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
