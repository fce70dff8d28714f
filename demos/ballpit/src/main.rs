use std::time::Duration;

use chroma::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Runtime settings read from the environment.
///
/// - `CHROMA_BIND` — listen address (default `0.0.0.0:8080`)
/// - `CHROMA_PERIOD_MS` — broadcast period in milliseconds (default 500)
#[derive(Debug, PartialEq)]
struct Settings {
    bind: String,
    period: Duration,
}

impl Settings {
    fn from_env() -> Self {
        Self::from_vars(
            std::env::var("CHROMA_BIND").ok().as_deref(),
            std::env::var("CHROMA_PERIOD_MS").ok().as_deref(),
        )
    }

    fn from_vars(bind: Option<&str>, period_ms: Option<&str>) -> Self {
        let period = match period_ms.map(str::parse::<u64>) {
            Some(Ok(ms)) if ms > 0 => Duration::from_millis(ms),
            Some(_) => {
                tracing::warn!(value = ?period_ms, "ignoring invalid CHROMA_PERIOD_MS");
                TickConfig::DEFAULT_PERIOD
            }
            None => TickConfig::DEFAULT_PERIOD,
        };

        Self {
            bind: bind.unwrap_or(DEFAULT_BIND).to_string(),
            period,
        }
    }

    fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            tick: TickConfig::with_period(self.period),
            ..CoordinatorConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();
    tracing::info!(bind = %settings.bind, period_ms = settings.period.as_millis() as u64, "starting ballpit");

    let server = ChromaServerBuilder::new()
        .bind(&settings.bind)
        .config(settings.coordinator_config())
        .build()
        .await?;

    let coordinator = server.coordinator();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = coordinator.shutdown().await;
        }
    });

    server.run().await?;
    Ok(())
}
