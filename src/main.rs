//! Listing Risk Service: binary entrypoint.
//! Loads configuration, wires the analyzer and serves the Axum router.
//!
//! See `README.md` for the configuration files and endpoints.

use listing_risk_analyzer::{api, metrics::Metrics};
use shuttle_axum::ShuttleAxum;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON lines with `LOG_FORMAT=json`.
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("listing_risk_analyzer=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // The deployment runtime may already own the global subscriber.
    let installed = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if installed.is_err() {
        debug!("tracing subscriber already installed by the runtime");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let state = api::AppState::from_env()?;
    let mut router = api::create_router(state);

    match Metrics::init() {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => warn!(error = %e, "metrics disabled"),
    }

    info!("listing risk service ready");
    Ok(router.into())
}
