// utils/telemetry.rs
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Configure le tracing pour le logging structuré.
///
/// `LOG_LEVEL` fixe le niveau par défaut (`info`), `RUST_LOG` l'affine par module.
/// `LOG_FORMAT=json` produit des lignes JSON, toute autre valeur un format compact.
pub fn setup_tracing() {
    let log_level = env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(tracing::Level::INFO);

    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "json".into());

    let layer = if log_format == "json" {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_line_number(true)
            .with_file(true)
            .boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(layer)
        .try_init();
}
