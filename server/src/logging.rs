//! Structured Logging Setup via tracing-subscriber
//!
//! Ueberschreibbar per Umgebungsvariable:
//! - `FUNKRELAIS_LOG`: EnvFilter-Direktiven, z.B. `funkrelais_voice=debug`
//! - `FUNKRELAIS_LOG_FORMAT`: Format (text/json)

use tracing_subscriber::{fmt, EnvFilter};

/// Initialisiert das Logging-System.
///
/// Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env("FUNKRELAIS_LOG")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var("FUNKRELAIS_LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}

pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
