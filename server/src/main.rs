//! funkrelais – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet das Relais.

use anyhow::Result;
use funkrelais_server::{config::ServerConfig, logging::logging_initialisieren, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad =
        std::env::var("FUNKRELAIS_CONFIG").unwrap_or_else(|_| "funkrelais.toml".into());

    let config = ServerConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "funkrelais wird initialisiert"
    );

    Server::neu(config).starten().await
}
