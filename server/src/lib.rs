//! funkrelais-server – Bibliotheks-Root
//!
//! Verdrahtet den Voice-Kern zu einem Prozess. Ein Spiel-Host bettet das
//! Relais ueber [`Server::einbetten`] ein und ruft Login, Logout und
//! Seitenkanal-Nachrichten ueber [`VoiceHandle::bruecke`] auf.
//!
//! Das eigenstaendige Binary ([`Server::starten`]) laeuft ohne Host mit
//! leerer In-Memory-Welt und ohne registrierte Seitenkanaele. Es bindet
//! und relaisiert, kann aber niemanden authentifizieren, weil kein Host
//! Verbindungsangebote ausloest.

pub mod config;
pub mod logging;

use anyhow::Result;
use config::ServerConfig;
use funkrelais_voice::{
    Seitenkanal, SeitenkanalVerteiler, SpeicherWelt, SpielWelt, VoiceHandle, VoiceServer,
};
use std::sync::Arc;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bindet und startet das Relais mit den Schnittstellen des Hosts
    ///
    /// Der Aufrufer besitzt das Handle: Callbacks laufen ueber
    /// `handle.bruecke()`, Shutdown ueber `handle.beenden()`.
    pub async fn einbetten<W: SpielWelt, K: Seitenkanal>(
        &self,
        welt: Arc<W>,
        seitenkanal: Arc<K>,
    ) -> Result<VoiceHandle<K>> {
        let voice_config = self.config.voice_config()?;
        tracing::info!(
            udp = %self.config.udp_bind_adresse(),
            distanz = voice_config.distanz,
            keepalive_ms = self.config.voice.keepalive_ms,
            timeout_ms = self.config.voice.timeout_ms,
            "Relais startet"
        );

        let server = VoiceServer::binden(voice_config).await?;
        let handle = server.starten(welt, seitenkanal)?;
        tracing::info!(adresse = %handle.lokale_adresse(), "Relais laeuft");
        Ok(handle)
    }

    /// Eigenstaendiger Betrieb bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. UDP-Socket binden (Fehler ist fatal)
    /// 2. Empfangs- und Verarbeiter-Task starten
    /// 3. Auf Ctrl-C warten, dann beide Tasks beenden
    pub async fn starten(self) -> Result<()> {
        tracing::warn!("Kein Spiel-Host eingebettet – Clients koennen sich nicht authentifizieren");
        let handle = self
            .einbetten(
                Arc::new(SpeicherWelt::neu()),
                Arc::new(SeitenkanalVerteiler::neu()),
            )
            .await?;
        tracing::info!("Warte auf Shutdown-Signal (Ctrl-C)...");

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Relais wird beendet");

        handle.beenden();
        handle.beendet().await;
        Ok(())
    }
}
