//! Fehlertypen fuer funkrelais
//!
//! Zentraler Fehler-Enum. Fehler einzelner Pakete werden im Verarbeiter
//! geloggt und verworfen, nur der Bind-Fehler ist fatal.

use thiserror::Error;

/// Globaler Result-Alias fuer funkrelais
pub type Result<T> = std::result::Result<T, FunkError>;

/// Alle Fehlerzustaende des Relais
#[derive(Debug, Error)]
pub enum FunkError {
    // --- Netzwerk ---
    #[error("UDP-Socket konnte nicht an {adresse} gebunden werden: {quelle}")]
    Bind {
        adresse: String,
        #[source]
        quelle: std::io::Error,
    },

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    // --- Protokoll ---
    #[error("Ungueltiges Paket: {0}")]
    UngueltigesPaket(String),

    #[error("Inkompatible Voice-Version: server={server}, client={client}")]
    InkompatibleVersion { server: u32, client: u32 },

    // --- Sitzung ---
    #[error("Authentifizierung fehlgeschlagen fuer {0}")]
    Authentifizierung(String),

    #[error("Keine Sitzung fuer {0}")]
    KeineSitzung(String),

    #[error("Ungueltiger Kanalname: {0:?}")]
    UngueltigerKanalName(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl FunkError {
    /// Erstellt einen Konfigurationsfehler
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler den Relais-Dienst beendet
    pub fn ist_fatal(&self) -> bool {
        matches!(self, Self::Bind { .. } | Self::Konfiguration(_))
    }
}
