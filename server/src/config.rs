//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass das Relais ohne Konfigurationsdatei
//! lauffaehig ist.

use funkrelais_core::error::FunkError;
use funkrelais_voice::VoiceServerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub netzwerk: NetzwerkEinstellungen,
    pub voice: VoiceEinstellungen,
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den UDP-Socket
    pub bind_adresse: String,
    /// Port fuer UDP (Voice-Daten)
    pub udp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            udp_port: 24454,
        }
    }
}

/// Relais-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceEinstellungen {
    /// Naehe-Radius (halbe Kantenlaenge des Quaders)
    pub distanz: f64,
    /// Intervall zwischen zwei KeepAlives in ms
    pub keepalive_ms: u64,
    /// Ohne Antwort laenger als das -> Sitzung entfernen
    pub timeout_ms: u64,
    /// Maximales Alter eines Pakets in der Warteschlange
    pub paket_ttl_ms: u64,
    pub warteschlange_kapazitaet: usize,
    /// Intervall der Latenz-Pings in ms
    pub ping_intervall_ms: u64,
}

impl Default for VoiceEinstellungen {
    fn default() -> Self {
        Self {
            distanz: 48.0,
            keepalive_ms: 1000,
            timeout_ms: 10_000,
            paket_ttl_ms: 500,
            warteschlange_kapazitaet: 4096,
            ping_intervall_ms: 5000,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config: Self = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok(config)
    }

    /// Prueft Werte, die serde nicht abfangen kann
    pub fn validieren(&self) -> Result<(), FunkError> {
        let v = &self.voice;
        if !(v.distanz.is_finite() && v.distanz > 0.0) {
            return Err(FunkError::konfiguration(format!(
                "voice.distanz muss positiv sein, ist {}",
                v.distanz
            )));
        }
        for (name, wert) in [
            ("voice.keepalive_ms", v.keepalive_ms),
            ("voice.timeout_ms", v.timeout_ms),
            ("voice.paket_ttl_ms", v.paket_ttl_ms),
            ("voice.ping_intervall_ms", v.ping_intervall_ms),
        ] {
            if wert == 0 {
                return Err(FunkError::konfiguration(format!("{name} darf nicht 0 sein")));
            }
        }
        if v.warteschlange_kapazitaet == 0 {
            return Err(FunkError::konfiguration(
                "voice.warteschlange_kapazitaet darf nicht 0 sein",
            ));
        }
        if v.timeout_ms <= v.keepalive_ms {
            return Err(FunkError::konfiguration(format!(
                "voice.timeout_ms ({}) muss groesser als voice.keepalive_ms ({}) sein",
                v.timeout_ms, v.keepalive_ms
            )));
        }
        if !crate::logging::log_level_gueltig(&self.logging.level) {
            return Err(FunkError::konfiguration(format!(
                "logging.level ungueltig: {:?}",
                self.logging.level
            )));
        }
        if !crate::logging::log_format_gueltig(&self.logging.format) {
            return Err(FunkError::konfiguration(format!(
                "logging.format ungueltig: {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse fuer UDP zurueck
    pub fn udp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.udp_port)
    }

    /// Uebersetzt die Datei-Konfiguration in die des Voice-Kerns
    pub fn voice_config(&self) -> Result<VoiceServerConfig, FunkError> {
        let adresse = self.udp_bind_adresse();
        let bind_addr: SocketAddr = adresse
            .parse()
            .map_err(|e| FunkError::konfiguration(format!("Bind-Adresse '{adresse}': {e}")))?;

        let v = &self.voice;
        Ok(VoiceServerConfig {
            distanz: v.distanz,
            keepalive_intervall: Duration::from_millis(v.keepalive_ms),
            antwort_timeout: Duration::from_millis(v.timeout_ms),
            paket_ttl: Duration::from_millis(v.paket_ttl_ms),
            warteschlange_kapazitaet: v.warteschlange_kapazitaet,
            ping_intervall: Duration::from_millis(v.ping_intervall_ms),
            ..VoiceServerConfig::neu(bind_addr)
        })
    }
}
