//! KeepAlive-Ueberwachung
//!
//! Pro Takt des Verarbeiters:
//! 1. Sitzung ohne Antwort laenger als `timeout` -> zum Entfernen markieren
//! 2. sonst: letzter KeepAlive aelter als `intervall` -> neuen senden
//!
//! Das Entfernen und der Reconnect-Versuch passieren im Verarbeiter, damit
//! das Register waehrend der Iteration nicht veraendert wird.

use crate::verbindung::VerbindungsRegister;
use funkrelais_core::types::SpielerId;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Ergebnis eines Durchlaufs
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Durchlauf {
    /// Adressen, an die jetzt ein KeepAlive geht
    pub keepalive_an: Vec<SocketAddr>,
    /// Sitzungen, deren Antwort-Timeout ueberschritten ist
    pub abgelaufen: Vec<SpielerId>,
}

#[derive(Debug, Clone, Copy)]
pub struct KeepAliveUeberwachung {
    intervall: Duration,
    timeout: Duration,
}

impl KeepAliveUeberwachung {
    pub fn neu(intervall: Duration, timeout: Duration) -> Self {
        Self { intervall, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn durchlauf(&self, register: &mut VerbindungsRegister, jetzt: Instant) -> Durchlauf {
        let mut ergebnis = Durchlauf::default();

        for verbindung in register.iter_mut() {
            if jetzt.saturating_duration_since(verbindung.letzte_antwort) > self.timeout {
                ergebnis.abgelaufen.push(verbindung.spieler);
            } else if jetzt.saturating_duration_since(verbindung.letzter_keepalive) >= self.intervall
            {
                verbindung.letzter_keepalive = jetzt;
                ergebnis.keepalive_an.push(verbindung.adresse);
            }
        }

        ergebnis
    }
}
