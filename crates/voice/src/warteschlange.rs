//! Eingangs-Warteschlange zwischen Empfangs- und Verarbeiter-Task
//!
//! Jedes Datagramm wird mit Empfangszeitpunkt und TTL in einen
//! [`Umschlag`] verpackt. Der Verarbeiter verwirft Umschlaege, die beim
//! Entnehmen aelter als ihre TTL sind. Die Kapazitaet ist begrenzt: bei
//! voller Queue verwirft der Empfaenger das neue Datagramm.

use crate::abkuehlung::Abkuehlung;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Ein empfangenes, noch nicht dekodiertes Datagramm
#[derive(Debug, Clone)]
pub struct Umschlag {
    pub daten: Vec<u8>,
    pub absender: SocketAddr,
    pub empfangen: Instant,
    pub ttl: Duration,
}

impl Umschlag {
    pub fn neu(daten: Vec<u8>, absender: SocketAddr, empfangen: Instant, ttl: Duration) -> Self {
        Self {
            daten,
            absender,
            empfangen,
            ttl,
        }
    }

    pub fn alter(&self, jetzt: Instant) -> Duration {
        jetzt.saturating_duration_since(self.empfangen)
    }

    pub fn ist_abgelaufen(&self, jetzt: Instant) -> bool {
        self.alter(jetzt) > self.ttl
    }
}

/// Erzeugt eine begrenzte Warteschlange
pub fn warteschlange(kapazitaet: usize, ttl: Duration) -> (Einreiher, Entnehmer) {
    let (tx, rx) = mpsc::channel(kapazitaet.max(1));
    (
        Einreiher {
            tx,
            ttl,
            abkuehlung: Abkuehlung::default(),
        },
        Entnehmer { rx },
    )
}

// ---------------------------------------------------------------------------
// Einreiher (Empfangs-Task)
// ---------------------------------------------------------------------------

pub struct Einreiher {
    tx: mpsc::Sender<Umschlag>,
    ttl: Duration,
    abkuehlung: Abkuehlung,
}

impl Einreiher {
    /// Reiht ein Datagramm ein, blockiert nie
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn einreihen(&mut self, daten: Vec<u8>, absender: SocketAddr, jetzt: Instant) -> bool {
        match self.tx.try_send(Umschlag::neu(daten, absender, jetzt, self.ttl)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                if let Some(unterdrueckt) = self.abkuehlung.darf_melden("warteschlange_voll", jetzt) {
                    tracing::warn!(
                        kapazitaet = self.tx.max_capacity(),
                        unterdrueckt,
                        "Eingangs-Warteschlange voll – Datagramm verworfen"
                    );
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Eingangs-Warteschlange geschlossen");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entnehmer (Verarbeiter-Task)
// ---------------------------------------------------------------------------

pub struct Entnehmer {
    rx: mpsc::Receiver<Umschlag>,
}

impl Entnehmer {
    /// Wartet auf den naechsten Umschlag, `None` wenn alle Einreiher weg sind
    pub async fn naechster(&mut self) -> Option<Umschlag> {
        self.rx.recv().await
    }

    pub fn laenge(&self) -> usize {
        self.rx.len()
    }
}
