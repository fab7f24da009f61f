//! Seitenkanal – zuverlaessiger Nachrichtenweg des Hosts zu den Clients
//!
//! Das Relais sendet darueber Verbindungsangebote und Zustands-Broadcasts.
//! [`SeitenkanalVerteiler`] haelt pro Client eine mpsc-Send-Queue; der
//! Host liest sie aus und schreibt auf seine eigene Verbindung.
//!
//! ## Selektives Senden
//! - An einen Spieler: `an_spieler_senden`
//! - An alle verbundenen Spieler: `an_alle_senden`

use dashmap::DashMap;
use funkrelais_core::types::SpielerId;
use funkrelais_protocol::control::SeitenkanalNachricht;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 64;

/// Zuverlaessiger Kanal des Hosts zu den Clients
pub trait Seitenkanal: Send + Sync + 'static {
    /// Gibt `false` zurueck wenn der Spieler nicht erreichbar ist
    fn an_spieler_senden(&self, spieler: &SpielerId, nachricht: SeitenkanalNachricht) -> bool;

    /// Gibt die Anzahl der erreichten Spieler zurueck
    fn an_alle_senden(&self, nachricht: SeitenkanalNachricht) -> usize;
}

// ---------------------------------------------------------------------------
// SeitenkanalVerteiler
// ---------------------------------------------------------------------------

/// Send-Queues aller ueber den Seitenkanal verbundenen Spieler
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct SeitenkanalVerteiler {
    clients: Arc<DashMap<SpielerId, mpsc::Sender<SeitenkanalNachricht>>>,
}

impl SeitenkanalVerteiler {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert einen Client und gibt seine Empfangs-Queue zurueck
    pub fn client_registrieren(&self, spieler: SpielerId) -> mpsc::Receiver<SeitenkanalNachricht> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.clients.insert(spieler, tx);
        tracing::debug!(spieler = %spieler, "Client im Seitenkanal registriert");
        rx
    }

    pub fn client_entfernen(&self, spieler: &SpielerId) {
        self.clients.remove(spieler);
        tracing::debug!(spieler = %spieler, "Client aus Seitenkanal entfernt");
    }

    pub fn anzahl(&self) -> usize {
        self.clients.len()
    }

    fn einreihen(
        spieler: &SpielerId,
        tx: &mpsc::Sender<SeitenkanalNachricht>,
        nachricht: SeitenkanalNachricht,
    ) -> bool {
        match tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(spieler = %spieler, "Seitenkanal-Queue voll – Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(spieler = %spieler, "Seitenkanal-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

impl Seitenkanal for SeitenkanalVerteiler {
    fn an_spieler_senden(&self, spieler: &SpielerId, nachricht: SeitenkanalNachricht) -> bool {
        match self.clients.get(spieler) {
            Some(tx) => Self::einreihen(spieler, &tx, nachricht),
            None => {
                tracing::debug!(spieler = %spieler, "Senden an unbekannten Client");
                false
            }
        }
    }

    fn an_alle_senden(&self, nachricht: SeitenkanalNachricht) -> usize {
        let mut gesendet = 0;
        self.clients.iter().for_each(|entry| {
            if Self::einreihen(entry.key(), entry.value(), nachricht.clone()) {
                gesendet += 1;
            }
        });
        gesendet
    }
}
