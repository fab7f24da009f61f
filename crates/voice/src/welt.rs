//! Spielwelt-Schnittstelle des Hosts
//!
//! Das Relais kennt keine Entitaeten, nur Positionen, eine Quader-Abfrage
//! und den Online-Status. [`SpeicherWelt`] ist eine In-Memory-Umsetzung
//! fuer den Standalone-Betrieb und Tests.

use dashmap::DashMap;
use funkrelais_core::geometrie::{Position, Quader};
use funkrelais_core::types::SpielerId;
use std::sync::Arc;

/// Positions- und Naehe-Abfragen gegen die Spielwelt des Hosts
pub trait SpielWelt: Send + Sync + 'static {
    /// Aktuelle Position, `None` wenn der Spieler nicht in der Welt ist
    fn position(&self, spieler: &SpielerId) -> Option<Position>;

    /// Alle Spieler innerhalb des Quaders (darf eine Obermenge liefern)
    fn spieler_im_quader(&self, quader: &Quader) -> Vec<SpielerId>;

    /// Ist der Spieler im Spiel eingeloggt?
    fn ist_online(&self, spieler: &SpielerId) -> bool;
}

// ---------------------------------------------------------------------------
// SpeicherWelt
// ---------------------------------------------------------------------------

/// Spielwelt als Positionstabelle; online = Eintrag vorhanden
#[derive(Clone, Default)]
pub struct SpeicherWelt {
    positionen: Arc<DashMap<SpielerId, Position>>,
}

impl SpeicherWelt {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Setzt die Position (und damit den Online-Status) eines Spielers
    pub fn setzen(&self, spieler: SpielerId, position: Position) {
        self.positionen.insert(spieler, position);
    }

    pub fn entfernen(&self, spieler: &SpielerId) {
        self.positionen.remove(spieler);
    }
}

impl SpielWelt for SpeicherWelt {
    fn position(&self, spieler: &SpielerId) -> Option<Position> {
        self.positionen.get(spieler).map(|p| *p)
    }

    fn spieler_im_quader(&self, quader: &Quader) -> Vec<SpielerId> {
        self.positionen
            .iter()
            .filter(|e| quader.enthaelt(e.value()))
            .map(|e| *e.key())
            .collect()
    }

    fn ist_online(&self, spieler: &SpielerId) -> bool {
        self.positionen.contains_key(spieler)
    }
}
