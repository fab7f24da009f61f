//! Geheimnis-Speicher – Sitzungsgeheimnisse pro Spieler
//!
//! Ein Geheimnis wird beim ersten Verbindungsangebot erzeugt, ueber alle
//! Voice-Reconnects eines Logins wiederverwendet und beim Logout oder
//! Timeout vergessen. Beschrieben wird der Speicher vom Host (Login) und
//! vom Verarbeiter (Timeout), daher DashMap.

use dashmap::DashMap;
use funkrelais_core::types::{Geheimnis, SpielerId};
use std::sync::Arc;

/// Thread-safe Zuordnung Spieler -> Geheimnis
///
/// `Clone` teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct GeheimnisSpeicher {
    inner: Arc<DashMap<SpielerId, Geheimnis>>,
}

impl GeheimnisSpeicher {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Gibt das vorhandene Geheimnis zurueck oder erzeugt atomar ein neues
    pub fn holen_oder_erzeugen(&self, spieler: SpielerId) -> Geheimnis {
        *self
            .inner
            .entry(spieler)
            .or_insert_with(Geheimnis::zufaellig)
    }

    /// Vergisst das Geheimnis; das alte Geheimnis authentifiziert danach nicht mehr
    pub fn vergessen(&self, spieler: &SpielerId) -> Option<Geheimnis> {
        self.inner.remove(spieler).map(|(_, geheimnis)| geheimnis)
    }

    /// Vergisst das Geheimnis nur, wenn es noch `erwartet` ist
    ///
    /// Ein inzwischen neu ausgestelltes Geheimnis (neuer Login) bleibt stehen.
    pub fn vergessen_falls(&self, spieler: &SpielerId, erwartet: &Geheimnis) -> bool {
        self.inner
            .remove_if(spieler, |_, gespeichert| gespeichert == erwartet)
            .is_some()
    }

    /// Vergleicht ein behauptetes Geheimnis mit dem gespeicherten
    pub fn pruefen(&self, spieler: &SpielerId, geheimnis: &Geheimnis) -> bool {
        self.inner
            .get(spieler)
            .map(|gespeichert| *gespeichert == *geheimnis)
            .unwrap_or(false)
    }

    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geheimnis_wird_wiederverwendet() {
        let speicher = GeheimnisSpeicher::neu();
        let spieler = SpielerId::new();

        let a = speicher.holen_oder_erzeugen(spieler);
        let b = speicher.holen_oder_erzeugen(spieler);
        assert_eq!(a, b, "Innerhalb eines Logins bleibt das Geheimnis gleich");
        assert_eq!(speicher.anzahl(), 1);
    }

    #[test]
    fn geheimnisse_pro_spieler_verschieden() {
        let speicher = GeheimnisSpeicher::neu();
        let a = speicher.holen_oder_erzeugen(SpielerId::new());
        let b = speicher.holen_oder_erzeugen(SpielerId::new());
        assert_ne!(a, b);
    }

    #[test]
    fn vergessen_entwertet_altes_geheimnis() {
        let speicher = GeheimnisSpeicher::neu();
        let spieler = SpielerId::new();
        let alt = speicher.holen_oder_erzeugen(spieler);

        assert!(speicher.pruefen(&spieler, &alt));
        assert_eq!(speicher.vergessen(&spieler), Some(alt));
        assert!(!speicher.pruefen(&spieler, &alt));
        assert_eq!(speicher.vergessen(&spieler), None);

        let neu = speicher.holen_oder_erzeugen(spieler);
        assert_ne!(alt, neu, "Nach dem Vergessen gibt es ein frisches Geheimnis");
        assert!(!speicher.pruefen(&spieler, &alt));
    }

    #[test]
    fn vergessen_falls_laesst_neues_geheimnis_stehen() {
        let speicher = GeheimnisSpeicher::neu();
        let spieler = SpielerId::new();
        let alt = speicher.holen_oder_erzeugen(spieler);
        speicher.vergessen(&spieler);
        let neu = speicher.holen_oder_erzeugen(spieler);

        assert!(!speicher.vergessen_falls(&spieler, &alt));
        assert!(speicher.pruefen(&spieler, &neu));

        assert!(speicher.vergessen_falls(&spieler, &neu));
        assert_eq!(speicher.anzahl(), 0);
    }

    #[test]
    fn pruefen_ohne_eintrag() {
        let speicher = GeheimnisSpeicher::neu();
        assert!(!speicher.pruefen(&SpielerId::new(), &Geheimnis::zufaellig()));
    }

    #[test]
    fn gleichzeitiges_erzeugen_liefert_ein_geheimnis() {
        let speicher = GeheimnisSpeicher::neu();
        let spieler = SpielerId::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = speicher.clone();
                std::thread::spawn(move || s.holen_oder_erzeugen(spieler))
            })
            .collect();
        let ergebnisse: Vec<Geheimnis> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ergebnisse.windows(2).all(|w| w[0] == w[1]));
    }
}
