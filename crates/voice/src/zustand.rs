//! Spielerzustands-Register – replizierte Tabelle aller Spielerzustaende
//!
//! Wird von Seitenkanal-Handlern des Hosts beschrieben und vom Router im
//! Verarbeiter gelesen. Thread-safe durch DashMap.

use dashmap::DashMap;
use funkrelais_core::types::{KanalName, SpielerId};
use funkrelais_protocol::control::SpielerZustand;
use std::sync::Arc;

/// Zentrale Zustandstabelle, indexiert nach SpielerId
///
/// `Clone` teilt den inneren Zustand (Arc).
#[derive(Clone, Default)]
pub struct SpielerZustandsRegister {
    inner: Arc<DashMap<SpielerId, SpielerZustand>>,
}

impl SpielerZustandsRegister {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Speichert einen Zustand unter `zustand.spieler`
    pub fn setzen(&self, zustand: SpielerZustand) {
        self.inner.insert(zustand.spieler, zustand);
    }

    pub fn entfernen(&self, spieler: &SpielerId) -> Option<SpielerZustand> {
        self.inner.remove(spieler).map(|(_, zustand)| zustand)
    }

    /// Kopie des Zustands (kein Lock bleibt gehalten)
    pub fn abrufen(&self, spieler: &SpielerId) -> Option<SpielerZustand> {
        self.inner.get(spieler).map(|z| z.clone())
    }

    /// Kanal eines Spielers, `None` im Naehe-Modus oder ohne Zustand
    pub fn kanal_von(&self, spieler: &SpielerId) -> Option<KanalName> {
        self.inner.get(spieler).and_then(|z| z.kanal.clone())
    }

    /// Alle Spieler mit exakt diesem Kanalnamen
    ///
    /// Iteriert ueber die ganze Tabelle.
    pub fn kanal_mitglieder(&self, kanal: &KanalName) -> Vec<SpielerId> {
        self.inner
            .iter()
            .filter(|e| e.kanal.as_ref() == Some(kanal))
            .map(|e| *e.key())
            .collect()
    }

    /// Schnappschuss aller Zustaende
    pub fn alle(&self) -> Vec<SpielerZustand> {
        self.inner.iter().map(|e| e.value().clone()).collect()
    }

    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn zustand_in_kanal(name: &str) -> SpielerZustand {
        let mut z = SpielerZustand::online(SpielerId::new(), "test");
        z.kanal = Some(KanalName::neu(name).unwrap());
        z
    }

    #[test]
    fn setzen_und_abrufen() {
        let register = SpielerZustandsRegister::neu();
        let z = SpielerZustand::online(SpielerId::new(), "Alex");
        register.setzen(z.clone());

        assert_eq!(register.abrufen(&z.spieler), Some(z.clone()));
        assert_eq!(register.kanal_von(&z.spieler), None);
        assert_eq!(register.anzahl(), 1);
    }

    #[test]
    fn kanal_mitglieder_exakter_vergleich() {
        let register = SpielerZustandsRegister::neu();
        let a = zustand_in_kanal("squad1");
        let b = zustand_in_kanal("squad1");
        let c = zustand_in_kanal("Squad1");
        let d = zustand_in_kanal("squad1_");
        let e = SpielerZustand::online(SpielerId::new(), "ohne");
        for z in [&a, &b, &c, &d, &e] {
            register.setzen(z.clone());
        }

        let mut mitglieder = register.kanal_mitglieder(&KanalName::neu("squad1").unwrap());
        mitglieder.sort();
        let mut erwartet = vec![a.spieler, b.spieler];
        erwartet.sort();
        assert_eq!(mitglieder, erwartet);
    }

    #[test]
    fn entfernen() {
        let register = SpielerZustandsRegister::neu();
        let z = SpielerZustand::online(SpielerId::new(), "Alex");
        register.setzen(z.clone());

        assert_eq!(register.entfernen(&z.spieler), Some(z.clone()));
        assert!(register.abrufen(&z.spieler).is_none());
        assert!(register.entfernen(&z.spieler).is_none());
    }

    #[test]
    fn clone_teilt_inneren_state() {
        let r1 = SpielerZustandsRegister::neu();
        let r2 = r1.clone();
        let z = SpielerZustand::online(SpielerId::new(), "Alex");
        r1.setzen(z.clone());
        assert!(r2.abrufen(&z.spieler).is_some());
    }

    #[test]
    fn gleichzeitiges_schreiben_und_lesen() {
        let register = SpielerZustandsRegister::neu();
        let kanal = KanalName::neu("squad1").unwrap();

        let schreiber: Vec<_> = (0..4)
            .map(|_| {
                let r = register.clone();
                let k = kanal.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut z = SpielerZustand::online(SpielerId::new(), "x");
                        z.kanal = Some(k.clone());
                        r.setzen(z);
                    }
                })
            })
            .collect();
        let leser = {
            let r = register.clone();
            let k = kanal.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let _ = r.kanal_mitglieder(&k);
                }
            })
        };

        for h in schreiber {
            h.join().unwrap();
        }
        leser.join().unwrap();
        assert_eq!(register.kanal_mitglieder(&kanal).len(), 400);
    }
}
