//! Client-seitiger Spiegel der replizierten Spielerzustaende
//!
//! Wendet `SpielerZustand`- und `SpielerZustaende`-Nachrichten an. Fuer
//! unbekannte Spieler gilt: nicht deaktiviert, aber getrennt.

use funkrelais_core::types::{KanalName, SpielerId};
use funkrelais_protocol::control::{SeitenkanalNachricht, SpielerZustand};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ClientZustandsSpiegel {
    zustaende: HashMap<SpielerId, SpielerZustand>,
}

impl ClientZustandsSpiegel {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Wendet eine Server-Nachricht an; andere Nachrichtentypen werden ignoriert
    pub fn anwenden(&mut self, nachricht: &SeitenkanalNachricht) {
        match nachricht {
            SeitenkanalNachricht::SpielerZustand(zustand) => {
                self.zustaende.insert(zustand.spieler, zustand.clone());
            }
            SeitenkanalNachricht::SpielerZustaende { zustaende } => {
                for zustand in zustaende {
                    self.zustaende.insert(zustand.spieler, zustand.clone());
                }
                tracing::debug!(anzahl = zustaende.len(), "Zustandstabelle uebernommen");
            }
            SeitenkanalNachricht::Handshake { .. } | SeitenkanalNachricht::Geheimnis { .. } => {}
        }
    }

    pub fn ist_deaktiviert(&self, spieler: &SpielerId) -> bool {
        self.zustaende.get(spieler).is_some_and(|z| z.deaktiviert)
    }

    pub fn ist_getrennt(&self, spieler: &SpielerId) -> bool {
        self.zustaende.get(spieler).map_or(true, |z| z.getrennt)
    }

    pub fn ist_in_kanal(&self, spieler: &SpielerId) -> bool {
        self.zustaende.get(spieler).is_some_and(|z| z.hat_kanal())
    }

    pub fn kanal_von(&self, spieler: &SpielerId) -> Option<&KanalName> {
        self.zustaende.get(spieler).and_then(|z| z.kanal.as_ref())
    }

    pub fn zustand(&self, spieler: &SpielerId) -> Option<&SpielerZustand> {
        self.zustaende.get(spieler)
    }

    /// Bei Verbindungsabbruch zum Server
    pub fn leeren(&mut self) {
        self.zustaende.clear();
    }
}
