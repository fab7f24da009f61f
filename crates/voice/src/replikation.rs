//! Zustands-Replikation ueber den Seitenkanal
//!
//! - Zustand vom Client: Identitaet durch den verifizierten Absender
//!   ersetzen, speichern, an alle senden
//! - Login: vollstaendige Tabelle an den neuen Spieler, danach einen
//!   "online"-Zustand fuer ihn an alle
//! - Logout: Eintrag entfernen, "offline"-Zustand (deaktiviert + getrennt)
//!   an alle

use crate::seitenkanal::Seitenkanal;
use crate::zustand::SpielerZustandsRegister;
use funkrelais_core::types::SpielerId;
use funkrelais_protocol::control::{SeitenkanalNachricht, SpielerZustand};
use std::sync::Arc;

/// Repliziert Spielerzustaende an alle verbundenen Clients
pub struct ZustandsReplikation<K: Seitenkanal> {
    zustaende: SpielerZustandsRegister,
    seitenkanal: Arc<K>,
}

impl<K: Seitenkanal> Clone for ZustandsReplikation<K> {
    fn clone(&self) -> Self {
        Self {
            zustaende: self.zustaende.clone(),
            seitenkanal: Arc::clone(&self.seitenkanal),
        }
    }
}

impl<K: Seitenkanal> ZustandsReplikation<K> {
    pub fn neu(zustaende: SpielerZustandsRegister, seitenkanal: Arc<K>) -> Self {
        Self {
            zustaende,
            seitenkanal,
        }
    }

    /// Verarbeitet einen Zustand, den `absender` ueber den Seitenkanal geschickt hat
    ///
    /// Die Identitaet im Payload wird ignoriert. Der Anzeigename stammt aus
    /// dem beim Login gespeicherten Profil, falls vorhanden.
    pub fn zustand_empfangen(&self, absender: SpielerId, mut zustand: SpielerZustand) {
        if zustand.spieler != absender {
            tracing::debug!(
                absender = %absender,
                behauptet = %zustand.spieler,
                "Selbst gemeldete Identitaet im Zustand ueberschrieben"
            );
        }
        zustand.spieler = absender;
        if let Some(bekannt) = self.zustaende.abrufen(&absender) {
            zustand.name = bekannt.name;
        }

        tracing::debug!(
            spieler = %absender,
            deaktiviert = zustand.deaktiviert,
            getrennt = zustand.getrennt,
            kanal = ?zustand.kanal.as_ref().map(|k| k.as_str()),
            "Spielerzustand aktualisiert"
        );

        self.zustaende.setzen(zustand.clone());
        self.broadcast(zustand);
    }

    /// Login: Tabelle an den neuen Spieler, dann "online" an alle
    pub fn spieler_eingeloggt(&self, spieler: SpielerId, name: &str) {
        let tabelle = SeitenkanalNachricht::SpielerZustaende {
            zustaende: self.zustaende.alle(),
        };
        if !self.seitenkanal.an_spieler_senden(&spieler, tabelle) {
            tracing::warn!(spieler = %spieler, "Zustandstabelle konnte nicht zugestellt werden");
        }

        let online = SpielerZustand::online(spieler, name);
        self.zustaende.setzen(online.clone());
        self.broadcast(online);
    }

    /// Logout: Eintrag entfernen, "offline" an alle
    pub fn spieler_ausgeloggt(&self, spieler: SpielerId) {
        let name = self
            .zustaende
            .entfernen(&spieler)
            .map(|z| z.name)
            .unwrap_or_default();
        self.broadcast(SpielerZustand::offline(spieler, name));
    }

    pub fn zustaende(&self) -> &SpielerZustandsRegister {
        &self.zustaende
    }

    fn broadcast(&self, zustand: SpielerZustand) {
        let spieler = zustand.spieler;
        let erreicht = self
            .seitenkanal
            .an_alle_senden(SeitenkanalNachricht::SpielerZustand(zustand));
        tracing::trace!(spieler = %spieler, empfaenger = erreicht, "Zustand verteilt");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
