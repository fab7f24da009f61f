//! Host-Bruecke – Callbacks des Spiel-Hosts in das Relais
//!
//! Der Host ruft diese Methoden aus seinem eigenen Thread auf (Login,
//! Logout, Seitenkanal-Nachrichten). Alles, was Sitzungen betrifft, geht
//! als [`Befehl`] an den Verarbeiter; Sitzungen haben genau einen Besitzer.

use crate::angebot::VerbindungsAnbieter;
use crate::geheimnis::GeheimnisSpeicher;
use crate::replikation::ZustandsReplikation;
use crate::seitenkanal::Seitenkanal;
use crate::verarbeitung::Befehl;
use dashmap::DashMap;
use funkrelais_core::error::{FunkError, Result};
use funkrelais_core::types::SpielerId;
use funkrelais_protocol::control::{kompatibilitaet_pruefen, SeitenkanalNachricht, SpielerZustand};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct HostBruecke<K: Seitenkanal> {
    /// Spieler mit erfolgreichem Kompatibilitaets-Handshake -> Version
    kompatibel: Arc<DashMap<SpielerId, u32>>,
    geheimnisse: GeheimnisSpeicher,
    replikation: ZustandsReplikation<K>,
    anbieter: VerbindungsAnbieter<K>,
    befehle: mpsc::UnboundedSender<Befehl>,
}

impl<K: Seitenkanal> Clone for HostBruecke<K> {
    fn clone(&self) -> Self {
        Self {
            kompatibel: Arc::clone(&self.kompatibel),
            geheimnisse: self.geheimnisse.clone(),
            replikation: self.replikation.clone(),
            anbieter: self.anbieter.clone(),
            befehle: self.befehle.clone(),
        }
    }
}

impl<K: Seitenkanal> HostBruecke<K> {
    pub fn neu(
        geheimnisse: GeheimnisSpeicher,
        replikation: ZustandsReplikation<K>,
        anbieter: VerbindungsAnbieter<K>,
        befehle: mpsc::UnboundedSender<Befehl>,
    ) -> Self {
        Self {
            kompatibel: Arc::new(DashMap::new()),
            geheimnisse,
            replikation,
            anbieter,
            befehle,
        }
    }

    /// Kompatibilitaets-Handshake eines Clients
    ///
    /// Bei `Err` muss der Host den Client trennen. Ist der Spieler schon
    /// eingeloggt, bekommt er direkt ein Verbindungsangebot.
    pub fn handshake_empfangen(&self, spieler: SpielerId, version: u32) -> Result<()> {
        if let Err(e) = kompatibilitaet_pruefen(version) {
            tracing::warn!(spieler = %spieler, fehler = %e, "Inkompatibler Client");
            return Err(e);
        }

        let neu = self.kompatibel.insert(spieler, version).is_none();
        tracing::debug!(spieler = %spieler, version, "Kompatibilitaets-Handshake erfolgreich");
        if neu && self.replikation.zustaende().abrufen(&spieler).is_some() {
            self.anbieter.anbieten(spieler);
        }
        Ok(())
    }

    pub fn ist_kompatibel(&self, spieler: &SpielerId) -> bool {
        self.kompatibel.contains_key(spieler)
    }

    /// Login im Spiel
    ///
    /// Clients ohne Handshake (kein Voice) bekommen nur die Zustaende.
    pub fn spieler_eingeloggt(&self, spieler: SpielerId, name: &str) {
        tracing::info!(spieler = %spieler, name, "Spieler eingeloggt");
        self.replikation.spieler_eingeloggt(spieler, name);
        if self.ist_kompatibel(&spieler) {
            self.anbieter.anbieten(spieler);
        }
    }

    /// Logout im Spiel: Geheimnis, Sitzung und Zustand verschwinden
    pub fn spieler_ausgeloggt(&self, spieler: SpielerId) {
        tracing::info!(spieler = %spieler, "Spieler ausgeloggt");
        self.kompatibel.remove(&spieler);
        // Ohne Geheimnis kann keine Sitzung dieses Logins bestehen
        if let Some(geheimnis) = self.geheimnisse.vergessen(&spieler) {
            if self.befehle.send(Befehl::Trennen { spieler, geheimnis }).is_err() {
                tracing::debug!(spieler = %spieler, "Verarbeiter beendet – Trennen entfaellt");
            }
        }
        self.replikation.spieler_ausgeloggt(spieler);
    }

    pub fn zustand_empfangen(&self, absender: SpielerId, zustand: SpielerZustand) {
        self.replikation.zustand_empfangen(absender, zustand);
    }

    /// Verteilt eine vom Client empfangene Seitenkanal-Nachricht
    pub fn nachricht_empfangen(
        &self,
        absender: SpielerId,
        nachricht: SeitenkanalNachricht,
    ) -> Result<()> {
        match nachricht {
            SeitenkanalNachricht::Handshake {
                kompatibilitaets_version,
            } => self.handshake_empfangen(absender, kompatibilitaets_version),
            SeitenkanalNachricht::SpielerZustand(zustand) => {
                self.zustand_empfangen(absender, zustand);
                Ok(())
            }
            SeitenkanalNachricht::Geheimnis { .. } | SeitenkanalNachricht::SpielerZustaende { .. } => {
                Err(FunkError::UngueltigesPaket(
                    "Nachricht ist nur Server -> Client erlaubt".into(),
                ))
            }
        }
    }
}
