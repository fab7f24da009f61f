//! Verbindungsangebot – Geheimnis und UDP-Port per Seitenkanal
//!
//! Wird beim Login und nach einem Timeout (Reconnect) verschickt. Der
//! Client antwortet darauf mit einem `Authentifizieren`-Paket per UDP.

use crate::geheimnis::GeheimnisSpeicher;
use crate::seitenkanal::Seitenkanal;
use funkrelais_core::types::SpielerId;
use funkrelais_protocol::control::SeitenkanalNachricht;
use std::sync::Arc;

pub struct VerbindungsAnbieter<K: Seitenkanal> {
    geheimnisse: GeheimnisSpeicher,
    seitenkanal: Arc<K>,
    udp_port: u16,
}

impl<K: Seitenkanal> Clone for VerbindungsAnbieter<K> {
    fn clone(&self) -> Self {
        Self {
            geheimnisse: self.geheimnisse.clone(),
            seitenkanal: Arc::clone(&self.seitenkanal),
            udp_port: self.udp_port,
        }
    }
}

impl<K: Seitenkanal> VerbindungsAnbieter<K> {
    pub fn neu(geheimnisse: GeheimnisSpeicher, seitenkanal: Arc<K>, udp_port: u16) -> Self {
        Self {
            geheimnisse,
            seitenkanal,
            udp_port,
        }
    }

    /// Schickt dem Spieler sein (ggf. neu erzeugtes) Geheimnis
    pub fn anbieten(&self, spieler: SpielerId) -> bool {
        let geheimnis = self.geheimnisse.holen_oder_erzeugen(spieler);
        let zugestellt = self.seitenkanal.an_spieler_senden(
            &spieler,
            SeitenkanalNachricht::Geheimnis {
                spieler,
                geheimnis,
                udp_port: self.udp_port,
            },
        );
        if zugestellt {
            tracing::debug!(spieler = %spieler, port = self.udp_port, "Verbindungsangebot gesendet");
        } else {
            tracing::warn!(spieler = %spieler, "Verbindungsangebot nicht zustellbar");
        }
        zugestellt
    }
}
