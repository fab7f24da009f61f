//! Router – Weiterleitung von Mikrofon-Paketen an Empfaenger
//!
//! Zwei Modi, abhaengig vom Zustand des Absenders:
//! - Kanal-Modus: Absender hat einen Kanalnamen, Empfaenger sind alle
//!   Spieler mit exakt gleichem Namen (Distanz egal)
//! - Naehe-Modus: alle Spieler im Quader um die Position des Absenders
//!
//! In beiden Modi gilt: nie der Absender selbst, nie ein Spieler ohne
//! aktive Sitzung. Das `Ton`-Paket wird einmal kodiert und an alle
//! Empfaenger gesendet. Ein fehlgeschlagener Versand bricht die
//! Verteilung an die uebrigen nicht ab.

use crate::verbindung::VerbindungsRegister;
use crate::welt::SpielWelt;
use crate::zustand::SpielerZustandsRegister;
use funkrelais_core::geometrie::Quader;
use funkrelais_core::types::{KanalName, SpielerId};
use funkrelais_protocol::voice::NetzPaket;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// DatagrammAusgang
// ---------------------------------------------------------------------------

/// Nicht-blockierender Datagramm-Versand
///
/// Schlaegt fehl statt zu warten, wenn der Socket-Puffer voll ist.
pub trait DatagrammAusgang: Send + Sync + 'static {
    fn senden(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<()>;
}

impl DatagrammAusgang for tokio::net::UdpSocket {
    fn senden(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<()> {
        self.try_send_to(daten, ziel).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router<W: SpielWelt> {
    welt: Arc<W>,
    zustaende: SpielerZustandsRegister,
    distanz: f64,
}

impl<W: SpielWelt> Router<W> {
    pub fn neu(welt: Arc<W>, zustaende: SpielerZustandsRegister, distanz: f64) -> Self {
        Self {
            welt,
            zustaende,
            distanz,
        }
    }

    /// Empfaenger im Naehe-Modus (Quader mit halber Kantenlaenge `distanz`)
    pub fn naehe_empfaenger(
        &self,
        absender: &SpielerId,
        register: &VerbindungsRegister,
    ) -> Vec<(SpielerId, SocketAddr)> {
        let Some(position) = self.welt.position(absender) else {
            tracing::debug!(spieler = %absender, "Absender ohne Position – nichts weitergeleitet");
            return Vec::new();
        };
        let quader = Quader::um(position, self.distanz);

        self.welt
            .spieler_im_quader(&quader)
            .into_iter()
            .filter(|s| s != absender)
            // Die Welt darf eine Obermenge liefern, daher erneut pruefen
            .filter(|s| {
                self.welt
                    .position(s)
                    .is_some_and(|p| quader.enthaelt(&p))
            })
            .filter_map(|s| register.adresse_von(&s).map(|a| (s, a)))
            .collect()
    }

    /// Empfaenger im Kanal-Modus
    pub fn kanal_empfaenger(
        &self,
        absender: &SpielerId,
        kanal: &KanalName,
        register: &VerbindungsRegister,
    ) -> Vec<(SpielerId, SocketAddr)> {
        self.zustaende
            .kanal_mitglieder(kanal)
            .into_iter()
            .filter(|s| s != absender)
            .filter_map(|s| register.adresse_von(&s).map(|a| (s, a)))
            .collect()
    }

    /// Waehlt den Modus anhand des Absender-Zustands
    pub fn empfaenger(
        &self,
        absender: &SpielerId,
        register: &VerbindungsRegister,
    ) -> Vec<(SpielerId, SocketAddr)> {
        match self.zustaende.kanal_von(absender) {
            Some(kanal) => self.kanal_empfaenger(absender, &kanal, register),
            None => self.naehe_empfaenger(absender, register),
        }
    }

    /// Leitet ein Mikrofon-Paket weiter, gibt die Anzahl erfolgreicher Sends zurueck
    pub fn weiterleiten<A: DatagrammAusgang + ?Sized>(
        &self,
        absender: SpielerId,
        sequenz: u64,
        nutzdaten: Vec<u8>,
        register: &VerbindungsRegister,
        ausgang: &A,
    ) -> usize {
        if !self.welt.ist_online(&absender) {
            tracing::debug!(spieler = %absender, "Absender nicht im Spiel – Audio verworfen");
            return 0;
        }

        let empfaenger = self.empfaenger(&absender, register);
        if empfaenger.is_empty() {
            return 0;
        }

        let bytes = NetzPaket::Ton {
            herkunft: absender,
            sequenz,
            nutzdaten,
        }
        .encode();

        let mut gesendet = 0usize;
        for (spieler, adresse) in &empfaenger {
            match ausgang.senden(&bytes, *adresse) {
                Ok(()) => gesendet += 1,
                Err(e) => {
                    tracing::warn!(
                        empfaenger = %spieler,
                        adresse = %adresse,
                        fehler = %e,
                        "Senden an Empfaenger fehlgeschlagen"
                    );
                }
            }
        }

        tracing::trace!(
            absender = %absender,
            sequenz,
            empfaenger = empfaenger.len(),
            gesendet,
            "Audio weitergeleitet"
        );
        gesendet
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geheimnis::GeheimnisSpeicher;
    use crate::testhilfe::Aufzeichner;
    use crate::welt::SpeicherWelt;
    use funkrelais_core::geometrie::Position;
    use funkrelais_protocol::control::SpielerZustand;
    use std::time::Instant;

    struct Aufbau {
        welt: SpeicherWelt,
        zustaende: SpielerZustandsRegister,
        geheimnisse: GeheimnisSpeicher,
        register: VerbindungsRegister,
        router: Router<SpeicherWelt>,
        naechster_port: u16,
    }

    impl Aufbau {
        fn neu(distanz: f64) -> Self {
            let welt = SpeicherWelt::neu();
            let zustaende = SpielerZustandsRegister::neu();
            let router = Router::neu(Arc::new(welt.clone()), zustaende.clone(), distanz);
            Self {
                welt,
                zustaende,
                geheimnisse: GeheimnisSpeicher::neu(),
                register: VerbindungsRegister::neu(),
                router,
                naechster_port: 40000,
            }
        }

        /// Spieler in der Welt, mit aktiver Sitzung
        fn verbunden(&mut self, position: Position) -> (SpielerId, SocketAddr) {
            let spieler = self.nur_in_welt(position);
            let geheimnis = self.geheimnisse.holen_oder_erzeugen(spieler);
            self.naechster_port += 1;
            let adresse: SocketAddr = format!("127.0.0.1:{}", self.naechster_port).parse().unwrap();
            self.register
                .authentifizieren(&self.geheimnisse, spieler, &geheimnis, adresse, Instant::now())
                .unwrap();
            (spieler, adresse)
        }

        /// Spieler in der Welt, ohne Sitzung
        fn nur_in_welt(&mut self, position: Position) -> SpielerId {
            let spieler = SpielerId::new();
            self.welt.setzen(spieler, position);
            spieler
        }

        fn kanal_setzen(&self, spieler: SpielerId, kanal: &str) {
            let mut z = SpielerZustand::online(spieler, "test");
            z.kanal = Some(KanalName::neu(kanal).unwrap());
            self.zustaende.setzen(z);
        }
    }

    #[test]
    fn naehe_beispiel_radius_zehn() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::neu(0.0, 0.0, 0.0));
        let (_nah, nah_adresse) = a.verbunden(Position::neu(5.0, 0.0, 0.0));
        let (_fern, _) = a.verbunden(Position::neu(50.0, 0.0, 0.0));

        let ausgang = Aufzeichner::default();
        let gesendet = a.router.weiterleiten(sender, 7, vec![9, 9], &a.register, &ausgang);

        assert_eq!(gesendet, 1);
        let gesendet = ausgang.gesendet();
        assert_eq!(gesendet.len(), 1);
        assert_eq!(gesendet[0].1, nah_adresse);
        assert_eq!(
            NetzPaket::decode(&gesendet[0].0).unwrap(),
            NetzPaket::Ton {
                herkunft: sender,
                sequenz: 7,
                nutzdaten: vec![9, 9]
            }
        );
    }

    #[test]
    fn absender_nie_in_eigener_verteilung() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::default());
        assert!(a.router.naehe_empfaenger(&sender, &a.register).is_empty());

        a.kanal_setzen(sender, "squad1");
        assert!(a
            .router
            .kanal_empfaenger(&sender, &KanalName::neu("squad1").unwrap(), &a.register)
            .is_empty());
    }

    #[test]
    fn spieler_ohne_sitzung_wird_uebersprungen() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::default());
        let ohne = a.nur_in_welt(Position::neu(1.0, 0.0, 0.0));
        let (mit, _) = a.verbunden(Position::neu(2.0, 0.0, 0.0));

        let empfaenger: Vec<SpielerId> = a
            .router
            .naehe_empfaenger(&sender, &a.register)
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(empfaenger, vec![mit]);
        assert!(!empfaenger.contains(&ohne));
    }

    #[test]
    fn quader_grenze_inklusive_und_ecken() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::default());
        // Ecke des Quaders: ausserhalb einer Kugel, aber im Quader
        let (ecke, _) = a.verbunden(Position::neu(10.0, 10.0, -10.0));
        let (_knapp_draussen, _) = a.verbunden(Position::neu(10.001, 0.0, 0.0));

        let empfaenger: Vec<SpielerId> = a
            .router
            .naehe_empfaenger(&sender, &a.register)
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(empfaenger, vec![ecke]);
    }

    #[test]
    fn kanal_beispiel_unabhaengig_von_distanz() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::default());
        let (c, c_adresse) = a.verbunden(Position::neu(5000.0, 0.0, 0.0));
        let (d, _) = a.verbunden(Position::neu(1.0, 0.0, 0.0));
        a.kanal_setzen(sender, "squad1");
        a.kanal_setzen(c, "squad1");
        a.kanal_setzen(d, "squad2");

        let ausgang = Aufzeichner::default();
        assert_eq!(a.router.weiterleiten(sender, 1, vec![1], &a.register, &ausgang), 1);
        assert_eq!(ausgang.ziele(), vec![c_adresse]);
    }

    #[test]
    fn kanal_vergleich_exakt() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::default());
        let (gross, _) = a.verbunden(Position::default());
        let (laenger, _) = a.verbunden(Position::default());
        a.kanal_setzen(sender, "squad1");
        a.kanal_setzen(gross, "Squad1");
        a.kanal_setzen(laenger, "squad1x");

        assert!(a.router.empfaenger(&sender, &a.register).is_empty());
    }

    #[test]
    fn absender_offline_wird_nicht_geroutet() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::default());
        a.verbunden(Position::neu(1.0, 0.0, 0.0));
        a.welt.entfernen(&sender);

        let ausgang = Aufzeichner::default();
        assert_eq!(a.router.weiterleiten(sender, 1, vec![1], &a.register, &ausgang), 0);
        assert!(ausgang.gesendet().is_empty());
    }

    #[test]
    fn fehlgeschlagener_versand_bricht_verteilung_nicht_ab() {
        let mut a = Aufbau::neu(10.0);
        let (sender, _) = a.verbunden(Position::default());
        let (_, kaputt) = a.verbunden(Position::neu(1.0, 0.0, 0.0));
        let (_, ok1) = a.verbunden(Position::neu(2.0, 0.0, 0.0));
        let (_, ok2) = a.verbunden(Position::neu(3.0, 0.0, 0.0));

        let ausgang = Aufzeichner::mit_fehler_fuer(kaputt);
        assert_eq!(a.router.weiterleiten(sender, 1, vec![1], &a.register, &ausgang), 2);

        let mut ziele = ausgang.ziele();
        ziele.sort();
        let mut erwartet = vec![ok1, ok2];
        erwartet.sort();
        assert_eq!(ziele, erwartet);
    }
}
