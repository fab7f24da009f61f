//! Verarbeiter – der einzige Besitzer aller Voice-Sitzungen
//!
//! ```text
//! Entnehmer::naechster()
//!     |
//!     v
//! TTL pruefen            <- veraltet: verwerfen (Warnung mit Abkuehlung)
//!     |
//!     v
//! NetzPaket::decode()    <- ungueltig: verwerfen
//!     |
//!     v
//! paket_verarbeiten()    <- match auf die Paketart
//!     |
//!     +--> Authentifizieren  -> VerbindungsRegister + Bestaetigung
//!     +--> Mikrofon          -> Router::weiterleiten
//!     +--> KeepAliveAntwort  -> letzte_antwort
//!     +--> Pong              -> LatenzMesser
//! ```
//!
//! Zusaetzlich pro Takt: KeepAlive-Ueberwachung und Latenz-Pings, sowie
//! [`Befehl`]e vom Host (Logout).

use crate::abkuehlung::Abkuehlung;
use crate::angebot::VerbindungsAnbieter;
use crate::geheimnis::GeheimnisSpeicher;
use crate::keepalive::KeepAliveUeberwachung;
use crate::latenz::{LatenzMesser, LatenzTabelle};
use crate::router::{DatagrammAusgang, Router};
use crate::seitenkanal::Seitenkanal;
use crate::udp::VoiceServerConfig;
use crate::verbindung::{AuthErgebnis, Verbindung, VerbindungsRegister};
use crate::warteschlange::{Entnehmer, Umschlag};
use crate::welt::SpielWelt;
use crate::zustand::SpielerZustandsRegister;
use funkrelais_core::error::{FunkError, Result};
use funkrelais_core::types::{Geheimnis, SpielerId};
use funkrelais_protocol::voice::NetzPaket;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Steuerbefehle an den Verarbeiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Befehl {
    /// Sitzung des beendeten Logins entfernen
    ///
    /// `geheimnis` ist das beim Logout vergessene Geheimnis.
    Trennen {
        spieler: SpielerId,
        geheimnis: Geheimnis,
    },
}

pub struct Verarbeiter<W: SpielWelt, K: Seitenkanal, A: DatagrammAusgang> {
    register: VerbindungsRegister,
    geheimnisse: GeheimnisSpeicher,
    welt: Arc<W>,
    router: Router<W>,
    anbieter: VerbindungsAnbieter<K>,
    ueberwachung: KeepAliveUeberwachung,
    latenz: LatenzMesser,
    ausgang: Arc<A>,
    abkuehlung: Abkuehlung,
    takt: Duration,
    start: Instant,
}

impl<W: SpielWelt, K: Seitenkanal, A: DatagrammAusgang> Verarbeiter<W, K, A> {
    pub fn neu(
        config: &VoiceServerConfig,
        welt: Arc<W>,
        zustaende: SpielerZustandsRegister,
        geheimnisse: GeheimnisSpeicher,
        anbieter: VerbindungsAnbieter<K>,
        ausgang: Arc<A>,
    ) -> Self {
        Self {
            register: VerbindungsRegister::neu(),
            geheimnisse,
            router: Router::neu(Arc::clone(&welt), zustaende, config.distanz),
            welt,
            anbieter,
            ueberwachung: KeepAliveUeberwachung::neu(
                config.keepalive_intervall,
                config.antwort_timeout,
            ),
            latenz: LatenzMesser::neu(config.ping_intervall, config.antwort_timeout),
            ausgang,
            abkuehlung: Abkuehlung::default(),
            takt: config.takt,
            start: Instant::now(),
        }
    }

    pub fn latenzen(&self) -> LatenzTabelle {
        self.latenz.tabelle()
    }

    pub fn register(&self) -> &VerbindungsRegister {
        &self.register
    }

    /// Haupt-Loop bis Abbruch oder bis der Empfangs-Task weg ist
    pub async fn laufen(
        mut self,
        mut eingang: Entnehmer,
        mut befehle: mpsc::UnboundedReceiver<Befehl>,
        abbruch: CancellationToken,
    ) {
        let mut takt = tokio::time::interval(self.takt);
        takt.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!("Verarbeiter gestartet");

        loop {
            tokio::select! {
                biased;

                _ = abbruch.cancelled() => break,

                Some(befehl) = befehle.recv() => self.befehl_ausfuehren(befehl),

                _ = takt.tick() => self.tick(Instant::now()),

                umschlag = eingang.naechster() => match umschlag {
                    Some(umschlag) => {
                        let laenge = eingang.laenge();
                        self.umschlag_verarbeiten(umschlag, Instant::now(), laenge);
                    }
                    None => break,
                },
            }
        }

        tracing::info!(sitzungen = self.register.anzahl(), "Verarbeiter beendet");
    }

    pub fn befehl_ausfuehren(&mut self, befehl: Befehl) {
        match befehl {
            Befehl::Trennen { spieler, geheimnis } => {
                if self.register.abmelden(&spieler, &geheimnis).is_some() {
                    self.latenz.spieler_entfernen(&spieler);
                    tracing::info!(spieler = %spieler, "Voice-Sitzung nach Logout entfernt");
                }
            }
        }
    }

    /// KeepAlive-Ueberwachung, Timeout-Reconnects und Latenz-Pings
    pub fn tick(&mut self, jetzt: Instant) {
        let durchlauf = self.ueberwachung.durchlauf(&mut self.register, jetzt);

        if !durchlauf.keepalive_an.is_empty() {
            let bytes = NetzPaket::KeepAlive.encode();
            for adresse in &durchlauf.keepalive_an {
                self.senden(&bytes, *adresse);
            }
        }

        for spieler in durchlauf.abgelaufen {
            if self.trennen(&spieler).is_none() {
                continue;
            }
            tracing::info!(
                spieler = %spieler,
                timeout_ms = self.ueberwachung.timeout().as_millis() as u64,
                "Voice-Sitzung abgelaufen"
            );

            if self.welt.ist_online(&spieler) {
                self.anbieter.anbieten(spieler);
                tracing::info!(spieler = %spieler, "Reconnect angeboten");
            } else {
                tracing::debug!(spieler = %spieler, "Spieler nicht mehr online – kein Reconnect");
            }
        }

        let zeitstempel_ms = jetzt.saturating_duration_since(self.start).as_millis() as u64;
        for (adresse, ping) in self.latenz.faellige_pings(&self.register, jetzt, zeitstempel_ms) {
            self.senden(&ping.encode(), adresse);
        }
    }

    /// Verarbeitet einen Umschlag; `true` wenn das Paket angenommen wurde
    ///
    /// Fehler einzelner Pakete werden hier geloggt und enden hier.
    pub fn umschlag_verarbeiten(&mut self, umschlag: Umschlag, jetzt: Instant, warteschlange: usize) -> bool {
        if umschlag.ist_abgelaufen(jetzt) {
            if let Some(unterdrueckt) = self.abkuehlung.darf_melden("paket_ttl", jetzt) {
                tracing::warn!(
                    alter_ms = umschlag.alter(jetzt).as_millis() as u64,
                    ttl_ms = umschlag.ttl.as_millis() as u64,
                    warteschlange,
                    unterdrueckt,
                    "Ueberlast – veraltetes Paket verworfen"
                );
            }
            return false;
        }

        let paket = match NetzPaket::decode(&umschlag.daten) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(
                    fehler = %e,
                    absender = %umschlag.absender,
                    bytes = umschlag.daten.len(),
                    "Ungueltiges Paket"
                );
                return false;
            }
        };

        let art = paket.art();
        let spieler = paket.absender();
        match self.paket_verarbeiten(paket, umschlag.absender, jetzt) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    fehler = %e,
                    art = ?art,
                    spieler = ?spieler,
                    absender = %umschlag.absender,
                    "Paket verworfen"
                );
                false
            }
        }
    }

    fn paket_verarbeiten(
        &mut self,
        paket: NetzPaket,
        quelle: SocketAddr,
        jetzt: Instant,
    ) -> Result<()> {
        match paket {
            NetzPaket::Authentifizieren { spieler, geheimnis } => {
                let ergebnis = self
                    .register
                    .authentifizieren(&self.geheimnisse, spieler, &geheimnis, quelle, jetzt)
                    .ok_or_else(|| FunkError::Authentifizierung(spieler.to_string()))?;

                match ergebnis {
                    AuthErgebnis::Neu => {
                        tracing::info!(spieler = %spieler, adresse = %quelle, "Voice-Sitzung authentifiziert");
                    }
                    AuthErgebnis::Erneuert { alte_adresse } if alte_adresse != quelle => {
                        tracing::info!(
                            spieler = %spieler,
                            alt = %alte_adresse,
                            neu = %quelle,
                            "Voice-Adresse aktualisiert"
                        );
                    }
                    AuthErgebnis::Erneuert { .. } => {
                        tracing::debug!(spieler = %spieler, "Wiederholte Authentifizierung");
                    }
                }

                self.senden(&NetzPaket::AuthentifizierungBestaetigt.encode(), quelle);
                Ok(())
            }

            NetzPaket::Mikrofon {
                spieler,
                sequenz,
                nutzdaten,
            } => {
                self.sitzung_pruefen(&spieler, &quelle)?;
                self.router.weiterleiten(
                    spieler,
                    sequenz,
                    nutzdaten,
                    &self.register,
                    self.ausgang.as_ref(),
                );
                Ok(())
            }

            NetzPaket::KeepAliveAntwort { spieler } => {
                self.sitzung_pruefen(&spieler, &quelle)?;
                if let Some(verbindung) = self.register.get_mut(&spieler) {
                    verbindung.letzte_antwort = jetzt;
                }
                Ok(())
            }

            NetzPaket::Pong {
                spieler, probe_id, ..
            } => {
                self.sitzung_pruefen(&spieler, &quelle)?;
                self.latenz.pong_empfangen(spieler, probe_id, jetzt);
                Ok(())
            }

            andere @ (NetzPaket::AuthentifizierungBestaetigt
            | NetzPaket::Ton { .. }
            | NetzPaket::KeepAlive
            | NetzPaket::Ping { .. }) => Err(FunkError::UngueltigesPaket(format!(
                "{:?} ist nur Server -> Client erlaubt",
                andere.art()
            ))),
        }
    }

    /// Absender muss eine Sitzung mit genau dieser Quelladresse haben
    fn sitzung_pruefen(&self, spieler: &SpielerId, quelle: &SocketAddr) -> Result<()> {
        self.register
            .absender_aufloesen(spieler, quelle)
            .map(|_| ())
            .ok_or_else(|| FunkError::KeineSitzung(format!("{spieler} von {quelle}")))
    }

    fn trennen(&mut self, spieler: &SpielerId) -> Option<Verbindung> {
        self.latenz.spieler_entfernen(spieler);
        self.register.trennen(&self.geheimnisse, spieler)
    }

    fn senden(&self, daten: &[u8], ziel: SocketAddr) {
        if let Err(e) = self.ausgang.senden(daten, ziel) {
            tracing::warn!(ziel = %ziel, fehler = %e, "UDP-Sendefehler");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
