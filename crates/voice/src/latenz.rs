//! Latenz-Messung per Ping/Pong
//!
//! Der Verarbeiter schickt jeder Sitzung alle `intervall` einen Ping mit
//! eindeutiger Probe-ID. Ein Pong mit passender ID und passendem Spieler
//! liefert die RTT. Offene Proben verfallen nach `probe_timeout`.
//!
//! Die Ergebnisse landen in einer [`LatenzTabelle`], die sich billig
//! klonen und von ausserhalb des Verarbeiters lesen laesst.

use crate::verbindung::VerbindungsRegister;
use dashmap::DashMap;
use funkrelais_core::types::SpielerId;
use funkrelais_protocol::voice::NetzPaket;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// LatenzTabelle
// ---------------------------------------------------------------------------

/// Zuletzt gemessene RTT pro Spieler
#[derive(Clone, Default)]
pub struct LatenzTabelle {
    inner: Arc<DashMap<SpielerId, Duration>>,
}

impl LatenzTabelle {
    pub fn rtt(&self, spieler: &SpielerId) -> Option<Duration> {
        self.inner.get(spieler).map(|d| *d)
    }

    pub fn alle(&self) -> Vec<(SpielerId, Duration)> {
        self.inner.iter().map(|e| (*e.key(), *e.value())).collect()
    }
}

// ---------------------------------------------------------------------------
// LatenzMesser
// ---------------------------------------------------------------------------

struct OffeneProbe {
    spieler: SpielerId,
    gesendet: Instant,
}

pub struct LatenzMesser {
    intervall: Duration,
    probe_timeout: Duration,
    offen: HashMap<u64, OffeneProbe>,
    naechste_id: u64,
    letzte_runde: Option<Instant>,
    tabelle: LatenzTabelle,
}

impl LatenzMesser {
    pub fn neu(intervall: Duration, probe_timeout: Duration) -> Self {
        Self {
            intervall,
            probe_timeout,
            offen: HashMap::new(),
            naechste_id: 1,
            letzte_runde: None,
            tabelle: LatenzTabelle::default(),
        }
    }

    pub fn tabelle(&self) -> LatenzTabelle {
        self.tabelle.clone()
    }

    pub fn offene_proben(&self) -> usize {
        self.offen.len()
    }

    /// Pings fuer alle Sitzungen, falls eine neue Runde faellig ist
    ///
    /// `zeitstempel_ms` wird unveraendert im Ping mitgeschickt.
    pub fn faellige_pings(
        &mut self,
        register: &VerbindungsRegister,
        jetzt: Instant,
        zeitstempel_ms: u64,
    ) -> Vec<(SocketAddr, NetzPaket)> {
        let timeout = self.probe_timeout;
        self.offen
            .retain(|_, probe| jetzt.saturating_duration_since(probe.gesendet) <= timeout);

        let faellig = self
            .letzte_runde
            .map_or(true, |t| jetzt.saturating_duration_since(t) >= self.intervall);
        if !faellig {
            return Vec::new();
        }
        self.letzte_runde = Some(jetzt);

        register
            .iter()
            .map(|verbindung| {
                let probe_id = self.naechste_id;
                self.naechste_id = self.naechste_id.wrapping_add(1);
                self.offen.insert(
                    probe_id,
                    OffeneProbe {
                        spieler: verbindung.spieler,
                        gesendet: jetzt,
                    },
                );
                (
                    verbindung.adresse,
                    NetzPaket::Ping {
                        probe_id,
                        zeitstempel_ms,
                    },
                )
            })
            .collect()
    }

    /// Wertet ein Pong aus; ohne passende offene Probe wird es ignoriert
    pub fn pong_empfangen(
        &mut self,
        spieler: SpielerId,
        probe_id: u64,
        jetzt: Instant,
    ) -> Option<Duration> {
        match self.offen.get(&probe_id) {
            Some(probe) if probe.spieler == spieler => {}
            _ => {
                tracing::debug!(spieler = %spieler, probe_id, "Pong ohne passende Probe ignoriert");
                return None;
            }
        }
        let probe = self.offen.remove(&probe_id)?;
        let rtt = jetzt.saturating_duration_since(probe.gesendet);
        self.tabelle.inner.insert(spieler, rtt);
        tracing::trace!(spieler = %spieler, rtt_ms = rtt.as_millis() as u64, "Latenz gemessen");
        Some(rtt)
    }

    /// Vergisst Proben und Messwert einer getrennten Sitzung
    pub fn spieler_entfernen(&mut self, spieler: &SpielerId) {
        self.offen.retain(|_, probe| probe.spieler != *spieler);
        self.tabelle.inner.remove(spieler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geheimnis::GeheimnisSpeicher;

    fn register_mit(anzahl: usize, t0: Instant) -> (VerbindungsRegister, Vec<SpielerId>) {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let mut spieler = Vec::new();
        for i in 0..anzahl {
            let s = SpielerId::new();
            let g = geheimnisse.holen_oder_erzeugen(s);
            let adresse: SocketAddr = format!("127.0.0.1:{}", 7000 + i).parse().unwrap();
            register.authentifizieren(&geheimnisse, s, &g, adresse, t0).unwrap();
            spieler.push(s);
        }
        (register, spieler)
    }

    fn probe_id(paket: &NetzPaket) -> u64 {
        match paket {
            NetzPaket::Ping { probe_id, .. } => *probe_id,
            andere => panic!("Erwartet Ping, erhalten {andere:?}"),
        }
    }

    #[test]
    fn runde_nur_nach_intervall() {
        let t0 = Instant::now();
        let (register, _) = register_mit(2, t0);
        let mut messer = LatenzMesser::neu(Duration::from_secs(5), Duration::from_secs(10));

        assert_eq!(messer.faellige_pings(&register, t0, 0).len(), 2);
        assert!(messer.faellige_pings(&register, t0 + Duration::from_secs(4), 0).is_empty());
        assert_eq!(messer.faellige_pings(&register, t0 + Duration::from_secs(5), 0).len(), 2);
    }

    #[test]
    fn pong_liefert_rtt() {
        let t0 = Instant::now();
        let (register, spieler) = register_mit(1, t0);
        let mut messer = LatenzMesser::neu(Duration::from_secs(5), Duration::from_secs(10));
        let tabelle = messer.tabelle();

        let pings = messer.faellige_pings(&register, t0, 1234);
        let id = probe_id(&pings[0].1);

        let rtt = messer.pong_empfangen(spieler[0], id, t0 + Duration::from_millis(40));
        assert_eq!(rtt, Some(Duration::from_millis(40)));
        assert_eq!(tabelle.rtt(&spieler[0]), Some(Duration::from_millis(40)));
        assert_eq!(messer.offene_proben(), 0);

        // Zweites Pong fuer dieselbe Probe wird ignoriert
        assert!(messer.pong_empfangen(spieler[0], id, t0 + Duration::from_millis(50)).is_none());
    }

    #[test]
    fn pong_ohne_passende_probe_ignoriert() {
        let t0 = Instant::now();
        let (register, spieler) = register_mit(2, t0);
        let mut messer = LatenzMesser::neu(Duration::from_secs(5), Duration::from_secs(10));

        let pings = messer.faellige_pings(&register, t0, 0);
        let ids: Vec<u64> = pings.iter().map(|(_, p)| probe_id(p)).collect();

        assert!(messer.pong_empfangen(spieler[0], 9999, t0).is_none());
        // Fremde Probe-ID: Spieler passt nicht zur Probe
        let fremde = pings
            .iter()
            .zip(&ids)
            .find(|((adresse, _), _)| Some(*adresse) != register.adresse_von(&spieler[0]))
            .map(|(_, id)| *id)
            .unwrap();
        assert!(messer.pong_empfangen(spieler[0], fremde, t0).is_none());
        assert_eq!(messer.offene_proben(), 2);
    }

    #[test]
    fn offene_proben_verfallen() {
        let t0 = Instant::now();
        let (register, spieler) = register_mit(1, t0);
        let mut messer = LatenzMesser::neu(Duration::from_secs(5), Duration::from_secs(10));

        let id = probe_id(&messer.faellige_pings(&register, t0, 0)[0].1);
        messer.faellige_pings(&register, t0 + Duration::from_secs(11), 0);

        assert!(messer
            .pong_empfangen(spieler[0], id, t0 + Duration::from_secs(11))
            .is_none());
    }

    #[test]
    fn spieler_entfernen_vergisst_alles() {
        let t0 = Instant::now();
        let (register, spieler) = register_mit(1, t0);
        let mut messer = LatenzMesser::neu(Duration::from_secs(5), Duration::from_secs(10));
        let tabelle = messer.tabelle();

        let id = probe_id(&messer.faellige_pings(&register, t0, 0)[0].1);
        messer.pong_empfangen(spieler[0], id, t0);
        messer.faellige_pings(&register, t0 + Duration::from_secs(5), 0);

        messer.spieler_entfernen(&spieler[0]);
        assert_eq!(messer.offene_proben(), 0);
        assert!(tabelle.rtt(&spieler[0]).is_none());
    }
}
