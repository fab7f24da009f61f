//! Verbindungs-Register – authentifizierte UDP-Sitzungen
//!
//! Gehoert exklusiv dem Verarbeiter-Task, daher eine einfache `HashMap`
//! ohne Locks. Zustandsmaschine pro Spieler:
//!
//! ```text
//! NICHT_AUTHENTIFIZIERT --Authentifizieren(gueltig)--> AUTHENTIFIZIERT
//! AUTHENTIFIZIERT --Authentifizieren(gueltig)--> AUTHENTIFIZIERT (Adresse aktualisiert)
//! AUTHENTIFIZIERT --Timeout / Logout--> ENTFERNT
//! ```
//!
//! Jede Sitzung merkt sich das Geheimnis, mit dem sie angelegt wurde. So
//! trifft ein spaet ausgefuehrter Logout nur die Sitzung seines Logins.

use crate::geheimnis::GeheimnisSpeicher;
use funkrelais_core::types::{Geheimnis, SpielerId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Verbindung
// ---------------------------------------------------------------------------

/// Eine authentifizierte Voice-Sitzung
#[derive(Debug, Clone)]
pub struct Verbindung {
    pub spieler: SpielerId,
    /// Geheimnis des Logins, zu dem die Sitzung gehoert
    pub geheimnis: Geheimnis,
    /// Aktuelle UDP-Adresse des Clients
    pub adresse: SocketAddr,
    /// Zeitpunkt des zuletzt gesendeten KeepAlive
    pub letzter_keepalive: Instant,
    /// Zeitpunkt der letzten KeepAlive-Antwort (oder Authentifizierung)
    pub letzte_antwort: Instant,
    pub verbunden_seit: Instant,
}

impl Verbindung {
    fn neu(spieler: SpielerId, geheimnis: Geheimnis, adresse: SocketAddr, jetzt: Instant) -> Self {
        Self {
            spieler,
            geheimnis,
            adresse,
            letzter_keepalive: jetzt,
            letzte_antwort: jetzt,
            verbunden_seit: jetzt,
        }
    }
}

/// Ergebnis einer gueltigen Authentifizierung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErgebnis {
    /// Neue Sitzung angelegt
    Neu,
    /// Bestehende Sitzung bestaetigt, ggf. mit neuer Adresse
    Erneuert { alte_adresse: SocketAddr },
}

// ---------------------------------------------------------------------------
// VerbindungsRegister
// ---------------------------------------------------------------------------

/// Alle aktiven Sitzungen, indexiert nach SpielerId
#[derive(Debug, Default)]
pub struct VerbindungsRegister {
    verbindungen: HashMap<SpielerId, Verbindung>,
}

impl VerbindungsRegister {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Fuehrt den Handshake fuer eine Authentifizieren-Anfrage durch
    ///
    /// Falsches oder fehlendes Geheimnis: `None`, das Register bleibt
    /// unveraendert. Bei erneuter gueltiger Anfrage wird die Adresse
    /// aktualisiert und `letzte_antwort` zurueckgesetzt (die Anfrage ist
    /// selbst ein Lebenszeichen); `letzter_keepalive` bleibt unberuehrt.
    pub fn authentifizieren(
        &mut self,
        geheimnisse: &GeheimnisSpeicher,
        spieler: SpielerId,
        geheimnis: &Geheimnis,
        adresse: SocketAddr,
        jetzt: Instant,
    ) -> Option<AuthErgebnis> {
        if !geheimnisse.pruefen(&spieler, geheimnis) {
            return None;
        }

        match self.verbindungen.get_mut(&spieler) {
            Some(verbindung) => {
                let alte_adresse = verbindung.adresse;
                verbindung.geheimnis = *geheimnis;
                verbindung.adresse = adresse;
                verbindung.letzte_antwort = jetzt;
                Some(AuthErgebnis::Erneuert { alte_adresse })
            }
            None => {
                self.verbindungen
                    .insert(spieler, Verbindung::neu(spieler, *geheimnis, adresse, jetzt));
                Some(AuthErgebnis::Neu)
            }
        }
    }

    /// Ordnet ein Client-Paket seiner Sitzung zu
    ///
    /// Nur wenn die Quelladresse der gebundenen Adresse entspricht; nach
    /// einem Adresswechsel muss sich der Client neu authentifizieren.
    pub fn absender_aufloesen(
        &self,
        spieler: &SpielerId,
        adresse: &SocketAddr,
    ) -> Option<&Verbindung> {
        self.verbindungen
            .get(spieler)
            .filter(|v| v.adresse == *adresse)
    }

    /// Entfernt Sitzung und Geheimnis (Timeout)
    ///
    /// Das Geheimnis nur, solange es noch das der Sitzung ist. Der
    /// Spielerzustand bleibt bestehen, er lebt so lange wie der Login.
    pub fn trennen(
        &mut self,
        geheimnisse: &GeheimnisSpeicher,
        spieler: &SpielerId,
    ) -> Option<Verbindung> {
        let verbindung = self.verbindungen.remove(spieler)?;
        geheimnisse.vergessen_falls(spieler, &verbindung.geheimnis);
        Some(verbindung)
    }

    /// Entfernt die Sitzung eines beendeten Logins
    ///
    /// Der Host hat das Geheimnis bereits vergessen. Eine Sitzung, die sich
    /// schon mit dem Geheimnis eines neuen Logins authentifiziert hat, bleibt.
    pub fn abmelden(&mut self, spieler: &SpielerId, geheimnis: &Geheimnis) -> Option<Verbindung> {
        if self.verbindungen.get(spieler)?.geheimnis != *geheimnis {
            return None;
        }
        self.verbindungen.remove(spieler)
    }

    pub fn get(&self, spieler: &SpielerId) -> Option<&Verbindung> {
        self.verbindungen.get(spieler)
    }

    pub fn get_mut(&mut self, spieler: &SpielerId) -> Option<&mut Verbindung> {
        self.verbindungen.get_mut(spieler)
    }

    /// UDP-Adresse eines verbundenen Spielers
    pub fn adresse_von(&self, spieler: &SpielerId) -> Option<SocketAddr> {
        self.verbindungen.get(spieler).map(|v| v.adresse)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Verbindung> {
        self.verbindungen.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Verbindung> {
        self.verbindungen.values_mut()
    }

    pub fn ist_verbunden(&self, spieler: &SpielerId) -> bool {
        self.verbindungen.contains_key(spieler)
    }

    pub fn anzahl(&self) -> usize {
        self.verbindungen.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn adresse(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[test]
    fn gueltige_authentifizierung_legt_sitzung_an() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let spieler = SpielerId::new();
        let geheimnis = geheimnisse.holen_oder_erzeugen(spieler);

        let ergebnis =
            register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), Instant::now());

        assert_eq!(ergebnis, Some(AuthErgebnis::Neu));
        assert_eq!(register.adresse_von(&spieler), Some(adresse(4000)));
    }

    #[test]
    fn falsches_geheimnis_veraendert_nichts() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let opfer = SpielerId::new();
        let richtig = geheimnisse.holen_oder_erzeugen(opfer);
        let jetzt = Instant::now();

        register.authentifizieren(&geheimnisse, opfer, &richtig, adresse(4000), jetzt);

        // Viele falsche Geheimnisse fuer einen verbundenen und einen fremden Spieler
        for port in 5000..5050 {
            let falsch = Geheimnis::zufaellig();
            assert!(register
                .authentifizieren(&geheimnisse, opfer, &falsch, adresse(port), jetzt)
                .is_none());
            assert!(register
                .authentifizieren(&geheimnisse, SpielerId::new(), &falsch, adresse(port), jetzt)
                .is_none());
        }

        assert_eq!(register.anzahl(), 1);
        assert_eq!(register.adresse_von(&opfer), Some(adresse(4000)));
    }

    #[test]
    fn ohne_ausgestelltes_geheimnis_keine_sitzung() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let ergebnis = register.authentifizieren(
            &geheimnisse,
            SpielerId::new(),
            &Geheimnis::zufaellig(),
            adresse(4000),
            Instant::now(),
        );
        assert!(ergebnis.is_none());
        assert_eq!(register.anzahl(), 0);
    }

    #[test]
    fn erneute_authentifizierung_ist_idempotent() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let spieler = SpielerId::new();
        let geheimnis = geheimnisse.holen_oder_erzeugen(spieler);
        let t0 = Instant::now();

        register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), t0);
        let ergebnis = register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), t0);
        assert_eq!(
            ergebnis,
            Some(AuthErgebnis::Erneuert {
                alte_adresse: adresse(4000)
            })
        );

        // Adresswechsel (NAT-Rebinding)
        let ergebnis = register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4001), t0);
        assert_eq!(
            ergebnis,
            Some(AuthErgebnis::Erneuert {
                alte_adresse: adresse(4000)
            })
        );
        assert_eq!(register.anzahl(), 1);
        assert_eq!(register.adresse_von(&spieler), Some(adresse(4001)));
    }

    #[test]
    fn erneute_authentifizierung_setzt_nur_antwort_zeit_zurueck() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let spieler = SpielerId::new();
        let geheimnis = geheimnisse.holen_oder_erzeugen(spieler);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(5);

        register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), t0);
        register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), t1);

        let v = register.get(&spieler).unwrap();
        assert_eq!(v.letzte_antwort, t1);
        assert_eq!(v.letzter_keepalive, t0);
        assert_eq!(v.verbunden_seit, t0);
    }

    #[test]
    fn absender_nur_mit_gebundener_adresse() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let spieler = SpielerId::new();
        let geheimnis = geheimnisse.holen_oder_erzeugen(spieler);
        register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), Instant::now());

        assert!(register.absender_aufloesen(&spieler, &adresse(4000)).is_some());
        assert!(register.absender_aufloesen(&spieler, &adresse(4999)).is_none());
        assert!(register
            .absender_aufloesen(&SpielerId::new(), &adresse(4000))
            .is_none());
    }

    #[test]
    fn trennen_entfernt_sitzung_und_geheimnis() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let spieler = SpielerId::new();
        let geheimnis = geheimnisse.holen_oder_erzeugen(spieler);
        register.authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), Instant::now());

        assert!(register.trennen(&geheimnisse, &spieler).is_some());
        assert!(!register.ist_verbunden(&spieler));
        assert!(register.trennen(&geheimnisse, &spieler).is_none());

        // Altes Geheimnis authentifiziert nicht mehr
        assert!(register
            .authentifizieren(&geheimnisse, spieler, &geheimnis, adresse(4000), Instant::now())
            .is_none());
    }

    #[test]
    fn trennen_laesst_geheimnis_eines_neuen_logins_stehen() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let spieler = SpielerId::new();
        let alt = geheimnisse.holen_oder_erzeugen(spieler);
        register.authentifizieren(&geheimnisse, spieler, &alt, adresse(4000), Instant::now());

        geheimnisse.vergessen(&spieler);
        let neu = geheimnisse.holen_oder_erzeugen(spieler);

        assert!(register.trennen(&geheimnisse, &spieler).is_some());
        assert!(geheimnisse.pruefen(&spieler, &neu));
    }

    #[test]
    fn abmelden_trifft_nur_die_sitzung_des_alten_logins() {
        let geheimnisse = GeheimnisSpeicher::neu();
        let mut register = VerbindungsRegister::neu();
        let spieler = SpielerId::new();
        let alt = geheimnisse.holen_oder_erzeugen(spieler);
        register.authentifizieren(&geheimnisse, spieler, &alt, adresse(4000), Instant::now());

        // Neuer Login authentifiziert sich, bevor der alte Logout ankommt
        geheimnisse.vergessen(&spieler);
        let neu = geheimnisse.holen_oder_erzeugen(spieler);
        register.authentifizieren(&geheimnisse, spieler, &neu, adresse(4001), Instant::now());

        assert!(register.abmelden(&spieler, &alt).is_none());
        assert_eq!(register.adresse_von(&spieler), Some(adresse(4001)));
        assert!(geheimnisse.pruefen(&spieler, &neu));

        assert!(register.abmelden(&spieler, &neu).is_some());
        assert!(!register.ist_verbunden(&spieler));
    }
}
