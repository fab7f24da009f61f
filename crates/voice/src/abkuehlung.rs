//! Abkuehlung – Rate-Limit fuer wiederkehrende Warnungen
//!
//! Ein Zeitstempel "zuletzt gemeldet" pro Schluessel. Unter Dauerlast
//! erscheint eine Warnung hoechstens einmal pro Abkuehlzeit.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Standard-Abkuehlzeit fuer Ueberlast-Warnungen
pub const STANDARD_ABKUEHLUNG: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct Abkuehlung {
    dauer: Duration,
    letzte: HashMap<&'static str, Instant>,
    unterdrueckt: HashMap<&'static str, u64>,
}

impl Abkuehlung {
    pub fn neu(dauer: Duration) -> Self {
        Self {
            dauer,
            letzte: HashMap::new(),
            unterdrueckt: HashMap::new(),
        }
    }

    /// Darf die Meldung `schluessel` jetzt ausgegeben werden?
    ///
    /// Bei `Some(n)` ja; `n` ist die Anzahl seit der letzten Ausgabe
    /// unterdrueckter Meldungen.
    pub fn darf_melden(&mut self, schluessel: &'static str, jetzt: Instant) -> Option<u64> {
        let frei = match self.letzte.get(schluessel) {
            Some(letzte) => jetzt.saturating_duration_since(*letzte) >= self.dauer,
            None => true,
        };

        if frei {
            self.letzte.insert(schluessel, jetzt);
            Some(self.unterdrueckt.remove(schluessel).unwrap_or(0))
        } else {
            *self.unterdrueckt.entry(schluessel).or_insert(0) += 1;
            None
        }
    }
}

impl Default for Abkuehlung {
    fn default() -> Self {
        Self::neu(STANDARD_ABKUEHLUNG)
    }
}
