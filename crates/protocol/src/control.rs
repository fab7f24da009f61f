//! Seitenkanal-Protokoll
//!
//! Nachrichten, die ueber den zuverlaessigen Kanal des Hosts laufen
//! (nicht UDP): Kompatibilitaets-Handshake, Verbindungsangebot mit
//! Sitzungsgeheimnis und die Replikation der Spielerzustaende.
//!
//! ## Design
//! - JSON-Serialisierung via serde (nicht zeitkritisch)
//! - Tagged Enum fuer typsichere Nachrichtentypen

use funkrelais_core::types::{Geheimnis, KanalName, SpielerId};
use funkrelais_core::FunkError;
use serde::{Deserialize, Serialize};

/// Voice-Kompatibilitaetsversion, muss bei Client und Server identisch sein
pub const KOMPATIBILITAETS_VERSION: u32 = 1;

/// Prueft die vom Client gemeldete Kompatibilitaetsversion
///
/// Bei Abweichung muss der Host den Client trennen.
pub fn kompatibilitaet_pruefen(client_version: u32) -> Result<(), FunkError> {
    if client_version == KOMPATIBILITAETS_VERSION {
        Ok(())
    } else {
        Err(FunkError::InkompatibleVersion {
            server: KOMPATIBILITAETS_VERSION,
            client: client_version,
        })
    }
}

// ---------------------------------------------------------------------------
// Spielerzustand
// ---------------------------------------------------------------------------

/// Replizierter Zustand eines Spielers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpielerZustand {
    /// Identitaet, vom Server immer mit dem verifizierten Absender ueberschrieben
    pub spieler: SpielerId,
    /// Anzeigename aus dem Spielerprofil
    pub name: String,
    /// Spieler hat seine Uebertragung deaktiviert
    pub deaktiviert: bool,
    /// Spieler hat keine Voice-Verbindung
    pub getrennt: bool,
    /// Gruppenkanal, `None` = Naehe-Modus
    #[serde(default)]
    pub kanal: Option<KanalName>,
}

impl SpielerZustand {
    /// Zustand direkt nach dem Login: aktiv, aber noch ohne Voice-Verbindung
    pub fn online(spieler: SpielerId, name: impl Into<String>) -> Self {
        Self {
            spieler,
            name: name.into(),
            deaktiviert: false,
            getrennt: true,
            kanal: None,
        }
    }

    /// Zustand nach dem Logout: deaktiviert und getrennt
    pub fn offline(spieler: SpielerId, name: impl Into<String>) -> Self {
        Self {
            spieler,
            name: name.into(),
            deaktiviert: true,
            getrennt: true,
            kanal: None,
        }
    }

    pub fn hat_kanal(&self) -> bool {
        self.kanal.is_some()
    }
}

// ---------------------------------------------------------------------------
// Nachrichten
// ---------------------------------------------------------------------------

/// Alle Seitenkanal-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeitenkanalNachricht {
    /// Kompatibilitaets-Handshake (beide Richtungen, vor jedem UDP-Verkehr)
    Handshake { kompatibilitaets_version: u32 },
    /// Verbindungsangebot: Geheimnis und UDP-Port fuer die Authentifizierung
    Geheimnis {
        spieler: SpielerId,
        geheimnis: Geheimnis,
        udp_port: u16,
    },
    /// Einzelner Zustand (Client -> Server und Broadcast Server -> Clients)
    SpielerZustand(SpielerZustand),
    /// Vollstaendige Tabelle fuer einen neu eingeloggten Spieler
    SpielerZustaende { zustaende: Vec<SpielerZustand> },
}

impl SeitenkanalNachricht {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
