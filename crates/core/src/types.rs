//! Identifikationstypen fuer funkrelais
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Spieler-ID und Sitzungsgeheimnis zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FunkError;

/// Stabile Spieler-Identitaet (bleibt ueber Voice-Reconnects gleich)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpielerId(pub Uuid);

impl SpielerId {
    /// Erstellt eine neue zufaellige SpielerId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }

    /// Rohe 16 Bytes fuer das Wire-Format
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for SpielerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpielerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spieler:{}", self.0)
    }
}

/// Sitzungsgeheimnis, authentifiziert UDP-Pakete eines Spielers
///
/// Zufaellige v4-UUID (122 Bit aus dem OS-Zufallsgenerator). `Debug` gibt
/// den Wert bewusst nicht aus, damit er nicht in Logs landet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geheimnis(pub Uuid);

impl Geheimnis {
    /// Erzeugt ein neues zufaelliges Geheimnis
    pub fn zufaellig() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl std::fmt::Debug for Geheimnis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Geheimnis(***)")
    }
}

/// Maximale Laenge eines Kanalnamens
pub const KANAL_NAME_MAX_LAENGE: usize = 16;

/// Validierter Kanalname: `[a-zA-Z0-9-_]{1,16}`
///
/// Mitgliedschaft wird per exaktem Stringvergleich bestimmt
/// (Gross-/Kleinschreibung zaehlt).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KanalName(String);

impl KanalName {
    /// Validiert und erstellt einen Kanalnamen
    pub fn neu(name: impl Into<String>) -> Result<Self, FunkError> {
        let name = name.into();
        if Self::ist_gueltig(&name) {
            Ok(Self(name))
        } else {
            Err(FunkError::UngueltigerKanalName(name))
        }
    }

    /// Prueft einen Namen gegen das erlaubte Muster
    pub fn ist_gueltig(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= KANAL_NAME_MAX_LAENGE
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for KanalName {
    type Error = FunkError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::neu(name)
    }
}

impl From<KanalName> for String {
    fn from(name: KanalName) -> Self {
        name.0
    }
}

impl std::fmt::Display for KanalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
