//! Voice-Protokoll (UDP)
//!
//! Definiert die binaere Paketstruktur zwischen Client und Relais.
//! Die Audio-Nutzdaten sind fuer das Relais opake Bytes.
//!
//! ## Paketformat (kein serde)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       1   Version
//!  1       1   PaketArt
//!  2+      N   Koerper (siehe Tabelle)
//! ```
//!
//! | Art | Richtung         | Koerper                                      |
//! |-----|------------------|----------------------------------------------|
//! | 1   | Client -> Server | Authentifizieren: spieler(16) geheimnis(16)  |
//! | 2   | Server -> Client | AuthentifizierungBestaetigt: leer            |
//! | 3   | Client -> Server | Mikrofon: spieler(16) sequenz(8) nutzdaten   |
//! | 4   | Server -> Client | Ton: herkunft(16) sequenz(8) nutzdaten       |
//! | 5   | Server -> Client | KeepAlive: leer                              |
//! | 6   | Client -> Server | KeepAliveAntwort: spieler(16)                |
//! | 7   | Server -> Client | Ping: probe_id(8) zeitstempel_ms(8)          |
//! | 8   | Client -> Server | Pong: spieler(16) probe_id(8) zeitstempel(8) |
//!
//! Alle Ganzzahlen big-endian.

use bytes::{Buf, BufMut};
use funkrelais_core::types::{Geheimnis, SpielerId};
use std::io;

/// Aktuelle Protokollversion
pub const PROTOKOLL_VERSION: u8 = 1;

/// Groesse des gemeinsamen Kopfes (Version + PaketArt)
pub const KOPF_GROESSE: usize = 2;

/// Maximale Nutzdaten-Laenge (1280 Bytes, typisches Opus-MTU-Limit)
pub const MAX_NUTZDATEN_LAENGE: usize = 1280;

/// Groesstes gueltiges Paket (Ton: Kopf + herkunft + sequenz + Nutzdaten)
pub const MAX_PAKET_GROESSE: usize = KOPF_GROESSE + 16 + 8 + MAX_NUTZDATEN_LAENGE;

// ---------------------------------------------------------------------------
// PaketArt
// ---------------------------------------------------------------------------

/// Diskriminante eines UDP-Pakets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PaketArt {
    Authentifizieren = 1,
    AuthentifizierungBestaetigt = 2,
    Mikrofon = 3,
    Ton = 4,
    KeepAlive = 5,
    KeepAliveAntwort = 6,
    Ping = 7,
    Pong = 8,
}

impl PaketArt {
    /// Konvertiert ein Byte in eine `PaketArt`.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Authentifizieren),
            2 => Some(Self::AuthentifizierungBestaetigt),
            3 => Some(Self::Mikrofon),
            4 => Some(Self::Ton),
            5 => Some(Self::KeepAlive),
            6 => Some(Self::KeepAliveAntwort),
            7 => Some(Self::Ping),
            8 => Some(Self::Pong),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// NetzPaket
// ---------------------------------------------------------------------------

/// Alle UDP-Pakete als Tagged Union
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetzPaket {
    /// Handshake-Anfrage mit dem per Seitenkanal erhaltenen Geheimnis
    Authentifizieren { spieler: SpielerId, geheimnis: Geheimnis },
    /// Bestaetigung einer gueltigen Authentifizierung
    AuthentifizierungBestaetigt,
    /// Audio vom Client an das Relais
    Mikrofon {
        spieler: SpielerId,
        sequenz: u64,
        nutzdaten: Vec<u8>,
    },
    /// Weitergeleitetes Audio vom Relais an einen Empfaenger
    Ton {
        herkunft: SpielerId,
        sequenz: u64,
        nutzdaten: Vec<u8>,
    },
    /// Lebenszeichen-Anfrage des Relais
    KeepAlive,
    /// Antwort des Clients auf `KeepAlive`
    KeepAliveAntwort { spieler: SpielerId },
    /// Latenz-Probe des Relais
    Ping { probe_id: u64, zeitstempel_ms: u64 },
    /// Echo einer Latenz-Probe
    Pong {
        spieler: SpielerId,
        probe_id: u64,
        zeitstempel_ms: u64,
    },
}

impl NetzPaket {
    pub fn art(&self) -> PaketArt {
        match self {
            Self::Authentifizieren { .. } => PaketArt::Authentifizieren,
            Self::AuthentifizierungBestaetigt => PaketArt::AuthentifizierungBestaetigt,
            Self::Mikrofon { .. } => PaketArt::Mikrofon,
            Self::Ton { .. } => PaketArt::Ton,
            Self::KeepAlive => PaketArt::KeepAlive,
            Self::KeepAliveAntwort { .. } => PaketArt::KeepAliveAntwort,
            Self::Ping { .. } => PaketArt::Ping,
            Self::Pong { .. } => PaketArt::Pong,
        }
    }

    /// Vom Client behauptete Identitaet (nur Client -> Server-Pakete)
    pub fn absender(&self) -> Option<SpielerId> {
        match self {
            Self::Authentifizieren { spieler, .. }
            | Self::Mikrofon { spieler, .. }
            | Self::KeepAliveAntwort { spieler }
            | Self::Pong { spieler, .. } => Some(*spieler),
            _ => None,
        }
    }

    /// Serialisiert das Paket in einen Byte-Vec
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(KOPF_GROESSE + 32);
        buf.put_u8(PROTOKOLL_VERSION);
        buf.put_u8(self.art() as u8);

        match self {
            Self::Authentifizieren { spieler, geheimnis } => {
                buf.put_slice(spieler.as_bytes());
                buf.put_slice(geheimnis.as_bytes());
            }
            Self::AuthentifizierungBestaetigt | Self::KeepAlive => {}
            Self::Mikrofon {
                spieler,
                sequenz,
                nutzdaten,
            } => {
                buf.put_slice(spieler.as_bytes());
                buf.put_u64(*sequenz);
                buf.put_slice(nutzdaten);
            }
            Self::Ton {
                herkunft,
                sequenz,
                nutzdaten,
            } => {
                buf.put_slice(herkunft.as_bytes());
                buf.put_u64(*sequenz);
                buf.put_slice(nutzdaten);
            }
            Self::KeepAliveAntwort { spieler } => {
                buf.put_slice(spieler.as_bytes());
            }
            Self::Ping {
                probe_id,
                zeitstempel_ms,
            } => {
                buf.put_u64(*probe_id);
                buf.put_u64(*zeitstempel_ms);
            }
            Self::Pong {
                spieler,
                probe_id,
                zeitstempel_ms,
            } => {
                buf.put_slice(spieler.as_bytes());
                buf.put_u64(*probe_id);
                buf.put_u64(*zeitstempel_ms);
            }
        }

        buf
    }

    /// Deserialisiert und validiert ein Paket
    ///
    /// # Fehler
    /// - `InvalidData` bei falscher Version, unbekannter Art, zu kurzem Koerper,
    ///   ueberzaehligen Bytes oder zu langen Nutzdaten
    pub fn decode(daten: &[u8]) -> io::Result<Self> {
        if daten.len() < KOPF_GROESSE {
            return Err(ungueltig(format!(
                "Paket zu kurz: {} Bytes (erwartet mindestens {})",
                daten.len(),
                KOPF_GROESSE
            )));
        }

        let mut buf = daten;
        let version = buf.get_u8();
        if version != PROTOKOLL_VERSION {
            return Err(ungueltig(format!(
                "Ungueltige Protokollversion: {} (erwartet {})",
                version, PROTOKOLL_VERSION
            )));
        }

        let art_byte = buf.get_u8();
        let art = PaketArt::from_u8(art_byte)
            .ok_or_else(|| ungueltig(format!("Unbekannte PaketArt: {}", art_byte)))?;

        let paket = match art {
            PaketArt::Authentifizieren => {
                mindestens(&buf, 32, art)?;
                let spieler = SpielerId::from_bytes(uuid_lesen(&mut buf));
                let geheimnis = Geheimnis::from_bytes(uuid_lesen(&mut buf));
                Self::Authentifizieren { spieler, geheimnis }
            }
            PaketArt::AuthentifizierungBestaetigt => Self::AuthentifizierungBestaetigt,
            PaketArt::Mikrofon => {
                mindestens(&buf, 24, art)?;
                let spieler = SpielerId::from_bytes(uuid_lesen(&mut buf));
                let sequenz = buf.get_u64();
                Self::Mikrofon {
                    spieler,
                    sequenz,
                    nutzdaten: nutzdaten_lesen(&mut buf)?,
                }
            }
            PaketArt::Ton => {
                mindestens(&buf, 24, art)?;
                let herkunft = SpielerId::from_bytes(uuid_lesen(&mut buf));
                let sequenz = buf.get_u64();
                Self::Ton {
                    herkunft,
                    sequenz,
                    nutzdaten: nutzdaten_lesen(&mut buf)?,
                }
            }
            PaketArt::KeepAlive => Self::KeepAlive,
            PaketArt::KeepAliveAntwort => {
                mindestens(&buf, 16, art)?;
                Self::KeepAliveAntwort {
                    spieler: SpielerId::from_bytes(uuid_lesen(&mut buf)),
                }
            }
            PaketArt::Ping => {
                mindestens(&buf, 16, art)?;
                Self::Ping {
                    probe_id: buf.get_u64(),
                    zeitstempel_ms: buf.get_u64(),
                }
            }
            PaketArt::Pong => {
                mindestens(&buf, 32, art)?;
                Self::Pong {
                    spieler: SpielerId::from_bytes(uuid_lesen(&mut buf)),
                    probe_id: buf.get_u64(),
                    zeitstempel_ms: buf.get_u64(),
                }
            }
        };

        // Nutzdaten-Pakete haben `buf` bereits geleert
        if buf.has_remaining() {
            return Err(ungueltig(format!(
                "{} ueberzaehlige Bytes nach {:?}",
                buf.remaining(),
                art
            )));
        }

        Ok(paket)
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

fn ungueltig(nachricht: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, nachricht)
}

fn mindestens(buf: &&[u8], laenge: usize, art: PaketArt) -> io::Result<()> {
    if buf.remaining() < laenge {
        return Err(ungueltig(format!(
            "{:?}-Koerper zu kurz: {} Bytes (erwartet {})",
            art,
            buf.remaining(),
            laenge
        )));
    }
    Ok(())
}

fn uuid_lesen(buf: &mut &[u8]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    buf.copy_to_slice(&mut bytes);
    bytes
}

fn nutzdaten_lesen(buf: &mut &[u8]) -> io::Result<Vec<u8>> {
    if buf.remaining() > MAX_NUTZDATEN_LAENGE {
        return Err(ungueltig(format!(
            "Nutzdaten zu lang: {} Bytes (Maximum {})",
            buf.remaining(),
            MAX_NUTZDATEN_LAENGE
        )));
    }
    let nutzdaten = buf.to_vec();
    buf.advance(nutzdaten.len());
    Ok(nutzdaten)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
