//! funkrelais-voice – Relais-Kern fuer Naehe- und Kanal-Sprachchat
//!
//! Nimmt authentifizierte Audio-Datagramme an und verteilt sie an alle
//! Spieler in der Naehe des Absenders oder im selben Kanal. Der Inhalt
//! der Nutzdaten ist fuer das Relais undurchsichtig.
//!
//! ## Module
//! - [`udp`] – Socket, Empfangs-Task, Start und Shutdown
//! - [`verarbeitung`] – Verarbeiter-Task, Dispatch pro Paketart
//! - [`router`] – Naehe- und Kanal-Routing
//! - [`verbindung`] – Sitzungs-Register und Handshake
//! - [`geheimnis`] – Sitzungs-Geheimnisse pro Login
//! - [`keepalive`] – KeepAlive-Ueberwachung und Timeouts
//! - [`latenz`] – RTT-Messung per Ping/Pong
//! - [`zustand`] / [`replikation`] – Spielerzustaende und deren Verteilung
//! - [`host`] / [`angebot`] – Callbacks des Spiel-Hosts, Verbindungsangebote
//! - [`welt`] / [`seitenkanal`] – Schnittstellen zum Host
//! - [`spiegel`] – Zustandsspiegel fuer Clients

pub mod abkuehlung;
pub mod angebot;
pub mod geheimnis;
pub mod host;
pub mod keepalive;
pub mod latenz;
pub mod replikation;
pub mod router;
pub mod seitenkanal;
pub mod spiegel;
pub mod udp;
pub mod verarbeitung;
pub mod verbindung;
pub mod warteschlange;
pub mod welt;
pub mod zustand;

#[cfg(test)]
pub(crate) mod testhilfe;

pub use host::HostBruecke;
pub use latenz::LatenzTabelle;
pub use router::{DatagrammAusgang, Router};
pub use seitenkanal::{Seitenkanal, SeitenkanalVerteiler};
pub use spiegel::ClientZustandsSpiegel;
pub use udp::{VoiceHandle, VoiceServer, VoiceServerConfig};
pub use welt::{SpeicherWelt, SpielWelt};
pub use zustand::SpielerZustandsRegister;
