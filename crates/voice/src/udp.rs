//! UDP Voice Server – Socket, Empfangs-Task und Verarbeiter-Task
//!
//! ```text
//! UDP Socket (recv_from)
//!     |
//!     v
//! Einreiher::einreihen()        <- Empfangs-Task, reine I/O
//!     |
//!     v
//! Warteschlange (begrenzt, TTL pro Umschlag)
//!     |
//!     v
//! Verarbeiter::laufen()         <- einziger Besitzer der Sitzungen
//!     |
//!     +--> UdpSocket::try_send_to (nicht-blockierend)
//! ```
//!
//! Beide Tasks enden beim Abbruch ueber das gemeinsame
//! `CancellationToken`; der Verarbeiter zusaetzlich, sobald der
//! Empfangs-Task seine Seite der Warteschlange fallen laesst.

use crate::angebot::VerbindungsAnbieter;
use crate::geheimnis::GeheimnisSpeicher;
use crate::host::HostBruecke;
use crate::latenz::LatenzTabelle;
use crate::replikation::ZustandsReplikation;
use crate::seitenkanal::Seitenkanal;
use crate::verarbeitung::Verarbeiter;
use crate::warteschlange::{warteschlange, Einreiher};
use crate::welt::SpielWelt;
use crate::zustand::SpielerZustandsRegister;
use funkrelais_core::error::{FunkError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Empfangspuffer, groesser als das laengste gueltige Paket
const UDP_BUFFER_SIZE: usize = 2048;

// ---------------------------------------------------------------------------
// VoiceServer-Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration fuer den UDP Voice Server
#[derive(Debug, Clone)]
pub struct VoiceServerConfig {
    /// Bind-Adresse (z.B. "0.0.0.0:24454")
    pub bind_addr: SocketAddr,
    /// Halbe Kantenlaenge des Naehe-Quaders
    pub distanz: f64,
    pub keepalive_intervall: Duration,
    /// Ohne KeepAlive-Antwort laenger als das -> Sitzung entfernen
    pub antwort_timeout: Duration,
    /// Maximales Alter eines Umschlags beim Entnehmen
    pub paket_ttl: Duration,
    pub warteschlange_kapazitaet: usize,
    pub ping_intervall: Duration,
    /// Takt fuer Ueberwachung und Pings
    pub takt: Duration,
}

impl VoiceServerConfig {
    /// Erstellt eine Konfiguration mit Standard-Werten
    pub fn neu(bind_addr: SocketAddr) -> Self {
        let keepalive_intervall = Duration::from_millis(1000);
        Self {
            bind_addr,
            distanz: 48.0,
            keepalive_intervall,
            antwort_timeout: keepalive_intervall * 10,
            paket_ttl: Duration::from_millis(500),
            warteschlange_kapazitaet: 4096,
            ping_intervall: Duration::from_secs(5),
            takt: Duration::from_millis(50),
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceServer
// ---------------------------------------------------------------------------

/// Gebundener, noch nicht gestarteter Voice Server
pub struct VoiceServer {
    config: VoiceServerConfig,
    socket: Arc<UdpSocket>,
}

impl VoiceServer {
    /// Bindet den UDP-Socket
    ///
    /// Ein Fehler hier ist fatal: ohne Socket gibt es keinen Voice-Dienst.
    pub async fn binden(config: VoiceServerConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .map_err(|quelle| FunkError::Bind {
                adresse: config.bind_addr.to_string(),
                quelle,
            })?;
        tracing::info!(addr = %config.bind_addr, "UDP Voice Server gebunden");

        Ok(Self {
            config,
            socket: Arc::new(socket),
        })
    }

    /// Gibt die lokale Bind-Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Startet Empfangs- und Verarbeiter-Task
    ///
    /// Muss innerhalb einer Tokio-Runtime aufgerufen werden.
    pub fn starten<W: SpielWelt, K: Seitenkanal>(
        self,
        welt: Arc<W>,
        seitenkanal: Arc<K>,
    ) -> Result<VoiceHandle<K>> {
        let lokale_adresse = self.socket.local_addr()?;
        let abbruch = CancellationToken::new();

        let geheimnisse = GeheimnisSpeicher::neu();
        let zustaende = SpielerZustandsRegister::neu();
        let anbieter = VerbindungsAnbieter::neu(
            geheimnisse.clone(),
            Arc::clone(&seitenkanal),
            lokale_adresse.port(),
        );
        let replikation = ZustandsReplikation::neu(zustaende.clone(), seitenkanal);
        let (befehl_tx, befehl_rx) = mpsc::unbounded_channel();
        let bruecke = HostBruecke::neu(geheimnisse.clone(), replikation, anbieter.clone(), befehl_tx);

        let (einreiher, entnehmer) =
            warteschlange(self.config.warteschlange_kapazitaet, self.config.paket_ttl);

        let verarbeiter = Verarbeiter::neu(
            &self.config,
            welt,
            zustaende.clone(),
            geheimnisse,
            anbieter,
            Arc::clone(&self.socket),
        );
        let latenzen = verarbeiter.latenzen();

        let empfang = tokio::spawn(empfangs_loop(
            Arc::clone(&self.socket),
            einreiher,
            abbruch.clone(),
        ));
        let verarbeitung = tokio::spawn(verarbeiter.laufen(entnehmer, befehl_rx, abbruch.clone()));

        Ok(VoiceHandle {
            bruecke,
            zustaende,
            latenzen,
            lokale_adresse,
            abbruch,
            tasks: vec![empfang, verarbeitung],
        })
    }
}

/// Empfangs-Loop: liest Datagramme und reiht sie ein, sonst nichts
async fn empfangs_loop(socket: Arc<UdpSocket>, mut einreiher: Einreiher, abbruch: CancellationToken) {
    let mut buf = vec![0u8; UDP_BUFFER_SIZE];

    tracing::info!("Voice-Empfangs-Loop gestartet");

    loop {
        tokio::select! {
            _ = abbruch.cancelled() => {
                tracing::info!("Voice-Server: Shutdown-Signal empfangen");
                break;
            }

            ergebnis = socket.recv_from(&mut buf) => {
                match ergebnis {
                    Ok((len, absender)) => {
                        einreiher.einreihen(buf[..len].to_vec(), absender, Instant::now());
                    }
                    Err(e) => {
                        tracing::error!(fehler = %e, "UDP-Empfangsfehler");
                        // Kurze Pause um Busy-Loop bei persistentem Fehler zu vermeiden
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                }
            }
        }
    }

    tracing::info!("Voice-Empfangs-Loop beendet");
}

// ---------------------------------------------------------------------------
// VoiceHandle
// ---------------------------------------------------------------------------

/// Handle auf einen laufenden Voice Server
pub struct VoiceHandle<K: Seitenkanal> {
    bruecke: HostBruecke<K>,
    zustaende: SpielerZustandsRegister,
    latenzen: LatenzTabelle,
    lokale_adresse: SocketAddr,
    abbruch: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<K: Seitenkanal> VoiceHandle<K> {
    /// Einstieg fuer Host-Callbacks (Login, Logout, Seitenkanal)
    pub fn bruecke(&self) -> &HostBruecke<K> {
        &self.bruecke
    }

    pub fn zustaende(&self) -> &SpielerZustandsRegister {
        &self.zustaende
    }

    pub fn latenzen(&self) -> &LatenzTabelle {
        &self.latenzen
    }

    pub fn lokale_adresse(&self) -> SocketAddr {
        self.lokale_adresse
    }

    /// Signalisiert beiden Tasks das Ende; darf jederzeit und mehrfach aufgerufen werden
    pub fn beenden(&self) {
        self.abbruch.cancel();
    }

    /// Wartet bis beide Tasks beendet sind
    pub async fn beendet(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(fehler = %e, "Voice-Task abgebrochen");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
