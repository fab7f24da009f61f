//! Test-Doubles fuer Unit-Tests des Voice-Kerns

use crate::router::DatagrammAusgang;
use funkrelais_protocol::voice::NetzPaket;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;

/// Zeichnet ausgehende Datagramme auf statt sie zu senden
#[derive(Default)]
pub struct Aufzeichner {
    gesendet: Mutex<Vec<(Vec<u8>, SocketAddr)>>,
    fehler_fuer: Option<SocketAddr>,
}

impl Aufzeichner {
    /// Sends an `ziel` schlagen mit `WouldBlock` fehl
    pub fn mit_fehler_fuer(ziel: SocketAddr) -> Self {
        Self {
            gesendet: Mutex::new(Vec::new()),
            fehler_fuer: Some(ziel),
        }
    }

    pub fn gesendet(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        self.gesendet.lock().unwrap().clone()
    }

    pub fn ziele(&self) -> Vec<SocketAddr> {
        self.gesendet().into_iter().map(|(_, ziel)| ziel).collect()
    }

    /// Dekodierte Pakete an ein Ziel
    pub fn pakete_an(&self, ziel: SocketAddr) -> Vec<NetzPaket> {
        self.gesendet()
            .into_iter()
            .filter(|(_, z)| *z == ziel)
            .map(|(daten, _)| NetzPaket::decode(&daten).unwrap())
            .collect()
    }

    pub fn leeren(&self) {
        self.gesendet.lock().unwrap().clear();
    }
}

impl DatagrammAusgang for Aufzeichner {
    fn senden(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<()> {
        if self.fehler_fuer == Some(ziel) {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        self.gesendet.lock().unwrap().push((daten.to_vec(), ziel));
        Ok(())
    }
}
