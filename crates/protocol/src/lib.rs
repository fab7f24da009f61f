//! funkrelais-protocol – Netzwerkprotokoll-Definitionen
//!
//! - [`voice`] – binaere UDP-Pakete zwischen Client und Relais
//! - [`control`] – Nachrichten ueber den zuverlaessigen Seitenkanal des Hosts

pub mod control;
pub mod voice;

pub use control::{
    kompatibilitaet_pruefen, SeitenkanalNachricht, SpielerZustand, KOMPATIBILITAETS_VERSION,
};
pub use voice::{NetzPaket, PaketArt};
