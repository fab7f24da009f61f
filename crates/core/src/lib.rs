//! funkrelais-core – Gemeinsame Typen und Fehlertypen
//!
//! Identitaeten, Geheimnisse, Kanalnamen und die Geometrie fuer die
//! Naehe-Abfrage. Wird von Protokoll, Voice-Kern und Server gemeinsam genutzt.

pub mod error;
pub mod geometrie;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{FunkError, Result};
pub use geometrie::{Position, Quader};
pub use types::{Geheimnis, KanalName, SpielerId};
