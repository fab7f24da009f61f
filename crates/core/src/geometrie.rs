//! Weltpositionen und achsenparalleler Quader fuer die Naehe-Abfrage

use serde::{Deserialize, Serialize};

/// Position eines Spielers in Weltkoordinaten
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn neu(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Achsenparalleler Quader (min/max inklusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quader {
    pub min: Position,
    pub max: Position,
}

impl Quader {
    /// Wuerfel mit Kantenlaenge `2 * radius` um `mitte`
    pub fn um(mitte: Position, radius: f64) -> Self {
        Self {
            min: Position::neu(mitte.x - radius, mitte.y - radius, mitte.z - radius),
            max: Position::neu(mitte.x + radius, mitte.y + radius, mitte.z + radius),
        }
    }

    pub fn enthaelt(&self, p: &Position) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}
