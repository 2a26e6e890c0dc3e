//! Labeled pin records and their CSV export glue.
//!
//! Pins are the bulletin-board locations the user places on the map after
//! registration. They export through the same fixed 8-column schema as the
//! merger, so downstream consumers see one format.

use crate::error::Error;
use crate::geo::GeoPoint;
use crate::merge::{write_csv, NormalizedRow};

/// One placed pin.
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub number: String,
    pub name: String,
    pub position: GeoPoint,
    pub address: String,
    pub note: String,
}

impl Pin {
    fn to_row(&self, prefecture: &str, city: &str) -> NormalizedRow {
        NormalizedRow {
            prefecture: prefecture.to_string(),
            city: city.to_string(),
            number: self.number.clone(),
            address: self.address.clone(),
            name: self.name.clone(),
            lat: self.position.lat.to_string(),
            long: self.position.lng.to_string(),
            note: self.note.clone(),
        }
    }
}

/// Ordered collection of pins with shared prefecture/city columns.
#[derive(Debug, Default)]
pub struct PinStore {
    pins: Vec<Pin>,
    pub prefecture: String,
    pub city: String,
}

impl PinStore {
    pub fn new(prefecture: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            pins: Vec::new(),
            prefecture: prefecture.into(),
            city: city.into(),
        }
    }

    /// Append a pin, returning its index.
    pub fn add(&mut self, pin: Pin) -> usize {
        self.pins.push(pin);
        self.pins.len() - 1
    }

    /// Remove a pin by index. Returns `false` if out of range.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.pins.len() {
            return false;
        }
        self.pins.remove(index);
        true
    }

    /// Replace a pin in place (drag to a new position, rename, relabel).
    pub fn update(&mut self, index: usize, pin: Pin) -> bool {
        match self.pins.get_mut(index) {
            Some(slot) => {
                *slot = pin;
                true
            }
            None => false,
        }
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Serialize all pins with the fixed 8-column header.
    /// Fails with [`Error::EmptyDataset`] when no pins are placed.
    pub fn export_csv(&self) -> Result<String, Error> {
        let rows: Vec<NormalizedRow> = self
            .pins
            .iter()
            .map(|p| p.to_row(&self.prefecture, &self.city))
            .collect();
        write_csv(&rows)
    }
}
