//! Merging and sorting of normalized 8-column CSV sources.
//!
//! Sources are already-normalized tabular files sharing the fixed schema
//! `prefecture, city, number, address, name, lat, long, note`. The merger
//! concatenates all sources in addition order, keeps an immutable snapshot
//! of that order, and re-derives the displayed sequence from the snapshot
//! whenever the sort mode changes — repeated mode toggling is therefore
//! idempotent and `None` restores the exact insertion order.
//!
//! Row filtering is by **key presence**, not value: a source row missing the
//! `number`, `name`, `lat`, or `long` key is dropped; a row carrying those
//! keys with empty values is retained. `lat`/`long` stay strings throughout
//! the merge — they are only parsed for validity checking at import time.

pub mod sort;

use std::collections::HashMap;

use anyhow::Context;
use tracing::debug;

use crate::error::Error;

pub use sort::SortMode;

/// Export column order, also the header row of every exported file.
pub const COLUMNS: [&str; 8] = [
    "prefecture",
    "city",
    "number",
    "address",
    "name",
    "lat",
    "long",
    "note",
];

/// Keys a source row must carry (possibly empty) to be retained.
const REQUIRED_KEYS: [&str; 4] = ["number", "name", "lat", "long"];

/// A loosely-typed source row: whatever columns the file had.
pub type RawRecord = HashMap<String, String>;

/// A row conformed to the fixed 8-column schema. Absent optional source
/// columns default to the empty string; every field is always present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedRow {
    pub prefecture: String,
    pub city: String,
    pub number: String,
    pub address: String,
    pub name: String,
    pub lat: String,
    pub long: String,
    pub note: String,
}

impl NormalizedRow {
    fn from_record(rec: &RawRecord) -> Self {
        let field = |key: &str| rec.get(key).cloned().unwrap_or_default();
        Self {
            prefecture: field("prefecture"),
            city: field("city"),
            number: field("number"),
            address: field("address"),
            name: field("name"),
            lat: field("lat"),
            long: field("long"),
            note: field("note"),
        }
    }

    /// Whether `lat`/`long` parse as finite floats. Import-time validity
    /// check only; the merge itself never parses them.
    pub fn has_valid_coords(&self) -> bool {
        matches!(self.lat.trim().parse::<f64>(), Ok(v) if v.is_finite())
            && matches!(self.long.trim().parse::<f64>(), Ok(v) if v.is_finite())
    }
}

/// Parse header-led CSV text into loosely-typed records.
///
/// Column set and order are whatever the file declares; downstream
/// filtering works on key presence.
pub fn parse_records(text: &str) -> anyhow::Result<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr.headers().context("reading CSV header")?.clone();

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.context("reading CSV record")?;
        let mut map = RawRecord::with_capacity(headers.len());
        for (key, value) in headers.iter().zip(record.iter()) {
            map.insert(key.to_string(), value.to_string());
        }
        records.push(map);
    }
    Ok(records)
}

/// Concatenates normalized sources and sorts them with the ward-aware
/// composite key.
#[derive(Debug, Default)]
pub struct CsvMerger {
    sources: Vec<Vec<NormalizedRow>>,
    /// Snapshot of the concatenation order; sorting always starts here.
    original: Vec<NormalizedRow>,
    /// The displayed sequence under the current sort mode.
    current: Vec<NormalizedRow>,
    sort_mode: SortMode,
    label: Option<String>,
}

impl CsvMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one source. Rows missing a required key are dropped; the rest
    /// are projected into the fixed schema. Rebuilds the merged sequence
    /// from all sources in addition order. Returns how many rows were
    /// retained from this source.
    pub fn add_source(&mut self, records: &[RawRecord]) -> usize {
        let mut rows = Vec::with_capacity(records.len());
        for rec in records {
            if REQUIRED_KEYS.iter().any(|key| !rec.contains_key(*key)) {
                continue;
            }
            let row = NormalizedRow::from_record(rec);
            // Dataset label: first non-empty city seen, first-wins
            if self.label.is_none() && !row.city.is_empty() {
                self.label = Some(row.city.clone());
            }
            rows.push(row);
        }
        let retained = rows.len();
        debug!(
            "source added: {} of {} rows retained",
            retained,
            records.len()
        );
        self.sources.push(rows);
        self.rebuild();
        retained
    }

    /// Drop a source by its addition index. Returns `false` if out of range.
    pub fn remove_source(&mut self, index: usize) -> bool {
        if index >= self.sources.len() {
            return false;
        }
        self.sources.remove(index);
        self.rebuild();
        true
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Re-concatenate everything from scratch. Not incremental: the merged
    /// sequence is always a function of the full current source list.
    fn rebuild(&mut self) {
        self.original = self.sources.iter().flatten().cloned().collect();
        debug!(
            "rebuilt merged dataset: {} rows from {} sources",
            self.original.len(),
            self.sources.len()
        );
        self.resort();
    }

    /// Change the ordering. Always recomputed from the original-order
    /// snapshot, never from the currently-displayed sequence.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
        self.resort();
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    fn resort(&mut self) {
        self.current = self.original.clone();
        if self.sort_mode != SortMode::None {
            let mode = self.sort_mode;
            // sort_by is stable: equal keys keep insertion order
            self.current.sort_by(|a, b| sort::compare_rows(a, b, mode));
        }
    }

    /// The merged rows under the current sort mode.
    pub fn rows(&self) -> &[NormalizedRow] {
        &self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// First non-empty `city` value ever ingested; used for the export
    /// filename.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Serialize the current sequence with the fixed 8-column header.
    pub fn export_csv(&self) -> Result<String, Error> {
        write_csv(&self.current)
    }
}

/// Serialize rows as UTF-8 CSV with the [`COLUMNS`] header.
///
/// Fails with [`Error::EmptyDataset`] when there is nothing to export.
pub(crate) fn write_csv(rows: &[NormalizedRow]) -> Result<String, Error> {
    if rows.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(COLUMNS)?;
    for r in rows {
        wtr.write_record([
            &r.prefecture,
            &r.city,
            &r.number,
            &r.address,
            &r.name,
            &r.lat,
            &r.long,
            &r.note,
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
