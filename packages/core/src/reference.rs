//! Reference weight statistics keyed by label
//!
//! Values are kept as the exact text found in the source table. Nothing here
//! does arithmetic on them, they are only passed through for display.

use crate::error::TableError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const NAME_COLUMN: &str = "name";
const MIN_COLUMN: &str = "min";
const AVG_COLUMN: &str = "avg";
const MAX_COLUMN: &str = "max";

/// Placeholder rendered for every field when a label has no reference entry
pub const NOT_AVAILABLE: &str = "N/A";

/// Minimum, average and maximum mass of a single item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightStats {
    pub min: String,
    pub avg: String,
    pub max: String,
}

impl WeightStats {
    pub fn new(min: impl Into<String>, avg: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            avg: avg.into(),
            max: max.into(),
        }
    }

    /// Display form used when no reference entry exists
    pub fn not_available() -> Self {
        Self::new(NOT_AVAILABLE, NOT_AVAILABLE, NOT_AVAILABLE)
    }
}

/// Read-only label to weight lookup, built once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceDataStore {
    entries: HashMap<String, WeightStats>,
}

impl ReferenceDataStore {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a `;` separated table with `name`, `min`, `avg` and `max` columns.
    ///
    /// Later rows win over earlier rows with the same name. A table with no
    /// content at all, or only a header line, yields an empty store.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.is_empty() {
            return Ok(Self::default());
        }

        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(TableError::MissingColumn(name))
        };
        let name_idx = column(NAME_COLUMN)?;
        let min_idx = column(MIN_COLUMN)?;
        let avg_idx = column(AVG_COLUMN)?;
        let max_idx = column(MAX_COLUMN)?;

        let mut entries = HashMap::new();
        for record in rdr.records() {
            let record = record?;
            let row = record.position().map(|p| p.line()).unwrap_or_default();
            let field = |idx: usize| {
                record
                    .get(idx)
                    .filter(|v| !v.is_empty())
                    .ok_or(TableError::EmptyField { row })
            };

            let name = field(name_idx)?;
            let stats = WeightStats::new(field(min_idx)?, field(avg_idx)?, field(max_idx)?);
            if entries.insert(name.to_string(), stats).is_some() {
                tracing::debug!(name, row, "Duplicate weight entry, keeping the later row");
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, label: &str) -> Option<&WeightStats> {
        self.entries.get(label)
    }

    pub fn insert(&mut self, label: impl Into<String>, stats: WeightStats) {
        self.entries.insert(label.into(), stats);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, WeightStats)> for ReferenceDataStore {
    fn from_iter<I: IntoIterator<Item = (S, WeightStats)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
