//! Ordered label table aligned with the classifier output vector

use crate::error::TableError;
use std::io::Read;
use std::path::Path;

const LABEL_COLUMN: &str = "label";

/// Produce category names, position `i` names classifier output `i`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a comma separated table with a `label` header column, keeping row order
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let column = rdr
            .headers()?
            .iter()
            .position(|h| h == LABEL_COLUMN)
            .ok_or(TableError::MissingColumn(LABEL_COLUMN))?;

        let mut labels = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let row = record.position().map(|p| p.line()).unwrap_or_default();
            let label = record
                .get(column)
                .filter(|l| !l.is_empty())
                .ok_or(TableError::EmptyField { row })?;
            labels.push(label.to_string());
        }

        if labels.is_empty() {
            return Err(TableError::Empty);
        }

        Ok(Self { labels })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_row_order() {
        let csv = "label\nTomato 4\nApple Red Delicious\nHuckleberry\n";
        let table = LabelTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some("Tomato 4"));
        assert_eq!(table.get(1), Some("Apple Red Delicious"));
        assert_eq!(table.get(2), Some("Huckleberry"));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn finds_label_column_among_others() {
        let csv = "id,label\n0,apple\n1,banana\n";
        let table = LabelTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["apple", "banana"]);
    }

    #[test]
    fn missing_column_is_rejected() {
        let csv = "name\napple\n";
        let err = LabelTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::MissingColumn("label")));
    }

    #[test]
    fn empty_label_is_rejected() {
        let csv = "id,label\n0,apple\n1,\n";
        let err = LabelTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::EmptyField { row: 3 }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let csv = "id,label\n0,apple,extra\n";
        let err = LabelTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Csv(_)));
    }

    #[test]
    fn header_only_is_empty() {
        let err = LabelTable::from_reader("label\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TableError::Empty));
    }
}
