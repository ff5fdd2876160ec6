//! Row-oriented cell containers filled by the TSV reader.
//!
//! Cells stay textual until `ukbpq-io::arrow_convert` parses them under a
//! column plan; empty TSV fields arrive here as `Scalar::Null`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Str(String),
}

impl Scalar {
    /// Empty fields are missing values in the exports.
    pub fn from_field(raw: &str) -> Self {
        if raw.is_empty() {
            Scalar::Null
        } else {
            Scalar::Str(raw.to_string())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Null => None,
            Scalar::Str(s) => Some(s.as_str()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> RowBatch {
        RowBatch {
            columns: vec![
                Column {
                    name: "eid".into(),
                    values: vec![
                        Scalar::from_field("1"),
                        Scalar::from_field("2"),
                        Scalar::from_field("3"),
                    ],
                },
                Column {
                    name: "31-0.0".into(),
                    values: vec![
                        Scalar::from_field("0"),
                        Scalar::from_field(""),
                        Scalar::from_field("1"),
                    ],
                },
            ],
        }
    }

    #[test]
    fn empty_field_is_null() {
        let b = batch();
        assert!(b.columns[1].values[1].is_null());
        assert_eq!(b.columns[1].values[2].as_str(), Some("1"));
    }

    #[test]
    fn column_lookup_by_name() {
        let b = batch();
        assert_eq!(b.num_rows(), 3);
        assert_eq!(b.column("31-0.0").map(|c| c.values.len()), Some(3));
        assert!(b.column("50-0.0").is_none());
    }
}
