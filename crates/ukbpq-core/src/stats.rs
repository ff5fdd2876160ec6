//! Column statistics gathered while converting.
//!
//! Tracks null and total counts per column so a finished conversion can log
//! a per-column summary of the written dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Scalar;

/// Cell counts of one output column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Number of null values (empty fields and values outside an encoding)
    pub null_count: u64,
    /// Cells seen, nulls included.
    pub total_count: u64,
}

impl ColumnStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one raw cell.
    pub fn update(&mut self, value: &Scalar) {
        self.total_count += 1;
        if value.is_null() {
            self.null_count += 1;
        }
    }

    /// Record nulls introduced after reading (e.g. codes rejected by an encoding).
    pub fn add_nulls(&mut self, n: u64) {
        self.null_count += n;
    }

    pub fn non_null_count(&self) -> u64 {
        self.total_count - self.null_count
    }
}

/// Cell counts per output column, keyed by UDI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaStats {
    pub column_stats: BTreeMap<String, ColumnStats>,
}

impl SchemaStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column_name: &str) -> Option<&ColumnStats> {
        self.column_stats.get(column_name)
    }

    pub fn get_or_create(&mut self, column_name: &str) -> &mut ColumnStats {
        self.column_stats
            .entry(column_name.to_string())
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_nulls_and_rejected_codes() {
        let mut stats = SchemaStats::new();
        stats.get_or_create("34-0.0").update(&Scalar::Null);
        stats.get_or_create("34-0.0").update(&Scalar::Str("1950".into()));
        stats.get_or_create("34-0.0").update(&Scalar::Str("-3".into()));
        stats.get_or_create("34-0.0").add_nulls(1);

        let s = stats.get("34-0.0").unwrap();
        assert_eq!(s.total_count, 3);
        assert_eq!(s.null_count, 2);
        assert_eq!(s.non_null_count(), 1);
        assert!(stats.get("eid").is_none());
    }
}
