//! Per-column conversion plans produced by the planner and consumed by
//! `ukbpq-io::arrow_convert`.

use serde::{Deserialize, Serialize};

use crate::schema::{DataType, Field, Schema};

/// Encoding whose codes bound the admissible values of a categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingRef {
    pub id: String,
    /// Only codes marked selectable count for hierarchical encodings.
    pub hierarchical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPlan {
    pub name: String,
    pub data_type: DataType,
    /// strftime format for `Date32`/`Timestamp` values.
    pub date_format: Option<String>,
    pub categories_from: Option<EncodingRef>,
}

impl ColumnPlan {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            date_format: None,
            categories_from: None,
        }
    }

    pub fn with_date_format(mut self, format: Option<String>) -> Self {
        self.date_format = format;
        self
    }

    pub fn with_categories(mut self, encoding: EncodingRef) -> Self {
        self.categories_from = Some(encoding);
        self
    }

    pub fn field(&self) -> Field {
        Field::new(self.name.clone(), self.data_type.clone(), true)
    }
}

/// Output schema for a list of plans; every column is nullable.
pub fn plans_to_schema(plans: &[ColumnPlan]) -> Schema {
    Schema::new(plans.iter().map(ColumnPlan::field).collect())
}
