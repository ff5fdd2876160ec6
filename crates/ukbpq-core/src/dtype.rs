//! Dtype conversion tables.
//!
//! A `DtypeTable` maps the dictionary's declared `Type` (and, for
//! categoricals that exceed the category limit, the `Encoding_type`) to a
//! target dtype. Entries are either a dtype name or a `["Date", "<fmt>"]`
//! pair whose strftime format is used to parse the column.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{DataType, DictKey};

pub const DEFAULT_MAX_CATEGORIES: u64 = 256;
pub const DEFAULT_ENCODING: &str = "windows-1252";
pub const DEFAULT_CATEGORICAL_TYPES: [&str; 2] = ["Categorical (single)", "Categorical (multiple)"];

/// Keywords accepted as the first element of a list-valued dtype.
const DATE_KEYWORDS: [&str; 1] = ["date"];

/// strftime directives that carry a time of day.
const TIME_DIRECTIVES: [&str; 10] = ["%H", "%I", "%M", "%S", "%T", "%R", "%X", "%c", "%s", "%p"];

pub fn default_categorical_types() -> Vec<String> {
    DEFAULT_CATEGORICAL_TYPES.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDtype", into = "RawDtype")]
pub enum DtypeSpec {
    /// A dtype name such as `int`, `float`, `string`.
    Plain(String),
    /// Parse with a strftime format.
    Date { format: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDtype {
    Name(String),
    List(Vec<String>),
}

impl TryFrom<RawDtype> for DtypeSpec {
    type Error = Error;

    fn try_from(raw: RawDtype) -> Result<Self> {
        match raw {
            RawDtype::Name(name) => Ok(DtypeSpec::Plain(name)),
            RawDtype::List(items) => DtypeSpec::from_list(&items),
        }
    }
}

impl From<DtypeSpec> for RawDtype {
    fn from(spec: DtypeSpec) -> Self {
        match spec {
            DtypeSpec::Plain(name) => RawDtype::Name(name),
            DtypeSpec::Date { format } => RawDtype::List(vec!["Date".into(), format]),
        }
    }
}

impl fmt::Display for DtypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DtypeSpec::Plain(name) => write!(f, "{name}"),
            DtypeSpec::Date { format } => write!(f, "[\"Date\", \"{format}\"]"),
        }
    }
}

impl DtypeSpec {
    pub fn plain(name: impl Into<String>) -> Self {
        DtypeSpec::Plain(name.into())
    }

    pub fn date(format: impl Into<String>) -> Self {
        DtypeSpec::Date {
            format: format.into(),
        }
    }

    /// Build from a list value: exactly two items, the first a date keyword.
    pub fn from_list(items: &[String]) -> Result<Self> {
        match items {
            [keyword, format] if DATE_KEYWORDS.contains(&keyword.to_lowercase().as_str()) => {
                Ok(DtypeSpec::date(format.clone()))
            }
            _ => Err(Error::Config(format!(
                "invalid list dtype {items:?}: expected [\"Date\", \"<format>\"]"
            ))),
        }
    }

    pub fn date_format(&self) -> Option<&str> {
        match self {
            DtypeSpec::Date { format } => Some(format),
            DtypeSpec::Plain(_) => None,
        }
    }

    /// The logical column type this spec produces.
    pub fn to_data_type(&self) -> Result<DataType> {
        match self {
            DtypeSpec::Date { format } => Ok(date_type_for_format(format)),
            DtypeSpec::Plain(name) => parse_dtype_name(name),
        }
    }
}

/// Date-only formats become `Date32`; formats with a time of day become `Timestamp`.
pub fn date_type_for_format(format: &str) -> DataType {
    if TIME_DIRECTIVES.iter().any(|d| format.contains(d)) {
        DataType::Timestamp
    } else {
        DataType::Date32
    }
}

fn parse_dtype_name(name: &str) -> Result<DataType> {
    let dt = match name.trim() {
        "int" | "int64" | "Int64" | "i64" => DataType::Int64,
        "int32" | "Int32" | "i32" => DataType::Int32,
        "float" | "float64" | "Float64" | "f64" | "double" => DataType::Float64,
        "float32" | "Float32" | "f32" => DataType::Float32,
        "string" | "str" | "object" | "Utf8" => DataType::Utf8,
        "bool" | "boolean" | "Boolean" => DataType::Boolean,
        "bytes" | "binary" | "Binary" => DataType::Binary,
        "datetime64[ns]" | "datetime" | "Timestamp" => DataType::Timestamp,
        "date" | "Date32" => DataType::Date32,
        "category" => DataType::dictionary(DictKey::UInt32, DataType::Utf8),
        other => return Err(Error::UnknownDtype(other.to_string())),
    };
    Ok(dt)
}

/// Two-level conversion table keyed by `Type` and `Encoding_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtypeTable {
    #[serde(rename = "Type", default)]
    pub type_map: BTreeMap<String, DtypeSpec>,
    #[serde(rename = "Encoding_type", default)]
    pub encoding_map: BTreeMap<String, DtypeSpec>,
}

impl Default for DtypeTable {
    fn default() -> Self {
        let type_map = [
            ("Sequence", DtypeSpec::plain("int")),
            ("Integer", DtypeSpec::plain("float")),
            ("Continuous", DtypeSpec::plain("float")),
            ("Text", DtypeSpec::plain("string")),
            ("Date", DtypeSpec::date("%Y-%m-%d")),
            ("Time", DtypeSpec::date("%Y-%m-%d %H:%M:%S")),
            ("Compound", DtypeSpec::plain("string")),
            ("Curve", DtypeSpec::plain("string")),
        ];
        let encoding_map = [
            ("Integer", DtypeSpec::plain("float")),
            ("Real", DtypeSpec::plain("float")),
            ("ERROR", DtypeSpec::date("%Y-%m-%d")),
            ("String", DtypeSpec::plain("string")),
        ];
        Self {
            type_map: type_map
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            encoding_map: encoding_map
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Which half of a `DtypeTable` a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableSide {
    Type,
    EncodingType,
}

impl fmt::Display for TableSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSide::Type => f.write_str("Type"),
            TableSide::EncodingType => f.write_str("Encoding_type"),
        }
    }
}

impl DtypeTable {
    pub fn side(&self, side: TableSide) -> &BTreeMap<String, DtypeSpec> {
        match side {
            TableSide::Type => &self.type_map,
            TableSide::EncodingType => &self.encoding_map,
        }
    }

    pub fn side_mut(&mut self, side: TableSide) -> &mut BTreeMap<String, DtypeSpec> {
        match side {
            TableSide::Type => &mut self.type_map,
            TableSide::EncodingType => &mut self.encoding_map,
        }
    }

    pub fn lookup(&self, side: TableSide, key: &str) -> Result<&DtypeSpec> {
        self.side(side).get(key).ok_or_else(|| {
            Error::Config(format!(
                "The type {key} could not be translated to a dtype, because it was not present in dtype_dict.{side} ({:?})",
                self.side(side).keys().collect::<Vec<_>>()
            ))
        })
    }

    /// Keys on `side` whose spec is a date pair.
    pub fn date_keys(&self, side: TableSide) -> Vec<&str> {
        self.side(side)
            .iter()
            .filter(|(_, v)| v.date_format().is_some())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Check every entry maps to a known dtype.
    pub fn validate(&self) -> Result<()> {
        for side in [TableSide::Type, TableSide::EncodingType] {
            for (key, spec) in self.side(side) {
                spec.to_data_type()
                    .map_err(|e| e.with_context(format!("dtype_dict.{side}.{key}")))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_ukb_types() {
        let t = DtypeTable::default();
        assert_eq!(t.type_map["Sequence"], DtypeSpec::plain("int"));
        assert_eq!(t.type_map["Integer"], DtypeSpec::plain("float"));
        assert_eq!(t.type_map["Time"].date_format(), Some("%Y-%m-%d %H:%M:%S"));
        assert_eq!(t.encoding_map["ERROR"].date_format(), Some("%Y-%m-%d"));
        let mut keys = t.date_keys(TableSide::Type);
        keys.sort();
        assert_eq!(keys, vec!["Date", "Time"]);
        t.validate().unwrap();
    }

    #[test]
    fn parses_yaml_with_date_pairs() {
        let yaml = r#"
Type:
  Integer: int
  Date: [date, "%d/%m/%Y"]
Encoding_type:
  String: string
"#;
        let t: DtypeTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.type_map["Integer"], DtypeSpec::plain("int"));
        assert_eq!(t.type_map["Date"], DtypeSpec::date("%d/%m/%Y"));
        assert_eq!(t.encoding_map.len(), 1);
    }

    #[test]
    fn rejects_bad_list_dtype() {
        let yaml = "Type:\n  Date: [Time, \"%Y\", extra]\n";
        assert!(serde_yaml::from_str::<DtypeTable>(yaml).is_err());
        assert!(DtypeSpec::from_list(&["datetime".into(), "%Y".into()]).is_err());
    }

    #[test]
    fn date_format_picks_temporal_type() {
        assert_eq!(DtypeSpec::date("%Y-%m-%d").to_data_type().unwrap(), DataType::Date32);
        assert_eq!(
            DtypeSpec::date("%Y-%m-%d %H:%M:%S").to_data_type().unwrap(),
            DataType::Timestamp
        );
    }

    #[test]
    fn unknown_dtype_name_errors() {
        let err = DtypeSpec::plain("decimal(3)").to_data_type().unwrap_err();
        assert!(matches!(err, Error::UnknownDtype(_)));
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn missing_key_names_side() {
        let t = DtypeTable::default();
        let err = t.lookup(TableSide::EncodingType, "Date").unwrap_err();
        assert!(err.to_string().contains("Encoding_type"));
    }
}
