//! Conversion configuration (one named document of the YAML config file).
//!
//! Absent optional keys take the fallback values below; `out_path` is the only
//! required key and is checked by the planner before deserializing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::dtype::{
    default_categorical_types, DtypeTable, DEFAULT_ENCODING, DEFAULT_MAX_CATEGORIES,
};
use crate::error::Result;

/// Writer settings, forwarded verbatim to the Parquet part writer.
pub type Settings = BTreeMap<String, serde_yaml::Value>;

pub const REQUIRED_FIELDS: [&str; 1] = ["out_path"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    /// Directory that receives the Parquet parts.
    pub out_path: PathBuf,
    /// Keep only the first `nrows` data rows (0 keeps all).
    #[serde(default, deserialize_with = "null_as_default")]
    pub nrows: u64,
    /// Number of output parts (0 splits by input block size).
    #[serde(default, deserialize_with = "null_as_default")]
    pub npartitions: u64,
    /// Extra tabs per data row: positive at the start, negative at the end.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tab_offset: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub force: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dtype_dict: DtypeTable,
    #[serde(default = "default_max_categories", deserialize_with = "max_categories_or_default")]
    pub max_categories: u64,
    #[serde(default = "default_categorical_types", deserialize_with = "categorical_types_or_default")]
    pub categorical_type: Vec<String>,
    #[serde(default = "default_encoding", deserialize_with = "encoding_or_default")]
    pub encoding: String,
    /// Directory with `encoding_table_<id>.txt` files used to null out
    /// codes that are not part of a field's encoding.
    #[serde(default)]
    pub encoding_dir: Option<PathBuf>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub settings: Settings,
}

fn default_max_categories() -> u64 {
    DEFAULT_MAX_CATEGORIES
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

fn null_as_default<'de, D, T>(de: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn null_as<'de, D, T>(de: D, fallback: fn() -> T) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_else(fallback))
}

fn max_categories_or_default<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<u64, D::Error> {
    null_as(de, default_max_categories)
}

fn categorical_types_or_default<'de, D: Deserializer<'de>>(
    de: D,
) -> std::result::Result<Vec<String>, D::Error> {
    null_as(de, default_categorical_types)
}

fn encoding_or_default<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    null_as(de, default_encoding)
}

impl ConversionConfig {
    /// A config with every optional key at its fallback value.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            nrows: 0,
            npartitions: 0,
            tab_offset: 0,
            force: false,
            dtype_dict: DtypeTable::default(),
            max_categories: DEFAULT_MAX_CATEGORIES,
            categorical_type: default_categorical_types(),
            encoding: DEFAULT_ENCODING.to_string(),
            encoding_dir: None,
            settings: Settings::new(),
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Row cap, if any.
    pub fn row_limit(&self) -> Option<u64> {
        (self.nrows > 0).then_some(self.nrows)
    }

    /// Requested part count, if any.
    pub fn partitions(&self) -> Option<u64> {
        (self.npartitions > 0).then_some(self.npartitions)
    }

    pub fn is_categorical_type(&self, type_name: &str) -> bool {
        self.categorical_type.iter().any(|c| c == type_name)
    }

    pub fn validate(&self) -> Result<()> {
        self.dtype_dict.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallbacks_apply_to_absent_keys() {
        let cfg: ConversionConfig = serde_yaml::from_str("out_path: out/p1\n").unwrap();
        assert_eq!(cfg, ConversionConfig::new("out/p1"));
        assert_eq!(cfg.row_limit(), None);
        assert_eq!(cfg.partitions(), None);
        assert!(cfg.is_categorical_type("Categorical (multiple)"));
        assert_eq!(cfg.encoding, "windows-1252");
    }

    #[test]
    fn nulls_fall_back_too() {
        let yaml = "out_path: out\nnrows:\nnpartitions: ~\nsettings:\n";
        let cfg: ConversionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.nrows, 0);
        assert_eq!(cfg.npartitions, 0);
        assert!(cfg.settings.is_empty());
    }

    #[test]
    fn nulls_fall_back_for_every_optional_key() {
        let yaml = "out_path: out\nmax_categories: ~\ncategorical_type:\nencoding: ~\ndtype_dict: ~\ntab_offset: ~\nforce: ~\n";
        let cfg: ConversionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg, ConversionConfig::new("out"));
        assert_eq!(cfg.max_categories, DEFAULT_MAX_CATEGORIES);
        assert_eq!(cfg.encoding, DEFAULT_ENCODING);
    }

    #[test]
    fn explicit_values_are_kept() {
        let yaml = r#"
out_path: /data/parquet/small
nrows: 1000
npartitions: 4
tab_offset: -1
force: true
max_categories: 10
categorical_type: ["Categorical (single)"]
encoding: utf-8
settings:
  compression: zstd
  row_group_size: 5000
"#;
        let cfg: ConversionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.row_limit(), Some(1000));
        assert_eq!(cfg.partitions(), Some(4));
        assert_eq!(cfg.tab_offset, -1);
        assert!(cfg.force);
        assert!(!cfg.is_categorical_type("Categorical (multiple)"));
        assert_eq!(cfg.settings.len(), 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let yaml = "out_path: out\nn_rows: 5\n";
        assert!(serde_yaml::from_str::<ConversionConfig>(yaml).is_err());
    }
}
