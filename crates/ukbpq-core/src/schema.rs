//! Logical schema types. Pure data; no Arrow dependency here.
//!
//! `ukbpq-io` maps these onto Arrow types when it builds record batches
//! (see `crate::arrow` behind the `arrow` feature).

use serde::{Deserialize, Serialize};

/// Key width of a dictionary-encoded (categorical) column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DictKey {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl DictKey {
    /// Smallest unsigned key width that can address `members` distinct values.
    pub fn for_members(members: u64) -> Self {
        if members <= 1 << 8 {
            DictKey::UInt8
        } else if members <= 1 << 16 {
            DictKey::UInt16
        } else if members <= 1 << 32 {
            DictKey::UInt32
        } else {
            DictKey::UInt64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
    /// Days since the epoch.
    Date32,
    /// Seconds since the epoch, no time zone.
    Timestamp,
    Dictionary {
        key: DictKey,
        value: Box<DataType>,
    },
}

impl DataType {
    pub fn dictionary(key: DictKey, value: DataType) -> Self {
        DataType::Dictionary {
            key,
            value: Box::new(value),
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, DataType::Dictionary { .. })
    }

    /// The type values are parsed into (the dictionary value type for categoricals).
    pub fn value_type(&self) -> &DataType {
        match self {
            DataType::Dictionary { value, .. } => value,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_key_width_follows_member_count() {
        assert_eq!(DictKey::for_members(1), DictKey::UInt8);
        assert_eq!(DictKey::for_members(5), DictKey::UInt8);
        assert_eq!(DictKey::for_members(256), DictKey::UInt8);
        assert_eq!(DictKey::for_members(257), DictKey::UInt16);
        assert_eq!(DictKey::for_members(65_536), DictKey::UInt16);
        assert_eq!(DictKey::for_members(65_537), DictKey::UInt32);
        assert_eq!(DictKey::for_members(u64::MAX), DictKey::UInt64);
    }

    #[test]
    fn value_type_unwraps_dictionary() {
        let dt = DataType::dictionary(DictKey::UInt8, DataType::Float64);
        assert!(dt.is_dictionary());
        assert_eq!(dt.value_type(), &DataType::Float64);
        assert_eq!(DataType::Utf8.value_type(), &DataType::Utf8);
    }
}
