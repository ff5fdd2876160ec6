//! Arrow type mapping for the logical schema.
//!
//! Only compiled with the `arrow` feature; array building lives in
//! `ukbpq-io::arrow_convert`.

use arrow_schema::{DataType as ArrowDataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};

use crate::schema::{DataType, DictKey, Schema};

/// Convert a logical `Schema` to an Arrow `Schema`.
pub fn schema_to_arrow(schema: &Schema) -> ArrowSchema {
    let fields: Vec<ArrowField> = schema
        .fields
        .iter()
        .map(|f| ArrowField::new(f.name.clone(), data_type_to_arrow(&f.data_type), f.nullable))
        .collect();
    ArrowSchema::new(fields)
}

/// Convert a logical `DataType` to an Arrow `DataType`.
pub fn data_type_to_arrow(dt: &DataType) -> ArrowDataType {
    match dt {
        DataType::Boolean => ArrowDataType::Boolean,
        DataType::Int32 => ArrowDataType::Int32,
        DataType::Int64 => ArrowDataType::Int64,
        DataType::Float32 => ArrowDataType::Float32,
        DataType::Float64 => ArrowDataType::Float64,
        DataType::Utf8 => ArrowDataType::Utf8,
        DataType::Binary => ArrowDataType::Binary,
        DataType::Date32 => ArrowDataType::Date32,
        DataType::Timestamp => ArrowDataType::Timestamp(TimeUnit::Second, None),
        DataType::Dictionary { key, value } => ArrowDataType::Dictionary(
            Box::new(dict_key_to_arrow(*key)),
            Box::new(data_type_to_arrow(value)),
        ),
    }
}

pub fn dict_key_to_arrow(key: DictKey) -> ArrowDataType {
    match key {
        DictKey::UInt8 => ArrowDataType::UInt8,
        DictKey::UInt16 => ArrowDataType::UInt16,
        DictKey::UInt32 => ArrowDataType::UInt32,
        DictKey::UInt64 => ArrowDataType::UInt64,
    }
}
