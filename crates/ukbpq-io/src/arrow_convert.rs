//! Arrow conversion at the Parquet boundary.
//!
//! Turns a `RowBatch` of raw TSV cells into an Arrow `RecordBatch` following
//! one `ColumnPlan` per column. Categorical columns are packed into
//! dictionary arrays with the key width chosen by the planner.

use std::sync::Arc;

use arrow_array::builder::{BinaryDictionaryBuilder, PrimitiveDictionaryBuilder, StringDictionaryBuilder};
use arrow_array::types::{
    ArrowDictionaryKeyType, ArrowPrimitiveType, Date32Type, Float32Type, Float64Type, Int32Type,
    Int64Type, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow_array::{
    ArrayRef, BinaryArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, RecordBatch, StringArray, TimestampSecondArray,
};
use arrow_schema::SchemaRef;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use ukbpq_core::arrow::schema_to_arrow;
use ukbpq_core::plan::{plans_to_schema, ColumnPlan};
use ukbpq_core::schema::{DataType, DictKey};
use ukbpq_core::stats::SchemaStats;
use ukbpq_core::types::RowBatch;

use crate::error::{Error, Result};
use crate::readers::encoding::{AdmissibleCodes, EncodingCache};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Days from 0001-01-01 (CE) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const ISO_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Converts raw batches of one export into typed record batches.
#[derive(Debug)]
pub struct BatchConverter {
    plans: Vec<ColumnPlan>,
    schema: SchemaRef,
    admissible: Vec<Option<AdmissibleCodes>>,
}

impl BatchConverter {
    /// Build a converter for `plans`.
    ///
    /// With an encoding cache, categorical columns only keep codes listed in
    /// their encoding table. A table that cannot be loaded disables the
    /// check for that column.
    pub fn new(plans: Vec<ColumnPlan>, mut cache: Option<&mut EncodingCache>) -> Result<Self> {
        let schema = Arc::new(schema_to_arrow(&plans_to_schema(&plans)));
        let mut admissible = Vec::with_capacity(plans.len());
        for plan in &plans {
            let codes = match (plan.categories_from.as_ref(), cache.as_deref_mut()) {
                (Some(enc), Some(cache)) => match cache.admissible_codes(enc) {
                    Ok(codes) => Some(codes),
                    Err(e) => {
                        warn!(column = %plan.name, encoding_id = %enc.id, error = %e,
                            "encoding table unavailable, keeping all values of this column");
                        None
                    }
                },
                _ => None,
            };
            admissible.push(codes);
        }
        Ok(Self {
            plans,
            schema,
            admissible,
        })
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn plans(&self) -> &[ColumnPlan] {
        &self.plans
    }

    /// Convert one batch; `row_offset` is the number of data rows before it.
    pub fn convert(
        &self,
        batch: &RowBatch,
        row_offset: u64,
        stats: &mut SchemaStats,
    ) -> Result<RecordBatch> {
        if batch.columns.len() != self.plans.len() {
            return Err(Error::Schema(format!(
                "batch has {} columns but {} were planned",
                batch.columns.len(),
                self.plans.len()
            )));
        }

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.plans.len());
        for ((plan, column), codes) in self.plans.iter().zip(&batch.columns).zip(&self.admissible) {
            if plan.name != column.name {
                return Err(Error::Schema(format!(
                    "column '{}' found where '{}' was planned",
                    column.name, plan.name
                )));
            }

            let col_stats = stats.get_or_create(&plan.name);
            let mut rejected = 0u64;
            let cells: Vec<Option<&str>> = column
                .values
                .iter()
                .map(|v| {
                    col_stats.update(v);
                    match (v.as_str(), codes) {
                        (Some(s), Some(codes)) if !codes.contains(s) => {
                            rejected += 1;
                            None
                        }
                        (cell, _) => cell,
                    }
                })
                .collect();
            if rejected > 0 {
                col_stats.add_nulls(rejected);
                debug!(column = %plan.name, rejected, "values outside the field encoding set to null");
            }

            let ctx = CellContext {
                column: &plan.name,
                row_offset,
                date_format: plan.date_format.as_deref(),
            };
            arrays.push(build_array(&plan.data_type, &cells, &ctx)?);
        }

        Ok(RecordBatch::try_new(self.schema(), arrays)?)
    }
}

struct CellContext<'a> {
    column: &'a str,
    row_offset: u64,
    date_format: Option<&'a str>,
}

impl CellContext<'_> {
    fn parse_error(&self, idx: usize, value: &str, target: &DataType, reason: impl Into<String>) -> Error {
        Error::Parse {
            column: self.column.to_string(),
            row: self.row_offset + idx as u64 + 1,
            value: value.to_string(),
            target: format!("{target:?}"),
            reason: reason.into(),
        }
    }

    /// The dictionary key ran out of room: the column holds more distinct
    /// values than its declared member count allows.
    fn key_overflow(&self, idx: usize, value: &str, target: &DataType) -> Error {
        self.parse_error(
            idx,
            value,
            target,
            "more distinct values than the dictionary key can index",
        )
    }

    /// Parse every non-null cell with `parse`, attaching the cell position to failures.
    fn parse_all<T>(
        &self,
        cells: &[Option<&str>],
        target: &DataType,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Result<Vec<Option<T>>> {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                None => Ok(None),
                Some(s) => parse(s).map(Some).map_err(|r| self.parse_error(i, s, target, r)),
            })
            .collect()
    }
}

fn build_array(dt: &DataType, cells: &[Option<&str>], ctx: &CellContext<'_>) -> Result<ArrayRef> {
    let array: ArrayRef = match dt {
        DataType::Boolean => Arc::new(BooleanArray::from(ctx.parse_all(cells, dt, parse_bool)?)),
        DataType::Int32 => Arc::new(Int32Array::from(ctx.parse_all(cells, dt, parse_i32)?)),
        DataType::Int64 => Arc::new(Int64Array::from(ctx.parse_all(cells, dt, parse_i64)?)),
        DataType::Float32 => Arc::new(Float32Array::from(ctx.parse_all(cells, dt, parse_f32)?)),
        DataType::Float64 => Arc::new(Float64Array::from(ctx.parse_all(cells, dt, parse_f64)?)),
        DataType::Utf8 => Arc::new(StringArray::from(cells.to_vec())),
        DataType::Binary => Arc::new(BinaryArray::from_opt_vec(
            cells.iter().map(|c| c.map(str::as_bytes)).collect(),
        )),
        DataType::Date32 => {
            let fmt = ctx.date_format.unwrap_or(DEFAULT_DATE_FORMAT);
            Arc::new(Date32Array::from(ctx.parse_all(cells, dt, |s| parse_date32(s, fmt))?))
        }
        DataType::Timestamp => Arc::new(TimestampSecondArray::from(
            ctx.parse_all(cells, dt, |s| parse_timestamp(s, ctx.date_format))?,
        )),
        DataType::Dictionary { key, value } => match key {
            DictKey::UInt8 => dictionary_array::<UInt8Type>(value, cells, ctx)?,
            DictKey::UInt16 => dictionary_array::<UInt16Type>(value, cells, ctx)?,
            DictKey::UInt32 => dictionary_array::<UInt32Type>(value, cells, ctx)?,
            DictKey::UInt64 => dictionary_array::<UInt64Type>(value, cells, ctx)?,
        },
    };
    Ok(array)
}

fn dictionary_array<K: ArrowDictionaryKeyType>(
    value: &DataType,
    cells: &[Option<&str>],
    ctx: &CellContext<'_>,
) -> Result<ArrayRef> {
    let array: ArrayRef = match value {
        DataType::Utf8 => {
            let mut b = StringDictionaryBuilder::<K>::new();
            for (i, cell) in cells.iter().enumerate() {
                match cell {
                    Some(s) => {
                        b.append(s).map_err(|_| ctx.key_overflow(i, s, value))?;
                    }
                    None => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Binary => {
            let mut b = BinaryDictionaryBuilder::<K>::new();
            for (i, cell) in cells.iter().enumerate() {
                match cell {
                    Some(s) => {
                        b.append(s.as_bytes()).map_err(|_| ctx.key_overflow(i, s, value))?;
                    }
                    None => b.append_null(),
                }
            }
            Arc::new(b.finish())
        }
        DataType::Int32 => primitive_dictionary::<K, Int32Type>(cells, value, ctx, parse_i32)?,
        DataType::Int64 => primitive_dictionary::<K, Int64Type>(cells, value, ctx, parse_i64)?,
        DataType::Float32 => primitive_dictionary::<K, Float32Type>(cells, value, ctx, parse_f32)?,
        DataType::Float64 => primitive_dictionary::<K, Float64Type>(cells, value, ctx, parse_f64)?,
        DataType::Date32 => {
            let fmt = ctx.date_format.unwrap_or(DEFAULT_DATE_FORMAT);
            primitive_dictionary::<K, Date32Type>(cells, value, ctx, |s| parse_date32(s, fmt))?
        }
        DataType::Timestamp => primitive_dictionary::<K, TimestampSecondType>(cells, value, ctx, |s| {
            parse_timestamp(s, ctx.date_format)
        })?,
        other => {
            return Err(Error::Schema(format!(
                "column '{}': {other:?} values cannot be dictionary encoded",
                ctx.column
            )))
        }
    };
    Ok(array)
}

fn primitive_dictionary<K, V>(
    cells: &[Option<&str>],
    value: &DataType,
    ctx: &CellContext<'_>,
    parse: impl Fn(&str) -> std::result::Result<V::Native, String>,
) -> Result<ArrayRef>
where
    K: ArrowDictionaryKeyType,
    V: ArrowPrimitiveType,
{
    let parsed = ctx.parse_all(cells, value, parse)?;
    let mut b = PrimitiveDictionaryBuilder::<K, V>::new();
    for (i, (v, raw)) in parsed.into_iter().zip(cells).enumerate() {
        match v {
            Some(v) => {
                b.append(v)
                    .map_err(|_| ctx.key_overflow(i, raw.unwrap_or_default(), value))?;
            }
            None => b.append_null(),
        }
    }
    Ok(Arc::new(b.finish()))
}

fn parse_bool(s: &str) -> std::result::Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "t" => Ok(true),
        "false" | "0" | "no" | "n" | "f" => Ok(false),
        _ => Err("not a boolean".into()),
    }
}

/// Integers may be written as integral floats (`3.0`), as exports often do.
fn parse_i64(s: &str) -> std::result::Result<i64, String> {
    let t = s.trim();
    if let Ok(v) = t.parse::<i64>() {
        return Ok(v);
    }
    match t.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        Ok(_) => Err("not an integral value".into()),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_i32(s: &str) -> std::result::Result<i32, String> {
    let v = parse_i64(s)?;
    i32::try_from(v).map_err(|e| e.to_string())
}

fn parse_f64(s: &str) -> std::result::Result<f64, String> {
    s.trim().parse::<f64>().map_err(|e| e.to_string())
}

fn parse_f32(s: &str) -> std::result::Result<f32, String> {
    s.trim().parse::<f32>().map_err(|e| e.to_string())
}

fn parse_date32(s: &str, fmt: &str) -> std::result::Result<i32, String> {
    let date = NaiveDate::parse_from_str(s.trim(), fmt).map_err(|e| format!("{e} (format {fmt})"))?;
    Ok(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

fn parse_timestamp(s: &str, fmt: Option<&str>) -> std::result::Result<i64, String> {
    let t = s.trim();
    if let Some(fmt) = fmt {
        return NaiveDateTime::parse_from_str(t, fmt)
            .map(|dt| dt.and_utc().timestamp())
            .map_err(|e| format!("{e} (format {fmt})"));
    }
    for fmt in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(t, DEFAULT_DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| "not an ISO 8601 date or datetime".to_string())
}
