//! Reads written part files back, either as Arrow batches or as text
//! `RowBatch`es. An optional projection keeps only the named columns in the
//! given order.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::{Array, RecordBatch};
use arrow_cast::cast;
use arrow_schema::{DataType as ArrowDataType, Schema as ArrowSchema, SchemaRef};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::ProjectionMask;

use ukbpq_core::types::{Column, RowBatch, Scalar};

use crate::error::{Error, Result};
use crate::writers::parquet::part_index;

/// Streams one part file.
pub struct ParquetReader {
    reader: ParquetRecordBatchReader,
    schema: SchemaRef,
    batch_size: usize,
}

impl ParquetReader {
    /// Opens `path`. `projection` names the columns to keep; unknown names fail.
    pub fn from_path(path: &Path, projection: Option<Vec<String>>, batch_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let schema_ref = builder.schema().clone();
        let parquet_schema = builder.metadata().file_metadata().schema_descr_ptr();

        let projection_indices = projection
            .map(|cols| {
                cols.iter()
                    .map(|name| {
                        schema_ref.index_of(name).map_err(|_| {
                            Error::Schema(format!(
                                "column '{name}' not found in {}",
                                path.display()
                            ))
                        })
                    })
                    .collect::<Result<Vec<usize>>>()
            })
            .transpose()?;

        let builder = match &projection_indices {
            Some(indices) => {
                builder.with_projection(ProjectionMask::roots(&parquet_schema, indices.clone()))
            }
            None => builder,
        };
        let reader = builder.with_batch_size(batch_size).build()?;

        let schema = match &projection_indices {
            Some(indices) => Arc::new(ArrowSchema::new(
                indices
                    .iter()
                    .filter_map(|&i| schema_ref.fields().get(i).cloned())
                    .collect::<Vec<_>>(),
            )),
            None => schema_ref,
        };

        Ok(Self {
            reader,
            schema,
            batch_size,
        })
    }

    /// Next batch as Arrow data; `None` once every row has been read.
    pub fn next_record_batch(&mut self) -> Result<Option<RecordBatch>> {
        Ok(self.reader.next().transpose()?)
    }

    /// Next batch with each value cast to its text form.
    pub fn next_batch(&mut self) -> Result<Option<RowBatch>> {
        match self.next_record_batch()? {
            Some(rb) => Ok(Some(record_batch_to_text(&rb)?)),
            None => Ok(None),
        }
    }

    /// Arrow schema of the file (after projection).
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Every row of the file, in order.
    pub fn read_all(mut self) -> Result<Vec<RecordBatch>> {
        let mut out = Vec::new();
        while let Some(rb) = self.next_record_batch()? {
            out.push(rb);
        }
        Ok(out)
    }
}

/// Render every column as strings; dictionary columns are unpacked first.
pub fn record_batch_to_text(batch: &RecordBatch) -> Result<RowBatch> {
    let schema = batch.schema();
    let mut columns = Vec::with_capacity(batch.num_columns());
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let text = cast(array, &ArrowDataType::Utf8)?;
        let strings = text.as_string::<i32>();
        let values = (0..strings.len())
            .map(|i| {
                if strings.is_null(i) {
                    Scalar::Null
                } else {
                    Scalar::Str(strings.value(i).to_string())
                }
            })
            .collect();
        columns.push(Column {
            name: field.name().clone(),
            values,
        });
    }
    Ok(RowBatch { columns })
}

/// `part.<i>.parquet` files of a dataset directory, ordered by part index.
pub fn list_parts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut parts: Vec<(u64, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|p| part_index(&p).map(|i| (i, p)))
        .collect();
    parts.sort_by_key(|(i, _)| *i);
    Ok(parts.into_iter().map(|(_, p)| p).collect())
}
