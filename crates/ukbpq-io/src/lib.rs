#![forbid(unsafe_code)]
//! ukbpq-io: file formats at the edges of a conversion.
//!
//! - `readers`: TSV export → `RowBatch` of raw cells, data dictionary tables,
//!   encoding tables, Parquet parts (for verification).
//! - `arrow_convert`: raw cells → typed Arrow arrays under a `ColumnPlan`.
//! - `writers`: multi-part Parquet output and the README that documents it.

pub mod arrow_convert;
pub mod error;
pub mod readers;
pub mod writers;

pub use arrow_convert::BatchConverter;
pub use error::{Error, Result};
pub use readers::dictionary::read_dictionary;
pub use readers::encoding::{AdmissibleCodes, EncodingCache, EncodingTable};
pub use readers::parquet::{list_parts, ParquetReader};
pub use readers::tsv::{count_rows, read_header, TsvReader};
pub use writers::parquet::{ParquetCompression, ParquetPartWriter, PartInfo, WriterSettings};
pub use writers::readme::write_readme;
