//! Multi-part Parquet dataset writer.
//!
//! A dataset is a directory of `part.<i>.parquet` files sharing one schema.
//! Writer behavior comes from the `settings` map of a configuration:
//! - `compression`: snappy, gzip, zstd, lz4, uncompressed/none
//! - `row_group_size`: maximum rows per row group
//! - `write_statistics`: column statistics in the footer
//! - `overwrite`: remove existing part files first
//! - `blocksize`: input bytes per part when no part count is given

use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use serde_yaml::Value;
use tracing::{debug, info};

use ukbpq_core::config::Settings;

use crate::error::{Error, Result};

pub const DEFAULT_ROW_GROUP_SIZE: usize = 1024 * 1024;
pub const DEFAULT_BLOCKSIZE: u64 = 64 * 1024 * 1024;

/// Compression codec for Parquet files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCompression {
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
    Zstd,
    Lz4,
}

impl ParquetCompression {
    fn to_parquet_compression(self) -> Compression {
        match self {
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip => Compression::GZIP(GzipLevel::default()),
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Lz4 => Compression::LZ4,
        }
    }
}

impl FromStr for ParquetCompression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snappy" => Ok(Self::Snappy),
            "gzip" => Ok(Self::Gzip),
            "zstd" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            "uncompressed" | "none" => Ok(Self::Uncompressed),
            other => Err(Error::Settings(format!("unknown compression '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterSettings {
    pub compression: ParquetCompression,
    pub row_group_size: usize,
    pub write_statistics: bool,
    pub overwrite: bool,
    pub blocksize: u64,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::default(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            write_statistics: true,
            overwrite: false,
            blocksize: DEFAULT_BLOCKSIZE,
        }
    }
}

impl WriterSettings {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut out = Self::default();
        for (key, value) in settings {
            match key.as_str() {
                "compression" => out.compression = setting_str(key, value)?.parse()?,
                "row_group_size" => {
                    let rows = setting_u64(key, value)?;
                    if rows == 0 {
                        return Err(Error::Settings("row_group_size must be positive".into()));
                    }
                    out.row_group_size = usize::try_from(rows)
                        .map_err(|_| Error::Settings(format!("row_group_size {rows} is too large")))?;
                }
                "write_statistics" => out.write_statistics = setting_bool(key, value)?,
                "overwrite" => out.overwrite = setting_bool(key, value)?,
                "blocksize" => out.blocksize = parse_blocksize(value)?,
                other => return Err(Error::Settings(format!("unknown setting '{other}'"))),
            }
        }
        Ok(out)
    }

    fn properties(&self) -> WriterProperties {
        let stats = if self.write_statistics {
            EnabledStatistics::Page
        } else {
            EnabledStatistics::None
        };
        WriterProperties::builder()
            .set_compression(self.compression.to_parquet_compression())
            .set_max_row_group_size(self.row_group_size)
            .set_statistics_enabled(stats)
            .build()
    }
}

fn setting_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::Settings(format!("{key} must be a string, got {value:?}")))
}

fn setting_u64(key: &str, value: &Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| Error::Settings(format!("{key} must be a non-negative integer, got {value:?}")))
}

fn setting_bool(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::Settings(format!("{key} must be true or false, got {value:?}")))
}

/// Byte count, either a plain integer or a string such as `64MiB` or `100MB`.
pub fn parse_blocksize(value: &Value) -> Result<u64> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let raw = setting_str("blocksize", value)?.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let n: u64 = digits
        .parse()
        .map_err(|_| Error::Settings(format!("blocksize '{raw}' does not start with a number")))?;
    let factor: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "kib" => 1 << 10,
        "mb" => 1_000_000,
        "mib" => 1 << 20,
        "gb" => 1_000_000_000,
        "gib" => 1 << 30,
        other => return Err(Error::Settings(format!("unknown blocksize unit '{other}'"))),
    };
    n.checked_mul(factor)
        .filter(|b| *b > 0)
        .ok_or_else(|| Error::Settings(format!("blocksize '{raw}' is out of range")))
}

pub fn part_file_name(index: u64) -> String {
    format!("part.{index}.parquet")
}

/// Part index of a `part.<i>.parquet` path.
pub fn part_index(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix("part.")?
        .strip_suffix(".parquet")?
        .parse()
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    pub path: PathBuf,
    pub rows: u64,
}

struct OpenPart {
    writer: ArrowWriter<File>,
    path: PathBuf,
    rows: u64,
}

/// Writes a sequence of part files into one directory.
pub struct ParquetPartWriter {
    dir: PathBuf,
    schema: SchemaRef,
    props: WriterProperties,
    next_index: u64,
    current: Option<OpenPart>,
    finished: Vec<PartInfo>,
}

impl ParquetPartWriter {
    /// Prepare `dir` for writing. With `overwrite`, existing part files are removed.
    pub fn new(dir: &Path, schema: SchemaRef, settings: &WriterSettings) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        if settings.overwrite {
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if part_index(&path).is_some() {
                    debug!(path = %path.display(), "removing existing part file");
                    std::fs::remove_file(&path)?;
                }
            }
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            schema,
            props: settings.properties(),
            next_index: 0,
            current: None,
            finished: Vec::new(),
        })
    }

    pub fn schema(&self) -> SchemaRef {
        SchemaRef::clone(&self.schema)
    }

    /// Open the next part file, closing the current one if any.
    pub fn start_part(&mut self) -> Result<()> {
        self.finish_part()?;
        let path = self.dir.join(part_file_name(self.next_index));
        let file = File::create(&path)?;
        let writer = ArrowWriter::try_new(file, self.schema(), Some(self.props.clone()))?;
        debug!(path = %path.display(), "opened part file");
        self.current = Some(OpenPart {
            writer,
            path,
            rows: 0,
        });
        self.next_index += 1;
        Ok(())
    }

    /// Append a batch to the open part, opening the first part on demand.
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        if self.current.is_none() {
            self.start_part()?;
        }
        let part = self
            .current
            .as_mut()
            .ok_or_else(|| Error::Other("no open part file".into()))?;
        part.writer.write(batch)?;
        part.rows += batch.num_rows() as u64;
        Ok(())
    }

    /// Close the open part, if any, and return what it holds.
    pub fn finish_part(&mut self) -> Result<Option<PartInfo>> {
        let Some(part) = self.current.take() else {
            return Ok(None);
        };
        part.writer.close()?;
        info!(path = %part.path.display(), rows = part.rows, "wrote part file");
        let info = PartInfo {
            path: part.path,
            rows: part.rows,
        };
        self.finished.push(info.clone());
        Ok(Some(info))
    }

    /// Close everything; returns all parts in write order.
    pub fn finish(mut self) -> Result<Vec<PartInfo>> {
        self.finish_part()?;
        Ok(self.finished)
    }
}
