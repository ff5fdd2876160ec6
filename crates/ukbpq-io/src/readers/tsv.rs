//! Streaming TSV reader → `RowBatch` of raw string cells.
//!
//! The export is decoded from its declared text encoding before parsing.
//! Some exports carry extra tab-separated fields on every data row (but not on
//! the header); `tab_offset` says where they are so they can be dropped:
//! a positive offset means that many extra leading fields, a negative offset
//! means that many extra trailing fields.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv as csv_crate;
use encoding_rs::Encoding;
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use tracing::{debug, info};

use ukbpq_core::types::{Column, RowBatch, Scalar};

use crate::error::{Error, Result};

/// Look up a WHATWG encoding label such as `windows-1252` or `utf-8`.
pub fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::UnknownEncoding(label.to_string()))
}

pub fn open_decoded(path: &Path, encoding: &str) -> Result<DecodeReaderBytes<File, Vec<u8>>> {
    let enc = lookup_encoding(encoding)?;
    let file = File::open(path)?;
    Ok(DecodeReaderBytesBuilder::new()
        .encoding(Some(enc))
        .build(file))
}

fn tsv_builder() -> csv_crate::ReaderBuilder {
    let mut b = csv_crate::ReaderBuilder::new();
    b.delimiter(b'\t').has_headers(true).flexible(true);
    b
}

/// Header names with surrounding whitespace removed from the line as a
/// whole: blank edge fields (a trailing tab) disappear, and the first and
/// last names lose their outer whitespace. Inner names are kept as-is.
fn strip_header<'a>(fields: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut names: Vec<String> = fields.map(str::to_string).collect();
    while names.last().is_some_and(|n| n.trim().is_empty()) {
        names.pop();
    }
    let blank = names.iter().take_while(|n| n.trim().is_empty()).count();
    names.drain(..blank);
    if let Some(first) = names.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(last) = names.last_mut() {
        *last = last.trim_end().to_string();
    }
    names
}

pub struct TsvReader<R: Read> {
    rdr: csv_crate::Reader<R>,
    header: Vec<String>,
    tab_offset: i64,
    record: csv_crate::StringRecord,
    rows_read: u64,
}

impl TsvReader<DecodeReaderBytes<File, Vec<u8>>> {
    pub fn from_path(path: &Path, encoding: &str, tab_offset: i64) -> Result<Self> {
        info!(path = %path.display(), encoding, "opening TSV export");
        Self::from_reader(open_decoded(path, encoding)?, tab_offset)
    }
}

impl<R: Read> TsvReader<R> {
    pub fn from_reader(reader: R, tab_offset: i64) -> Result<Self> {
        let mut rdr = tsv_builder().from_reader(reader);
        let header = strip_header(rdr.headers()?.iter());
        if header.is_empty() || header.iter().all(|h| h.is_empty()) {
            return Err(Error::Schema("TSV export has an empty header line".into()));
        }
        match tab_offset {
            0 => debug!("no offset: data rows align with the header"),
            n if n > 0 => debug!(offset = n, "dropping extra leading fields from data rows"),
            n => debug!(offset = n, "dropping extra trailing fields from data rows"),
        }
        Ok(Self {
            rdr,
            header,
            tab_offset,
            record: csv_crate::StringRecord::new(),
            rows_read: 0,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows returned so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Decoded bytes consumed so far, header included.
    pub fn bytes_read(&self) -> u64 {
        self.rdr.position().byte()
    }

    fn leading_skip(&self) -> usize {
        usize::try_from(self.tab_offset.max(0)).unwrap_or(0)
    }

    /// Read up to `limit_rows` rows into a `RowBatch`.
    pub fn next_batch(&mut self, limit_rows: usize) -> Result<Option<RowBatch>> {
        if limit_rows == 0 {
            return Ok(Some(RowBatch { columns: vec![] }));
        }

        let skip = self.leading_skip();
        let mut cols: Vec<Column> = self
            .header
            .iter()
            .map(|name| Column {
                name: name.clone(),
                values: Vec::with_capacity(limit_rows),
            })
            .collect();

        let mut read_rows = 0usize;
        while read_rows < limit_rows && self.rdr.read_record(&mut self.record)? {
            // Short rows are padded with nulls; surplus trailing fields are dropped.
            for (i, col) in cols.iter_mut().enumerate() {
                let v = self
                    .record
                    .get(skip + i)
                    .map(Scalar::from_field)
                    .unwrap_or(Scalar::Null);
                col.values.push(v);
            }
            read_rows += 1;
        }

        if read_rows == 0 {
            return Ok(None);
        }
        self.rows_read += read_rows as u64;
        Ok(Some(RowBatch { columns: cols }))
    }
}

/// Column names from the first line of the export.
pub fn read_header(path: &Path, encoding: &str) -> Result<Vec<String>> {
    let reader = TsvReader::from_path(path, encoding, 0)?;
    Ok(reader.header)
}

/// Number of data rows (header excluded).
pub fn count_rows(path: &Path, encoding: &str) -> Result<u64> {
    let mut rdr = tsv_builder().from_reader(open_decoded(path, encoding)?);
    let mut record = csv_crate::ByteRecord::new();
    let mut n = 0u64;
    while rdr.read_byte_record(&mut record)? {
        n += 1;
    }
    Ok(n)
}
