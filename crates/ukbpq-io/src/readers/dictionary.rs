//! Data dictionary table reader.
//!
//! The dictionary is the main table of a `ukbconv ... docs` run saved as a
//! delimited file (`.csv` is comma separated, anything else tab separated)
//! with at least the columns `Column`, `UDI`, `Count`, `Type`, `Description`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv as csv_crate;
use encoding_rs_io::DecodeReaderBytesBuilder;
use tracing::info;

use ukbpq_core::dictionary::{DataDictionary, DictEntry};

use crate::error::{Error, Result};

pub const REQUIRED_COLUMNS: [&str; 5] = ["Column", "UDI", "Count", "Type", "Description"];

pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

pub fn read_dictionary(path: &Path) -> Result<DataDictionary> {
    let file = File::open(path).map_err(|e| {
        Error::Dictionary(format!(
            "could not open data dictionary {}: {e}",
            path.display()
        ))
    })?;
    // Strips a BOM if present; otherwise passes bytes through.
    let reader = DecodeReaderBytesBuilder::new().build(file);
    let dict = read_dictionary_from(reader, delimiter_for(path))?;
    info!(path = %path.display(), entries = dict.len(), "read data dictionary");
    Ok(dict)
}

pub fn read_dictionary_from<R: Read>(reader: R, delimiter: u8) -> Result<DataDictionary> {
    let mut rdr = csv_crate::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let idx = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h.trim() == name).ok_or_else(|| {
            Error::Dictionary(format!(
                "data dictionary is missing required column '{name}'. Available columns: {:?}",
                headers.iter().collect::<Vec<_>>()
            ))
        })
    };
    let [column_i, udi_i, count_i, type_i, desc_i] = [
        idx(REQUIRED_COLUMNS[0])?,
        idx(REQUIRED_COLUMNS[1])?,
        idx(REQUIRED_COLUMNS[2])?,
        idx(REQUIRED_COLUMNS[3])?,
        idx(REQUIRED_COLUMNS[4])?,
    ];

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let field = |i: usize| rec.get(i).map(str::trim).unwrap_or("");
        let udi = field(udi_i);
        if udi.is_empty() {
            continue;
        }
        entries.push(DictEntry::new(
            parse_count(field(column_i)),
            udi,
            parse_count(field(count_i)),
            field(type_i),
            field(desc_i),
        ));
    }

    if entries.is_empty() {
        return Err(Error::Dictionary("data dictionary contains no entries".into()));
    }
    Ok(DataDictionary::new(entries))
}

/// Counts may use thousands separators (`502,411`).
fn parse_count(raw: &str) -> Option<u64> {
    raw.replace(',', "").parse().ok()
}
