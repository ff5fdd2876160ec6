//! Encoding (data-coding) tables and a bounded cache over them.
//!
//! Tables are read from `<dir>/encoding_table_<id>.txt`, the files served by
//! the showcase download page: a few lines of preamble, then a tab separated
//! table whose header starts with `coding`. Hierarchical encodings carry a
//! `selectable` column; only selectable codes may appear in the data.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use csv as csv_crate;
use tracing::{debug, info};

use ukbpq_core::plan::EncodingRef;

use crate::error::{Error, Result};

pub const DEFAULT_TABLE_LIMIT: usize = 100;
const SERVER_ERROR_MARKER: &str = "Sorry, internal error prevents download of coding";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingRow {
    pub code: String,
    pub meaning: Option<String>,
    pub selectable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingTable {
    pub id: String,
    pub rows: Vec<EncodingRow>,
}

impl EncodingTable {
    pub fn file_name(id: &str) -> String {
        format!("encoding_table_{id}.txt")
    }

    pub fn parse(id: &str, text: &str) -> Result<Self> {
        if text.contains(SERVER_ERROR_MARKER) {
            return Err(Error::EncodingTable(format!(
                "encoding table for encoding id {id} holds a server error instead of a table"
            )));
        }
        let start = header_offset(text).ok_or_else(|| {
            Error::EncodingTable(format!(
                "no header line starting with 'coding' in encoding table {id}"
            ))
        })?;

        let mut rdr = csv_crate::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_reader(text[start..].as_bytes());
        let headers = rdr.headers()?.clone();
        let pos = |name: &str| headers.iter().position(|h| h.trim() == name);
        let code_i = pos("coding").unwrap_or(0);
        let meaning_i = pos("meaning");
        let selectable_i = pos("selectable");

        let mut rows = Vec::new();
        for rec in rdr.records() {
            let rec = rec?;
            let Some(code) = rec.get(code_i).map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };
            rows.push(EncodingRow {
                code: code.to_string(),
                meaning: meaning_i.and_then(|i| rec.get(i)).map(str::to_string),
                selectable: selectable_i
                    .and_then(|i| rec.get(i))
                    .map(|s| s.trim().eq_ignore_ascii_case("Y")),
            });
        }
        Ok(Self {
            id: id.to_string(),
            rows,
        })
    }

    /// Codes that may appear in a column using this encoding.
    pub fn admissible_codes(&self, hierarchical: bool) -> AdmissibleCodes {
        AdmissibleCodes::new(
            self.rows
                .iter()
                .filter(|r| !hierarchical || r.selectable.unwrap_or(false))
                .map(|r| r.code.clone()),
        )
    }
}

fn header_offset(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_start_matches('\u{feff}').starts_with("coding") {
            return Some(offset + (line.len() - line.trim_start_matches('\u{feff}').len()));
        }
        offset += line.len();
    }
    None
}

/// Set of codes, matched as text or, for numeric codes, by value (`1` == `1.0`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissibleCodes {
    text: HashSet<String>,
    numeric: HashSet<u64>,
}

fn numeric_key(s: &str) -> Option<u64> {
    let v: f64 = s.trim().parse().ok()?;
    if v.is_nan() {
        return None;
    }
    // -0.0 and 0.0 are the same code.
    Some(if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
}

impl AdmissibleCodes {
    pub fn new(codes: impl IntoIterator<Item = String>) -> Self {
        let mut out = Self::default();
        for c in codes {
            if let Some(k) = numeric_key(&c) {
                out.numeric.insert(k);
            }
            out.text.insert(c);
        }
        out
    }

    pub fn contains(&self, value: &str) -> bool {
        self.text.contains(value) || numeric_key(value).is_some_and(|k| self.numeric.contains(&k))
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Least-recently-used cache of encoding tables loaded from one directory.
#[derive(Debug)]
pub struct EncodingCache {
    dir: PathBuf,
    limit: usize,
    tables: HashMap<String, EncodingTable>,
    /// Oldest first.
    order: VecDeque<String>,
}

impl EncodingCache {
    pub fn new(dir: impl Into<PathBuf>, limit: usize) -> Result<Self> {
        let mut cache = Self {
            dir: dir.into(),
            limit: DEFAULT_TABLE_LIMIT,
            tables: HashMap::new(),
            order: VecDeque::new(),
        };
        cache.set_limit(limit)?;
        Ok(cache)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(Error::EncodingTable(
                "encoding table limit must be a positive integer".into(),
            ));
        }
        self.limit = limit;
        self.evict();
        Ok(())
    }

    /// Cached ids, least recently used first.
    pub fn cached_ids(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    fn evict(&mut self) {
        while self.order.len() > self.limit {
            if let Some(old) = self.order.pop_front() {
                debug!(encoding_id = %old, "evicting encoding table from cache");
                self.tables.remove(&old);
            }
        }
    }

    fn touch(&mut self, id: &str) {
        if let Some(pos) = self.order.iter().position(|o| o == id) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    fn load(&self, id: &str) -> Result<EncodingTable> {
        let path = self.dir.join(EncodingTable::file_name(id));
        let bytes = std::fs::read(&path).map_err(|e| {
            Error::EncodingTable(format!(
                "no encoding table could be read for encoding id {id} ({}): {e}",
                path.display()
            ))
        })?;
        let table = EncodingTable::parse(id, &String::from_utf8_lossy(&bytes))?;
        info!(encoding_id = id, codes = table.rows.len(), "loaded encoding table");
        Ok(table)
    }

    pub fn get(&mut self, id: &str) -> Result<&EncodingTable> {
        if self.tables.contains_key(id) {
            self.touch(id);
        } else {
            let table = self.load(id)?;
            self.tables.insert(id.to_string(), table);
            self.order.push_back(id.to_string());
            self.evict();
        }
        self.tables.get(id).ok_or_else(|| {
            Error::EncodingTable(format!("encoding table {id} evicted immediately (limit {})", self.limit))
        })
    }

    pub fn admissible_codes(&mut self, encoding: &EncodingRef) -> Result<AdmissibleCodes> {
        Ok(self.get(&encoding.id)?.admissible_codes(encoding.hierarchical))
    }
}
