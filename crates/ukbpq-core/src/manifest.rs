//! Record of one finished conversion.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::hash::Hash256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub started_ms: u64,
    pub finished_ms: u64,
    /// Hash of the `ConversionConfig` the run used.
    pub config_hash: Hash256,
    pub rows_written: u64,
    /// Part files in write order.
    pub parts: Vec<PathBuf>,
}

impl RunManifest {
    pub fn new(config_hash: Hash256, started_ms: u64) -> Self {
        Self {
            started_ms,
            finished_ms: started_ms,
            config_hash,
            rows_written: 0,
            parts: Vec::new(),
        }
    }

    pub fn record_part(&mut self, path: PathBuf, rows: u64) {
        self.parts.push(path);
        self.rows_written += rows;
    }

    pub fn finish(mut self, finished_ms: u64) -> Self {
        self.finished_ms = finished_ms.max(self.started_ms);
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms - self.started_ms
    }
}
