//! Part scheduling.
//!
//! The export is streamed once, front to back, so parts are always contiguous
//! row ranges. With a requested part count the ranges are near-equal row
//! counts; otherwise a new part starts every `blocksize` input bytes.

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionPlan {
    /// Exact row count of every part.
    Rows(Vec<u64>),
    /// Start a new part once this many input bytes went into the current one.
    Bytes(u64),
}

impl PartitionPlan {
    pub fn new(total_rows: u64, npartitions: Option<u64>, blocksize: u64) -> Self {
        match npartitions {
            Some(parts) => {
                if parts > total_rows.max(1) {
                    warn!(
                        requested = parts,
                        rows = total_rows,
                        "more partitions requested than rows available, using one row per partition"
                    );
                }
                PartitionPlan::Rows(even_row_counts(total_rows, parts))
            }
            None => PartitionPlan::Bytes(blocksize.max(1)),
        }
    }

    /// Number of parts, when known before reading.
    pub fn expected_parts(&self) -> Option<usize> {
        match self {
            PartitionPlan::Rows(counts) => Some(counts.len()),
            PartitionPlan::Bytes(_) => None,
        }
    }
}

/// Split `total` rows into `parts` contiguous counts differing by at most one.
///
/// Never yields an empty part unless there are no rows at all.
pub fn even_row_counts(total: u64, parts: u64) -> Vec<u64> {
    let parts = parts.clamp(1, total.max(1));
    let base = total / parts;
    let extra = total % parts;
    (0..parts).map(|i| base + u64::from(i < extra)).collect()
}

/// Position of the writer within a `PartitionPlan`.
#[derive(Debug, Clone)]
pub struct PartCursor {
    plan: PartitionPlan,
    part: usize,
    rows_in_part: u64,
    part_start_byte: u64,
    last_byte: u64,
}

impl PartCursor {
    /// `start_byte` is the reader position after the header.
    pub fn new(plan: PartitionPlan, start_byte: u64) -> Self {
        Self {
            plan,
            part: 0,
            rows_in_part: 0,
            part_start_byte: start_byte,
            last_byte: start_byte,
        }
    }

    pub fn part(&self) -> usize {
        self.part
    }

    /// Rows to request for the next batch so it does not cross a part boundary.
    pub fn rows_wanted(&self, batch_rows: usize) -> usize {
        match &self.plan {
            PartitionPlan::Rows(counts) => {
                let target = counts.get(self.part).copied().unwrap_or(0);
                let left = target.saturating_sub(self.rows_in_part);
                usize::try_from(left).unwrap_or(usize::MAX).min(batch_rows)
            }
            PartitionPlan::Bytes(_) => batch_rows,
        }
    }

    /// Account for a written batch; `byte_pos` is the reader position after it.
    pub fn record(&mut self, rows: u64, byte_pos: u64) {
        self.rows_in_part += rows;
        self.last_byte = byte_pos;
    }

    pub fn part_full(&self) -> bool {
        match &self.plan {
            PartitionPlan::Rows(counts) => counts
                .get(self.part)
                .map_or(true, |target| self.rows_in_part >= *target),
            PartitionPlan::Bytes(blocksize) => {
                self.last_byte.saturating_sub(self.part_start_byte) >= *blocksize
            }
        }
    }

    pub fn next_part(&mut self) {
        self.part += 1;
        self.rows_in_part = 0;
        self.part_start_byte = self.last_byte;
    }
}
