//! Runtime: run one conversion job and emit a `RunManifest`.
//!
//! Pipeline:
//! - Check the export is readable and every header column has exactly one
//!   data dictionary row.
//! - Check the dtype table covers the dictionary, then resolve column plans.
//! - Guard the output directory (`force`), parse writer settings.
//! - Count rows (bounded by `nrows`) and plan parts.
//! - Stream batches through the Arrow converter into part files.
//! - Write the README and return a manifest carrying the job hash.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use arrow_array::RecordBatch;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use ukbpq_core::config::ConversionConfig;
use ukbpq_core::dictionary::DataDictionary;
use ukbpq_core::hash::hash_serde;
use ukbpq_core::manifest::RunManifest;
use ukbpq_core::stats::SchemaStats;

use ukbpq_io::readers::encoding::DEFAULT_TABLE_LIMIT;
use ukbpq_io::{
    count_rows, read_dictionary, read_header, write_readme, BatchConverter, EncodingCache,
    ParquetPartWriter, TsvReader, WriterSettings,
};

use ukbpq_planner::{check_output_dir, missing_types, resolve_columns};

use crate::scheduler::{PartCursor, PartitionPlan};

/// Rows per streamed batch.
pub const DEFAULT_BATCH_ROWS: usize = 8192;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("File {0} doesn't exist or isn't readable")]
    Unreadable(PathBuf),
    #[error("output directory check failed: {0}")]
    OutputDir(String),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error(transparent)]
    Core(#[from] ukbpq_core::error::Error),
    #[error(transparent)]
    Io(#[from] ukbpq_io::Error),
    #[error(transparent)]
    Planner(#[from] ukbpq_planner::Error),
}

impl ExecError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExecError::Unreadable(_) => vec!["Check the path and file permissions".into()],
            ExecError::OutputDir(_) => vec![
                "Use --force (or force: true) to write into a non-empty directory".into(),
            ],
            ExecError::Core(e) => e.suggestions(),
            ExecError::Io(e) => e.suggestions(),
            ExecError::Planner(e) => e.suggestions(),
            ExecError::Hash(_) => vec![],
        }
    }
}

/// One export, one dictionary, one configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionJob {
    /// Config name, or the command that built the job.
    pub name: String,
    pub tsv: PathBuf,
    pub dictionary: PathBuf,
    pub config: ConversionConfig,
    #[serde(skip)]
    pub description: Option<String>,
}

impl ConversionJob {
    pub fn new(
        name: impl Into<String>,
        tsv: impl Into<PathBuf>,
        dictionary: impl Into<PathBuf>,
        config: ConversionConfig,
    ) -> Self {
        Self {
            name: name.into(),
            tsv: tsv.into(),
            dictionary: dictionary.into(),
            config,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// What the README records about a run.
#[derive(Serialize)]
struct ReadmeRecord<'a> {
    name: &'a str,
    ukb_file: &'a Path,
    data_dict: &'a Path,
    #[serde(flatten)]
    config: &'a ConversionConfig,
}

#[derive(Debug, Clone)]
pub struct Converter {
    batch_rows: usize,
    encoding_table_limit: usize,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            batch_rows: DEFAULT_BATCH_ROWS,
            encoding_table_limit: DEFAULT_TABLE_LIMIT,
        }
    }
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_rows(mut self, rows: usize) -> Self {
        self.batch_rows = rows.max(1);
        self
    }

    pub fn with_encoding_table_limit(mut self, limit: usize) -> Self {
        self.encoding_table_limit = limit;
        self
    }

    /// Load the job's dictionary and run it.
    pub fn run(&self, job: &ConversionJob) -> Result<RunManifest, ExecError> {
        let dict = load_dictionary(&job.dictionary)?;
        self.run_with_dictionary(job, &dict)
    }

    /// Run with an already loaded dictionary (shared across configurations).
    pub fn run_with_dictionary(
        &self,
        job: &ConversionJob,
        dict: &DataDictionary,
    ) -> Result<RunManifest, ExecError> {
        let started = now_millis();
        let cfg = &job.config;
        let job_hash = hash_serde(job).map_err(|e| ExecError::Hash(e.to_string()))?;
        info!(job = %job.name, tsv = %job.tsv.display(), out = %cfg.out_path().display(),
            hash = %job_hash, "starting conversion");

        check_readable(&job.tsv)?;
        cfg.validate()?;

        let header = read_header(&job.tsv, &cfg.encoding)?;
        check_header(&header, dict)?;
        info!(columns = header.len(), "retrieved column names");

        missing_types(&cfg.dtype_dict, dict, &cfg.categorical_type).into_result()?;
        let plans = resolve_columns(
            &header,
            dict,
            &cfg.dtype_dict,
            &cfg.categorical_type,
            cfg.max_categories,
        )?;

        let settings = WriterSettings::from_settings(&cfg.settings)?;
        prepare_output_dir(cfg.out_path(), cfg.force)?;

        let available = count_rows(&job.tsv, &cfg.encoding)?;
        let total_rows = cfg.row_limit().map_or(available, |n| n.min(available));
        if let Some(n) = cfg.row_limit() {
            info!(nrows = n, available, "keeping only the first rows");
        }
        let plan = PartitionPlan::new(total_rows, cfg.partitions(), settings.blocksize);
        info!(rows = total_rows, parts = ?plan.expected_parts(), blocksize = settings.blocksize,
            "planned partitions");

        let mut cache = cfg
            .encoding_dir
            .as_ref()
            .map(|dir| EncodingCache::new(dir, self.encoding_table_limit))
            .transpose()?;
        let converter = BatchConverter::new(plans, cache.as_mut())?;
        let mut writer = ParquetPartWriter::new(cfg.out_path(), converter.schema(), &settings)?;
        let mut reader = TsvReader::from_path(&job.tsv, &cfg.encoding, cfg.tab_offset)?;
        let mut cursor = PartCursor::new(plan, reader.bytes_read());
        let mut stats = SchemaStats::new();

        let mut rows_done = 0u64;
        let mut new_part_pending = false;
        while rows_done < total_rows {
            if new_part_pending {
                writer.start_part()?;
                cursor.next_part();
            }
            let left = usize::try_from(total_rows - rows_done).unwrap_or(usize::MAX);
            let want = cursor.rows_wanted(self.batch_rows).min(left);
            if want == 0 {
                break;
            }
            let Some(batch) = reader.next_batch(want)? else {
                break;
            };
            let record = converter.convert(&batch, rows_done, &mut stats)?;
            writer.write(&record)?;

            let rows = record.num_rows() as u64;
            rows_done += rows;
            cursor.record(rows, reader.bytes_read());
            debug!(part = cursor.part(), rows, rows_done, "batch written");
            new_part_pending = cursor.part_full();
        }

        if rows_done == 0 {
            // An empty dataset still carries its schema.
            writer.write(&RecordBatch::new_empty(converter.schema()))?;
        }

        let mut manifest = RunManifest::new(job_hash, started);
        for part in writer.finish()? {
            manifest.record_part(part.path, part.rows);
        }
        log_column_summary(&stats);

        let record = ReadmeRecord {
            name: &job.name,
            ukb_file: &job.tsv,
            data_dict: &job.dictionary,
            config: cfg,
        };
        write_readme(cfg.out_path(), &record, job.description.as_deref());

        let manifest = manifest.finish(now_millis());
        info!(job = %job.name, rows = manifest.rows_written, parts = manifest.parts.len(),
            duration_ms = manifest.duration_ms(), "conversion finished");
        Ok(manifest)
    }
}

pub fn load_dictionary(path: &Path) -> Result<DataDictionary, ExecError> {
    check_readable(path)?;
    Ok(read_dictionary(path)?)
}

fn check_readable(path: &Path) -> Result<(), ExecError> {
    if path.is_file() && std::fs::File::open(path).is_ok() {
        Ok(())
    } else {
        Err(ExecError::Unreadable(path.to_path_buf()))
    }
}

/// Every header column must have exactly one dictionary row.
fn check_header(header: &[String], dict: &DataDictionary) -> Result<(), ExecError> {
    for (i, name) in header.iter().enumerate() {
        dict.lookup(name)
            .map_err(|e| e.with_context(format!("column {i} ({name:?}) of the TSV header")))?;
    }
    Ok(())
}

fn prepare_output_dir(out: &Path, force: bool) -> Result<(), ExecError> {
    let problems = check_output_dir(out, force);
    if !problems.is_empty() {
        let msg = problems
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ExecError::OutputDir(msg));
    }
    if force && out.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
        info!(path = %out.display(), "directory not empty, forcing operation, files might be overwritten");
    }
    std::fs::create_dir_all(out).map_err(ukbpq_io::Error::from)?;
    Ok(())
}

fn log_column_summary(stats: &SchemaStats) {
    for (name, s) in &stats.column_stats {
        debug!(column = %name, values = s.total_count, nulls = s.null_count, "column summary");
    }
    let all_null: Vec<&str> = stats
        .column_stats
        .iter()
        .filter(|(_, s)| s.total_count > 0 && s.non_null_count() == 0)
        .map(|(n, _)| n.as_str())
        .collect();
    if !all_null.is_empty() {
        info!(columns = ?all_null, "columns without any value");
    }
}

// --- helpers ---

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
