#![forbid(unsafe_code)]
//! ukbpq-planner: from config text and a data dictionary to column plans.
//!
//! - `dsl::yaml`: multi-document YAML configs, fallback values, validity.
//! - `validate`: output directory checks and missing dtype detection.
//! - `lower`: lowers dictionary entries to `ColumnPlan`s via the dtype table.
//! - `args`: `key=value` overrides from the command line.

pub mod args;
pub mod dsl;
pub mod error;
pub mod lower;
pub mod validate;

pub use args::{parse_dtype_overrides, parse_settings_args};
pub use dsl::yaml::{parse_config_documents, read_config_file, valid_configs, ConfigEntry, Configs};
pub use error::{Error, Result};
pub use lower::resolve_columns;
pub use validate::{check_output_dir, missing_types, DirProblem, MissingTypes};
