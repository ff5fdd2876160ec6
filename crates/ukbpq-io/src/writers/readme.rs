//! `README.txt` describing how a Parquet directory was produced.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::error::Result;

pub const README_NAME: &str = "README.txt";
const CREATED_FORMAT: &str = "%Y-%m-%d (year-month-day) (%H:%M:%S)";

/// Write `README.txt` into `dir`. Failures are logged, never returned.
pub fn write_readme<C: Serialize>(dir: &Path, config: &C, description: Option<&str>) -> Option<PathBuf> {
    let path = dir.join(README_NAME);
    match try_write_readme(&path, config, description) {
        Ok(()) => {
            info!(path = %path.display(), "README file written");
            Some(path)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "error writing README file");
            None
        }
    }
}

fn try_write_readme<C: Serialize>(path: &Path, config: &C, description: Option<&str>) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    let now = chrono::Local::now().format(CREATED_FORMAT);

    let mut f = std::fs::File::create(path)?;
    writeln!(f, "PARQUET created with ukbpq {}\n", ukbpq_core::VERSION)?;
    writeln!(f, "Created on {now}\n")?;
    if let Some(d) = description.filter(|d| !d.trim().is_empty()) {
        writeln!(f, "Description:\n{d}\n")?;
    }
    writeln!(f, "The following configuration was used to create this directory of parquet files:")?;
    f.write_all(yaml.as_bytes())?;
    Ok(())
}
