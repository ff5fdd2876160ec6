//! Bundled configuration template.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const TEMPLATE_YAML: &str = include_str!("../templates/TEMPLATE_config.yaml");

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Destination file ({0}) already exists")]
    Exists(PathBuf),
    #[error("could not write template to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write the template to `dest`; never overwrites.
pub fn write_template(dest: &Path) -> Result<(), TemplateError> {
    if dest.exists() {
        return Err(TemplateError::Exists(dest.to_path_buf()));
    }
    std::fs::write(dest, TEMPLATE_YAML).map_err(|source| TemplateError::Write {
        path: dest.to_path_buf(),
        source,
    })
}
