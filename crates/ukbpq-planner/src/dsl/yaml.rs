//! Multi-document YAML config files.
//!
//! Example:
//! ```yaml
//! small_subset:
//!   out_path: data/parquet/small
//!   nrows: 1000
//!   settings: { compression: zstd }
//! ---
//! full:
//!   out_path: data/parquet/full
//!   npartitions: 32
//!   force: true
//! ```
//!
//! Every document holds exactly one named configuration. A document named
//! `TEMPLATE` (any case) is documentation only and is skipped.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::{info, warn};

use ukbpq_core::config::{ConversionConfig, REQUIRED_FIELDS};

use crate::error::{Error, Result};
use crate::validate::check_output_dir;

pub const TEMPLATE_NAME: &str = "TEMPLATE";

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEntry {
    Valid(ConversionConfig),
    Invalid { reason: String },
}

/// Named configurations in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configs {
    pub entries: Vec<(String, ConfigEntry)>,
}

impl Configs {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }
}

pub fn read_config_file(path: &Path) -> Result<Configs> {
    let src = std::fs::read_to_string(path).map_err(|e| {
        Error::ConfigFile(format!("could not read config file {}: {e}", path.display()))
    })?;
    let configs = parse_config_documents(&src)?;
    info!(
        path = %path.display(),
        count = configs.len(),
        names = ?configs.names(),
        "finished processing the configuration file"
    );
    Ok(configs)
}

/// Parse every document of `src` into a named config entry.
pub fn parse_config_documents(src: &str) -> Result<Configs> {
    let mut configs = Configs::default();

    for doc in serde_yaml::Deserializer::from_str(src) {
        let value = Value::deserialize(doc)?;
        let mapping = match value {
            Value::Null => continue,
            Value::Mapping(m) => m,
            other => {
                return Err(Error::ConfigFile(format!(
                    "each configuration must be a mapping with a single top-level key, found {other:?}"
                )))
            }
        };

        if mapping.len() != 1 {
            let keys: Vec<String> = mapping.keys().map(key_to_string).collect();
            return Err(Error::ConfigFile(format!(
                "each configuration in the configuration file must contain a single top-level key, but found {} keys: {}",
                keys.len(),
                keys.join(", ")
            )));
        }
        let Some((key, body)) = mapping.into_iter().next() else {
            continue;
        };
        let name = key_to_string(&key);

        if configs.get(&name).is_some() {
            return Err(Error::ConfigFile(format!(
                "duplicate configuration name found: '{name}'. Please make sure each configuration in the YAML file has a unique name"
            )));
        }
        if name.eq_ignore_ascii_case(TEMPLATE_NAME) {
            continue;
        }

        let entry = parse_body(&name, body);
        configs.entries.push((name, entry));
    }

    if configs.is_empty() {
        return Err(Error::ConfigFile(
            "no configurations found in the given config file, please note the configuration called template (case-insensitive) will be ignored".into(),
        ));
    }
    Ok(configs)
}

fn parse_body(name: &str, body: Value) -> ConfigEntry {
    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| body.get(*field).is_none())
        .collect();
    if !missing.is_empty() {
        return ConfigEntry::Invalid {
            reason: format!(
                "required configuration key(s) {missing:?} not found in {name} configuration"
            ),
        };
    }
    match serde_yaml::from_value::<ConversionConfig>(body) {
        Ok(cfg) => ConfigEntry::Valid(cfg),
        Err(e) => ConfigEntry::Invalid {
            reason: format!("configuration {name} could not be read: {e}"),
        },
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Keep the configurations that can run.
///
/// A configuration is dropped (with a warning) when it failed to parse, when
/// its dtype table names an unknown dtype, or when its output directory is
/// unusable. Fails only when no configuration survives.
pub fn valid_configs(configs: Configs) -> Result<Vec<(String, ConversionConfig)>> {
    let total = configs.len();
    let mut failed: Vec<String> = Vec::new();
    let mut valid = Vec::with_capacity(total);

    for (i, (name, entry)) in configs.entries.into_iter().enumerate() {
        info!(index = i, config = %name, "checking configuration");
        let cfg = match entry {
            ConfigEntry::Invalid { reason } => {
                warn!(config = %name, "{reason}");
                failed.push(name);
                continue;
            }
            ConfigEntry::Valid(cfg) => cfg,
        };

        if let Err(e) = cfg.validate() {
            warn!(config = %name, error = %e, "invalid dtype_dict");
            failed.push(name);
            continue;
        }

        let problems = check_output_dir(&cfg.out_path, cfg.force);
        if !problems.is_empty() {
            for p in &problems {
                warn!(config = %name, "{p}");
            }
            failed.push(name);
            continue;
        }
        valid.push((name, cfg));
    }

    if failed.len() == total {
        return Err(Error::AllConfigsInvalid(failed.join(", ")));
    }
    if failed.is_empty() {
        info!("all configurations processed without issues");
    } else {
        warn!(
            invalid = ?failed,
            "processing completed with warnings, invalid configurations will be ignored"
        );
    }
    Ok(valid)
}
