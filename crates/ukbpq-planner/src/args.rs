//! `key=value` overrides given on the command line.

use std::collections::BTreeSet;

use serde_yaml::Value;
use tracing::{info, warn};

use ukbpq_core::config::Settings;
use ukbpq_core::dtype::{DtypeSpec, DtypeTable, TableSide};

use crate::error::{Error, Result};

fn split_key_value(arg: &str) -> Option<(&str, &str)> {
    let mut parts = arg.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(k), Some(v), None) if !k.is_empty() => Some((k, v)),
        _ => None,
    }
}

/// Parse one dtype override value: a dtype name or a JSON list `["Date", "<fmt>"]`.
pub fn parse_dtype_value(value: &str) -> Result<DtypeSpec> {
    if value.starts_with('[') && value.ends_with(']') {
        let items: Vec<String> = serde_json::from_str(value).map_err(|e| {
            Error::InvalidArgument(format!("failed to parse value as JSON list: {value} ({e})"))
        })?;
        Ok(DtypeSpec::from_list(&items)?)
    } else {
        Ok(DtypeSpec::plain(value))
    }
}

/// Apply `key=value` dtype overrides to one side of `table`.
///
/// Malformed arguments are skipped with a warning; later duplicates win.
pub fn parse_dtype_overrides(args: &[String], table: &mut DtypeTable, side: TableSide) {
    let mut seen = BTreeSet::new();
    for arg in args {
        let parsed = split_key_value(arg)
            .ok_or_else(|| Error::InvalidArgument(format!("invalid dtype argument format: {arg}")))
            .and_then(|(k, v)| Ok((k, parse_dtype_value(v)?)));
        let (key, spec) = match parsed {
            Ok(kv) => kv,
            Err(e) => {
                warn!(argument = %arg, error = %e, "error parsing dtype argument");
                continue;
            }
        };
        if !seen.insert(key.to_string()) {
            warn!(key, "duplicated dtype found in given dtype arguments, make sure to specify each dtype once");
        }
        let map = table.side_mut(side);
        if map.contains_key(key) {
            info!(key, %side, "overwriting default dtype value");
        }
        info!(key, %side, dtype = %spec, "dtype_dict entry set");
        map.insert(key.to_string(), spec);
    }
}

/// Parse writer settings; every argument must be `key=value`.
///
/// Values are read as YAML scalars so `row_group_size=5000` arrives as a number.
pub fn parse_settings_args(args: &[String]) -> Result<Settings> {
    let mut settings = Settings::new();
    for arg in args {
        let (key, raw) = split_key_value(arg).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "could not split the settings option ({arg}) by '='. Make sure to give settings options in the format 'key=value', separated by whitespace"
            ))
        })?;
        let value = serde_yaml::from_str::<Value>(raw)
            .ok()
            .filter(|v| !matches!(v, Value::Mapping(_) | Value::Sequence(_) | Value::Null))
            .unwrap_or_else(|| Value::String(raw.to_string()));
        settings.insert(key.to_string(), value);
    }
    Ok(settings)
}
