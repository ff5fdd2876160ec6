//! Log file setup for the conversion commands.
//!
//! Each run writes one log file (truncated when it exists). The level comes
//! from `--log-level`; `RUST_LOG` directives are honored on top of it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, ValueEnum};
use thiserror::Error;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ROOT: &str = "logs/ukbpq";
const LOG_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Not able to create logfile {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("logging already initialized: {0}")]
    Init(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Directory for the log file [default: logs/ukbpq/<command>]
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log file name [default: <command>_<input>_<output>_<YYYY-MM-DD_HH:MM:SS>.log]
    #[arg(long)]
    pub log_file_name: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// `<command>_<input stem>_<target stem>_<timestamp>.log`
pub fn default_log_name(command: &str, input: &Path, target: &Path) -> String {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    format!(
        "{command}_{}_{}_{}.log",
        stem(input),
        stem(target),
        chrono::Local::now().format(LOG_TIME_FORMAT)
    )
}

pub fn log_path(args: &LogArgs, command: &str, default_name: String) -> PathBuf {
    let dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| Path::new(LOG_ROOT).join(command));
    dir.join(args.log_file_name.clone().unwrap_or(default_name))
}

/// Install the global subscriber writing to `path`.
pub fn init(path: &Path, level: LogLevel) -> Result<(), LoggingError> {
    let create = |source| LoggingError::Create {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(create)?;
    }
    let file = File::create(path).map_err(create)?;

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();
    let file_layer = fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    info!(path = %path.display(), level = ?level, "done setting up logging");
    Ok(())
}
