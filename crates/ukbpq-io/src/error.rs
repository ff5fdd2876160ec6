use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error(transparent)]
    Core(#[from] ukbpq_core::error::Error),

    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),

    #[error("data dictionary error: {0}")]
    Dictionary(String),

    #[error("encoding table error: {0}")]
    EncodingTable(String),

    #[error("could not parse value {value:?} in column '{column}' at row {row} as {target}: {reason}")]
    Parse {
        column: String,
        row: u64,
        value: String,
        target: String,
        reason: String,
    },

    #[error("invalid writer setting: {0}")]
    Settings(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("other error: {0}")]
    Other(String),
}

impl Error {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Parse { reason, .. } if reason.contains("dictionary key") => vec![
                "Set encoding_dir so codes outside the encoding table become null".into(),
                "Lower max_categories to store this column with its Encoding_type dtype".into(),
            ],
            Error::Parse { target, .. } if target.starts_with("Date") || target.starts_with("Timestamp") => vec![
                "Check the date format in dtype_dict (e.g. [\"Date\", \"%Y-%m-%d\"])".into(),
            ],
            Error::Parse { .. } => vec![
                "Override the dtype for this type with --dtype-type or dtype_dict".into(),
                "Check tab_offset if values look shifted by one column".into(),
            ],
            Error::UnknownEncoding(_) => vec![
                "Use a WHATWG encoding label such as windows-1252, utf-8 or latin1".into(),
            ],
            Error::Settings(_) => vec![
                "Supported settings: compression, row_group_size, write_statistics, overwrite, blocksize".into(),
            ],
            Error::Core(e) => e.suggestions(),
            _ => vec![],
        }
    }
}
