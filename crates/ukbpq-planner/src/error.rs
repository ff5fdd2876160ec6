use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ukbpq_core::error::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config file: {0}")]
    ConfigFile(String),

    #[error("All configurations are invalid. Please check the provided settings ({0})")]
    AllConfigsInvalid(String),

    #[error("Some types found in the data dictionary are not present in dtype_dict: {0}")]
    MissingTypes(String),

    #[error("could not resolve dtype: {0}")]
    Unresolvable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Hints for fixing the configuration or dictionary.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Core(e) => e.suggestions(),
            Error::ConfigFile(msg) if msg.contains("top-level key") => vec![
                "Separate configurations with '---' and give each a single name".into(),
            ],
            Error::AllConfigsInvalid(_) => vec![
                "Check that out_path is set and its directory is writable".into(),
                "Set force: true to write into a non-empty directory".into(),
            ],
            Error::MissingTypes(_) => vec![
                "Add the missing types to dtype_dict.Type or dtype_dict.Encoding_type".into(),
            ],
            Error::InvalidArgument(_) => vec!["Arguments must be given as key=value".into()],
            _ => vec![],
        }
    }
}
