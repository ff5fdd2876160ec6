use thiserror::Error;

/// Result alias used throughout `ukbpq-core`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Data dictionary error: {0}")]
    Dictionary(String),

    #[error("Unknown dtype '{0}'")]
    UnknownDtype(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    /// Wraps another error with a note on what was being done.
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use ukbpq_core::error::Error;
    /// let err = Error::Dictionary("UDI '31-0.0' not found".into());
    /// let err = err.with_context("while resolving column types");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// Hints shown to the user alongside the error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Dictionary(msg) => {
                if msg.contains("not found") || msg.contains("times") {
                    vec![
                        "Check that the data dictionary was generated for this export".into(),
                        "Every column in the TSV header needs exactly one dictionary row".into(),
                    ]
                } else {
                    vec![]
                }
            }
            Error::UnknownDtype(_) => vec![
                "Supported dtypes: int, int32, float, float32, string, bool, datetime64[ns], category".into(),
                "Date columns use a two element list: [\"Date\", \"%Y-%m-%d\"]".into(),
            ],
            Error::Config(msg) if msg.contains("dtype") => {
                vec!["Add the missing types to dtype_dict.Type or dtype_dict.Encoding_type".into()]
            }
            Error::Context { source, .. } => source
                .downcast_ref::<Error>()
                .map(Error::suggestions)
                .unwrap_or_default(),
            _ => vec![],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
