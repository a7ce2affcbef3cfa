use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while configuring or feeding the chunker.
///
/// Every variant except [`ChunkerError::Input`] is a configuration error: it
/// can only surface from [`crate::Chunker::new`] or one of the loaders, before
/// any file is processed.
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A catalog or grammar pattern failed to compile
    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Config or catalog file is not valid TOML for its schema
    #[error("Failed to parse TOML: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// File content is not valid for its declared encoding
    #[error(transparent)]
    Input(#[from] InputError),
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Whether this error belongs to the fatal, startup-time category
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        !matches!(self, Self::Input(_) | Self::IoError(_))
    }
}

/// Content that is not valid UTF-8.
///
/// Never fatal: the file degrades to a single whole-file chunk classified
/// `None` and the error is recorded on the analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: content is not valid UTF-8 (valid up to byte {valid_up_to})")]
pub struct InputError {
    pub path: String,
    pub valid_up_to: usize,
}
