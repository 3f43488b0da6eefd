use thiserror::Error;

/// Classified failure raised while turning an uploaded file into complaint
/// records. Every variant is a client error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The filename does not end in `.json` or `.csv`.
    #[error("Only JSON or CSV files are supported")]
    UnsupportedFormat,

    #[error("Invalid JSON file: {0}")]
    InvalidJson(String),

    /// The JSON document is not a list of objects.
    #[error("Input file must contain a list of complaints")]
    InvalidSchema,

    #[error("Invalid CSV file: {0}")]
    InvalidCsv(String),

    #[error("CSV must contain a complaint text column (message, text, complaint or description)")]
    MissingTextColumn,

    #[error("No complaints found")]
    EmptyInput,

    #[error("File too large (max {max} complaints, got {count})")]
    TooLarge { count: usize, max: usize },

    /// Every record was dropped during cleaning.
    #[error("No valid complaint messages found")]
    NoValidMessages,
}

impl IngestError {
    /// Stable machine-readable code surfaced to HTTP callers.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::UnsupportedFormat => "UnsupportedFormat",
            IngestError::InvalidJson(_) => "InvalidJSON",
            IngestError::InvalidSchema => "InvalidSchema",
            IngestError::InvalidCsv(_) => "InvalidCsv",
            IngestError::MissingTextColumn => "MissingTextColumn",
            IngestError::EmptyInput => "EmptyInput",
            IngestError::TooLarge { .. } => "TooLarge",
            IngestError::NoValidMessages => "NoValidMessages",
        }
    }
}
