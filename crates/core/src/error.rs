/// Failures reported by an external register or tracked-table source.
///
/// Client crates map their transport errors and HTTP statuses onto these variants so the core
/// never depends on a particular HTTP stack.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("credentials rejected by {source_name}: {message}")]
    Unauthorised {
        source_name: &'static str,
        message: String,
    },
    #[error("{source_name} resource not found: {message}")]
    NotFound {
        source_name: &'static str,
        message: String,
    },
    #[error("{source_name} unavailable: {message}")]
    Unavailable {
        source_name: &'static str,
        message: String,
    },
    #[error("unexpected response from {source_name}: {message}")]
    Malformed {
        source_name: &'static str,
        message: String,
    },
}

impl SourceError {
    /// Classifies a non-success HTTP status returned by a source.
    ///
    /// 400 is treated as not found: both APIs answer a malformed worksheet range or database id
    /// with a validation error rather than a 404.
    pub fn from_status(source_name: &'static str, status: u16, message: String) -> Self {
        match status {
            400 | 404 => SourceError::NotFound {
                source_name,
                message,
            },
            401 | 403 => SourceError::Unauthorised {
                source_name,
                message,
            },
            408 | 429 | 500..=599 => SourceError::Unavailable {
                source_name,
                message,
            },
            _ => SourceError::Malformed {
                source_name,
                message: format!("HTTP {status}: {message}"),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{table} has no identifier column '{column}'")]
    MissingIdentifierColumn { table: String, column: String },
    #[error("{table} has duplicate column '{column}'")]
    DuplicateColumn { table: String, column: String },
    #[error("{table} has no header row")]
    MissingHeader { table: String },
    #[error("{table} row {row} has {cells} cells but only {columns} columns")]
    RaggedRow {
        table: String,
        row: usize,
        cells: usize,
        columns: usize,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to read or write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output is not valid UTF-8: {0}")]
    CsvEncoding(#[from] std::string::FromUtf8Error),
}

impl SyncError {
    /// True for failures caused by the shape of the fetched data rather than by the sources.
    pub fn is_data_shape(&self) -> bool {
        matches!(
            self,
            SyncError::MissingIdentifierColumn { .. }
                | SyncError::DuplicateColumn { .. }
                | SyncError::MissingHeader { .. }
                | SyncError::RaggedRow { .. }
        )
    }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
