use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FleetError>;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Repository unavailable: {}: {reason}", path.display())]
    RepositoryUnavailable { path: PathBuf, reason: String },
    #[error("No shared history: {0}")]
    NoSharedHistory(String),
    #[error("Malformed configuration: {0}")]
    MalformedConfiguration(String),
    #[error("No attributed changes found in any repository")]
    EmptyResultSet,
    #[error("Record parse failure: {0}")]
    RecordParseFailure(String),
    #[error("Git command failed: {0}")]
    Git(String),
    #[error("Git open error: {0}")]
    GitOpen(#[from] Box<gix::open::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Invalid contributor pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::open::Error> for FleetError {
    fn from(err: gix::open::Error) -> Self {
        FleetError::GitOpen(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for FleetError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        FleetError::RefFind(Box::new(err))
    }
}

impl FleetError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FleetError::RepositoryUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Per-repository and per-record failures are skipped; everything else ends the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FleetError::RepositoryUnavailable { .. }
                | FleetError::NoSharedHistory(_)
                | FleetError::RecordParseFailure(_)
        )
    }
}
