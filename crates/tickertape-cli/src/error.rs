use thiserror::Error;

use tickertape_core::InteractorError;
use tickertape_store::StoreError;

/// CLI-level error categories mapped to exit codes.
///
/// Upstream failures are not errors here: they are recorded in the
/// envelope and reported with exit code 3.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickertape_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Serialization(_) => 4,
            Self::Store(_) => 7,
            Self::Io(_) => 10,
        }
    }
}

impl From<InteractorError> for CliError {
    fn from(error: InteractorError) -> Self {
        match error {
            InteractorError::Validation(error) => Self::Validation(error),
            InteractorError::Store(StoreError::InvalidData(message)) => Self::Command(message),
            InteractorError::Store(error) => Self::Store(error),
            other => Self::Command(other.to_string()),
        }
    }
}
