use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotesError {
    #[error("wallet not connected")]
    NotConnected,
    #[error("wallet connection failed: {0}")]
    ConnectionFailed(String),
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),
    #[error("a submission is already pending")]
    SubmissionPending,
    #[error("transaction confirmation failed: {0}")]
    ConfirmationFailed(String),
    #[error("note index {index} out of bounds for collection of {len}")]
    InvalidIndex { index: usize, len: usize },
    #[error("invalid account address '{0}'")]
    InvalidAddress(String),
    #[error("invalid entry function id '{0}'")]
    InvalidFunctionId(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl NotesError {
    /// Ledger-side rejection of a second `initialize_collection` for the same
    /// account. Move aborts surface this as `E_ALREADY_INITIALIZED` or
    /// `RESOURCE_ALREADY_EXISTS` in the vm status.
    pub fn is_already_initialized(&self) -> bool {
        let reason = match self {
            Self::SubmissionFailed(reason) | Self::ConfirmationFailed(reason) => reason,
            _ => return false,
        };
        let lower = reason.to_ascii_lowercase();
        lower.contains("already_initialized")
            || lower.contains("already initialized")
            || lower.contains("already_exists")
            || lower.contains("already exists")
    }
}
