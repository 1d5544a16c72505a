use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Blockchain RPC error: {0}")]
    BlockchainRPC(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Game id unavailable after {attempts} attempts: {last_error}")]
    GameIdUnavailable { attempts: usize, last_error: String },

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BlockchainRPC(_) => "RPC_ERROR",
            AppError::Transaction(_) => "TRANSACTION_FAILED",
            AppError::GameIdUnavailable { .. } => "GAME_ID_UNAVAILABLE",
            AppError::Signer(_) => "SIGNER_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
        }
    }

    /// Read failures are retried by the next poll tick; everything else is
    /// reported once.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::BlockchainRPC(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::BlockchainRPC("x".into()).code(), "RPC_ERROR");
        assert_eq!(
            AppError::GameIdUnavailable {
                attempts: 5,
                last_error: "timeout".into()
            }
            .code(),
            "GAME_ID_UNAVAILABLE"
        );
    }

    #[test]
    fn only_rpc_errors_are_transient() {
        assert!(AppError::BlockchainRPC("429".into()).is_transient());
        assert!(!AppError::Signer("rejected".into()).is_transient());
    }
}
