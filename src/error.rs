use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Incorrect size: expected {expected} bytes (MIFARE Classic 1K), found {found} bytes")]
    SizeMismatch { expected: usize, found: usize },

    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    #[error("Invalid BCC: expected 0x{expected:02X}, found 0x{found:02X}")]
    ChecksumMismatch { expected: u8, found: u8 },

    #[error("Write configuration rejected: {0}")]
    ConfigurationRejected(String),

    #[error("Tag session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Block {block} verification failed: {reason}")]
    BlockVerificationFailed { block: usize, reason: String },

    #[error("Invalid block number: {0}")]
    InvalidBlockNumber(usize),

    #[error("Unexpected fault: {0}")]
    UnexpectedFault(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GuardError>;
