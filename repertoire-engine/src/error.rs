//! Store status codes and error handling
//!
//! Every failure the store can report maps to a numeric status code. The
//! shell prints them, and the binary uses them as process exit codes when a
//! failure is fatal.

use thiserror::Error;

/// Store status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    /// I/O error occurred
    IoError = 1,
    /// Fewer bytes than one record width reached the backing file
    ShortWrite = 4,
    /// Backing file could be neither opened nor created
    CreateFailed = 5,
    /// Record layout is unusable (field width out of range)
    InvalidLayout = 6,
    /// Position lies outside the stored records
    InvalidPosition = 7,
    /// Record at the located position no longer carries the expected key
    KeyChanged = 8,
}

impl StatusCode {
    /// Get the raw status code value
    pub fn as_raw(&self) -> u16 {
        *self as u16
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_raw(), match self {
            StatusCode::IoError => "I/O error",
            StatusCode::ShortWrite => "Short write",
            StatusCode::CreateFailed => "Cannot open or create data file",
            StatusCode::InvalidLayout => "Invalid record layout",
            StatusCode::InvalidPosition => "Invalid record position",
            StatusCode::KeyChanged => "Record key changed under update",
        })
    }
}

/// Main error type for the Repertoire engine
#[derive(Error, Debug)]
pub enum RepertoireError {
    #[error("Store status {0}")]
    Status(StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

impl RepertoireError {
    /// Get the status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RepertoireError::Status(code) => *code,
            RepertoireError::Io(_) => StatusCode::IoError,
            RepertoireError::InvalidFormat(_) => StatusCode::InvalidLayout,
        }
    }
}

impl From<StatusCode> for RepertoireError {
    fn from(code: StatusCode) -> Self {
        RepertoireError::Status(code)
    }
}

/// Result type for store operations
pub type RepertoireResult<T> = Result<T, RepertoireError>;
