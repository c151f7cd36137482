use thiserror::Error;

/// The four error kinds the checkpoint/rollback engine can surface.
///
/// `Io` is the public face of `IOFailed`: it carries the operating system's
/// error verbatim (including its raw error code, via `Error::os_code`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bow log format: {0}")]
    InvalidFormat(String),

    #[error("checksum mismatch replaying bow log entry (source sector {source})")]
    ChecksumMismatch { source: u64 },
}

impl Error {
    /// Construct an `IOFailed`-style error for a device that could not be opened.
    pub fn device_not_found(path: impl std::fmt::Display) -> Self {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("device '{path}' not found or cannot be opened"),
        ))
    }

    /// Surfaces the underlying OS error code, when this is an I/O failure.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Error::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
