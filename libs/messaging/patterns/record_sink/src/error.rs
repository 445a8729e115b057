use std::path::PathBuf;

/// Sink failures
///
/// A failed append loses that one record; the caller logs it and carries on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    /// Durable storage rejected the write
    #[error("Failed to append to {path}: {message}")]
    Write {
        path: PathBuf,
        kind: std::io::ErrorKind,
        message: String,
    },

    /// Header creation or file open failed
    #[error("Failed to open {path}: {message}")]
    Open {
        path: PathBuf,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Sink closed")]
    Closed,
}

impl SinkError {
    /// Create a write error from an I/O failure
    pub fn write(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        SinkError::Write {
            path: path.into(),
            kind: source.kind(),
            message: source.to_string(),
        }
    }

    /// Create an open error from an I/O failure
    pub fn open(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        SinkError::Open {
            path: path.into(),
            kind: source.kind(),
            message: source.to_string(),
        }
    }

    /// Check if the sink can no longer accept records
    pub fn is_closed(&self) -> bool {
        matches!(self, SinkError::Closed)
    }
}
