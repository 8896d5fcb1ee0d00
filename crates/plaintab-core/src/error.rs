//! Error types for plainTab core operations
//!
//! Three failure classes reach callers:
//! - host rejections of bookmark reads and writes
//! - persistence failures from the synced store
//! - invalid settings edits
//!
//! Malformed URLs during favicon derivation never surface as errors; they
//! resolve to "no favicon" instead.

use thiserror::Error;

use crate::host::HostError;
use crate::storage::StorageError;

/// Errors returned by core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The bookmark host refused an operation
    #[error("Bookmark host rejected {operation} of '{id}': {source}")]
    HostRejection {
        operation: &'static str,
        id: String,
        #[source]
        source: HostError,
    },

    /// Reading or writing the persistence backend failed
    #[error(transparent)]
    Persistence(#[from] StorageError),

    /// A settings edit named an unknown field or carried a value of the wrong type
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// The favicon override queue has shut down
    #[error("Favicon override queue is closed")]
    OverrideQueueClosed,
}

impl Error {
    pub(crate) fn host(operation: &'static str, id: &str, source: HostError) -> Self {
        Error::HostRejection {
            operation,
            id: id.to_string(),
            source,
        }
    }

    /// Whether the failure came from the bookmark host
    pub fn is_host_rejection(&self) -> bool {
        matches!(self, Error::HostRejection { .. })
    }

    /// Whether the failure came from the persistence backend
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_rejection_display() {
        let err = Error::host("update", "42", HostError::InvalidUrl("nope".to_string()));
        let msg = err.to_string();
        assert!(msg.contains("update"));
        assert!(msg.contains("'42'"));
        assert!(err.is_host_rejection());
        assert!(!err.is_persistence_failure());
    }

    #[test]
    fn test_persistence_is_transparent() {
        let err: Error = StorageError::Backend {
            key: "plaintab-settings".to_string(),
            message: "quota exceeded".to_string(),
        }
        .into();
        assert!(err.is_persistence_failure());
        assert!(err.to_string().contains("quota exceeded"));
    }
}
