//! Workflow-level error taxonomy.
//!
//! Each layer has its own error type ([`BrowserError`], [`ExtractError`],
//! [`StoreError`]); [`ScrapeError`] wraps them together with the failures that
//! only make sense at the workflow level (step timeouts, state violations).

use crate::browser::BrowserError;
use crate::scrapers::extract::ExtractError;
use crate::scrapers::session::SessionState;
use crate::store::StoreError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A required readiness condition was not met within the deadline.
    #[error("timed out after {timeout:?} waiting for {step}")]
    StepTimeout {
        step: &'static str,
        timeout: Duration,
    },

    #[error("{operation} requires session state {expected:?}, but the session is {found:?}")]
    InvalidState {
        operation: &'static str,
        expected: SessionState,
        found: SessionState,
    },

    #[error("browser: {0}")]
    Browser(#[from] BrowserError),

    #[error("extraction: {0}")]
    Extract(#[from] ExtractError),

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("unknown keyword category `{0}`")]
    UnknownCategory(String),

    #[error("configuration: {0}")]
    Config(String),

    #[error("file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScrapeError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ScrapeError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Name of the workflow step that failed, when the failure is a timeout.
    pub fn failed_step(&self) -> Option<&'static str> {
        match self {
            ScrapeError::StepTimeout { step, .. } => Some(step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_timeout_names_step() {
        let err = ScrapeError::StepTimeout {
            step: "portal title",
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.failed_step(), Some("portal title"));
        assert!(err.to_string().contains("portal title"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ScrapeError::io(
            "/tmp/captures/x.html",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "file /tmp/captures/x.html: denied");
        assert_eq!(err.failed_step(), None);
    }

    #[test]
    fn test_other_errors_have_no_step() {
        let err = ScrapeError::UnknownCategory("weather".to_string());
        assert_eq!(err.failed_step(), None);
        assert_eq!(err.to_string(), "unknown keyword category `weather`");
    }
}
