//! Error types surfaced by the adapter.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level error categories surfaced by the adapter.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterErrorKind {
    #[error("navigation timed out")]
    NavTimeout,

    #[error("cdp i/o failure")]
    CdpIo,

    #[error("browser session closed")]
    SessionClosed,

    #[error("target element not found")]
    TargetNotFound,

    #[error("internal error")]
    Internal,
}

/// Enriched error metadata passed back to higher layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind) -> Self {
        Self {
            kind,
            hint: None,
            retriable: false,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }

    /// True when the underlying browser session is gone for good; callers
    /// must stop retrying once this is observed.
    pub fn is_session_closed(&self) -> bool {
        self.kind == AdapterErrorKind::SessionClosed
    }
}
