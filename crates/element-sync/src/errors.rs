//! Failure taxonomy for the synchronizer.
//!
//! "Never appeared" and "appeared but never reached the wanted state"
//! are distinct kinds, and each failure carries the locator and the
//! deadline it was held to.

use thiserror::Error;

use dom_adapter::AdapterError;
use jobcafe_core_types::Locator;

use crate::condition::Condition;

#[derive(Clone, Debug, Error)]
pub enum SyncError {
    /// No node ever matched the locator within the deadline.
    #[error("no element matched {locator} within {timeout_ms}ms")]
    NotFound { locator: Locator, timeout_ms: u64 },

    /// Node(s) matched, but the condition never held within the deadline.
    #[error("element matched {locator} but never became {condition} within {timeout_ms}ms")]
    ConditionTimeout {
        locator: Locator,
        condition: Condition,
        timeout_ms: u64,
    },

    /// The browser session went away mid-poll; no further polls were
    /// attempted.
    #[error("browser session lost while waiting for {locator}")]
    SessionLost { locator: Locator },

    /// The document query itself failed for a reason other than session
    /// loss. Not a timeout: infrastructure broke, so the wait aborts.
    #[error("document query failed for {locator}: {source}")]
    Backend {
        locator: Locator,
        source: AdapterError,
    },

    /// The caller violated the input contract.
    #[error("invalid wait parameters: {0}")]
    InvalidParams(String),
}

impl SyncError {
    /// True for the two deadline-shaped failures.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SyncError::NotFound { .. } | SyncError::ConditionTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_locator_and_deadline() {
        let locator = Locator::xpath("//button[@class ='search-butom']");

        let not_found = SyncError::NotFound {
            locator: locator.clone(),
            timeout_ms: 5000,
        };
        assert_eq!(
            not_found.to_string(),
            "no element matched xpath://button[@class ='search-butom'] within 5000ms"
        );
        assert!(not_found.is_timeout());

        let condition = SyncError::ConditionTimeout {
            locator: locator.clone(),
            condition: Condition::Clickable,
            timeout_ms: 7000,
        };
        assert!(condition.to_string().contains("never became clickable"));
        assert!(condition.is_timeout());

        let lost = SyncError::SessionLost { locator };
        assert!(!lost.is_timeout());
    }
}
