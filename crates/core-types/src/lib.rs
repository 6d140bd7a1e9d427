//! Shared primitives for the jobcafe-e2e workspace.
//!
//! Everything here is deliberately small: newtype ids for the browser
//! session and the driven page, plus the [`Locator`] query type shared by
//! the adapter, the synchronizer and the suite fixtures.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for one browser session (one run of the suite).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for the page/tab driven by a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Raised when a locator fails structural validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("empty {0} expression")]
    Empty(&'static str),
}

/// An immutable query identifying zero or more nodes in the current
/// document. Constructed once by a fixture or a test step and never
/// mutated afterwards; cloning is the only way to reuse one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// Structural path expression evaluated with `document.evaluate`.
    XPath(String),

    /// CSS selector evaluated with `querySelectorAll`.
    Css(String),

    /// Visible text content (exact or substring match).
    Text { content: String, exact: bool },
}

impl Locator {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(content: impl Into<String>, exact: bool) -> Self {
        Self::Text {
            content: content.into(),
            exact,
        }
    }

    /// Reject structurally empty queries before they reach the page.
    pub fn validate(&self) -> Result<(), LocatorError> {
        match self {
            Locator::XPath(expr) if expr.trim().is_empty() => Err(LocatorError::Empty("xpath")),
            Locator::Css(selector) if selector.trim().is_empty() => Err(LocatorError::Empty("css")),
            Locator::Text { content, .. } if content.trim().is_empty() => {
                Err(LocatorError::Empty("text"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::XPath(expr) => write!(f, "xpath:{}", expr),
            Locator::Css(selector) => write!(f, "css:{}", selector),
            Locator::Text { content, exact } => {
                if *exact {
                    write!(f, "text:exact:'{}'", content)
                } else {
                    write!(f, "text:partial:'{}'", content)
                }
            }
        }
    }
}
