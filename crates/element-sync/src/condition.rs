//! Condition predicates evaluated against a located node.

use std::fmt;

use serde::{Deserialize, Serialize};

use dom_adapter::{AdapterError, Dom, ElementRef};
use jobcafe_core_types::PageId;

/// A predicate over a document snapshot, evaluated once per poll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// The locator matches at least one node.
    Exists,

    /// The first matching node is rendered and takes up space.
    Visible,

    /// The first matching node is visible, enabled and accepts pointer
    /// events.
    Clickable,

    /// The first matching node's trimmed text equals the expected string.
    TextMatches(String),
}

impl Condition {
    pub(crate) async fn holds(
        &self,
        dom: &dyn Dom,
        page: PageId,
        element: &ElementRef,
    ) -> Result<bool, AdapterError> {
        match self {
            Condition::Exists => Ok(true),
            Condition::Visible => dom.is_visible(page, element).await,
            Condition::Clickable => dom.is_clickable(page, element).await,
            Condition::TextMatches(expected) => {
                let text = dom.text(page, element).await?;
                Ok(text.trim() == expected.trim())
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Exists => write!(f, "present"),
            Condition::Visible => write!(f, "visible"),
            Condition::Clickable => write!(f, "clickable"),
            Condition::TextMatches(expected) => write!(f, "text '{}'", expected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_predicate() {
        assert_eq!(Condition::Exists.to_string(), "present");
        assert_eq!(Condition::Visible.to_string(), "visible");
        assert_eq!(Condition::Clickable.to_string(), "clickable");
        assert_eq!(
            Condition::TextMatches("No results found!".into()).to_string(),
            "text 'No results found!'"
        );
    }
}
