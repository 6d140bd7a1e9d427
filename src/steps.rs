//! Act/assert steps over the synchronizer.
//!
//! Each step is "synchronize, act, assert": resolve the element through
//! [`element_sync::wait_for`], perform exactly one action on it, compare
//! observed state with the expectation. A mismatch is terminal for the
//! current case and is never retried.

use thiserror::Error;

use dom_adapter::{AdapterError, ElementRef, Session};
use element_sync::{wait_for, Condition, SyncError, WaitParams};
use jobcafe_core_types::Locator;

#[derive(Debug, Error)]
pub enum StepError {
    /// The synchronizer gave up: not found, wrong state, or session gone.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The action on an already resolved element failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Observed value differs from the expectation.
    #[error("assertion failed on {subject}: expected {expected:?}, observed {actual:?}")]
    Mismatch {
        subject: String,
        expected: String,
        actual: String,
    },
}

/// Step helpers bound to one session and one set of wait timings.
pub struct Steps<'a> {
    session: &'a Session,
    wait: WaitParams,
}

impl<'a> Steps<'a> {
    pub fn new(session: &'a Session, wait: WaitParams) -> Self {
        Self { session, wait }
    }

    async fn visible(&self, locator: &Locator) -> Result<ElementRef, StepError> {
        let synced = wait_for(self.session, locator, &Condition::Visible, &self.wait).await?;
        Ok(synced.element)
    }

    /// Wait until the element is visible; the wait itself is the assert.
    pub async fn assert_visible(&self, locator: &Locator) -> Result<(), StepError> {
        self.visible(locator).await.map(|_| ())
    }

    pub async fn click(&self, locator: &Locator) -> Result<(), StepError> {
        let element = self.visible(locator).await?;
        self.session
            .dom()
            .click(self.session.page(), &element)
            .await?;
        Ok(())
    }

    pub async fn fill(&self, locator: &Locator, text: &str) -> Result<(), StepError> {
        let element = self.visible(locator).await?;
        self.session
            .dom()
            .send_input(self.session.page(), &element, text)
            .await?;
        Ok(())
    }

    pub async fn clear(&self, locator: &Locator) -> Result<(), StepError> {
        let element = self.visible(locator).await?;
        self.session
            .dom()
            .clear(self.session.page(), &element)
            .await?;
        Ok(())
    }

    pub async fn value_of(&self, locator: &Locator) -> Result<String, StepError> {
        let element = self.visible(locator).await?;
        Ok(self
            .session
            .dom()
            .value(self.session.page(), &element)
            .await?)
    }

    pub async fn text_of(&self, locator: &Locator) -> Result<String, StepError> {
        let element = self.visible(locator).await?;
        Ok(self
            .session
            .dom()
            .text(self.session.page(), &element)
            .await?)
    }

    pub async fn assert_value(&self, locator: &Locator, expected: &str) -> Result<(), StepError> {
        let actual = self.value_of(locator).await?;
        if actual != expected {
            return Err(StepError::Mismatch {
                subject: locator.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    pub async fn assert_value_empty(&self, locator: &Locator) -> Result<(), StepError> {
        let actual = self.value_of(locator).await?;
        if !actual.is_empty() {
            return Err(StepError::Mismatch {
                subject: locator.to_string(),
                expected: String::new(),
                actual,
            });
        }
        Ok(())
    }

    /// Wait until the element's trimmed text equals `expected`.
    pub async fn assert_text(&self, locator: &Locator, expected: &str) -> Result<(), StepError> {
        wait_for(
            self.session,
            locator,
            &Condition::TextMatches(expected.to_string()),
            &self.wait,
        )
        .await?;
        Ok(())
    }
}
