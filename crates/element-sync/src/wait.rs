//! The polling wait loop.
//!
//! Rendering is asynchronous relative to the steps driving it; a fixed
//! polling wait with a monotonic deadline absorbs that without hardcoded
//! sleeps. Latency is bounded by the poll interval, the total wait by the
//! timeout, and a satisfied poll returns immediately.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, warn};

use dom_adapter::{AdapterError, AdapterErrorKind, Dom, ElementRef, Session};
use jobcafe_core_types::{Locator, PageId};

use crate::condition::Condition;
use crate::errors::SyncError;

/// Timing knobs for one wait. The defaults match the observed usage of
/// the suite (5s deadline, 250ms between polls).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitParams {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitParams {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl WaitParams {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Result<Self, SyncError> {
        let params = Self {
            timeout,
            poll_interval,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn from_millis(timeout_ms: u64, poll_ms: u64) -> Result<Self, SyncError> {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_ms),
        )
    }

    /// Enforce `timeout > poll_interval > 0`.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.poll_interval.is_zero() {
            return Err(SyncError::InvalidParams(
                "poll interval must be positive".to_string(),
            ));
        }
        if self.timeout <= self.poll_interval {
            return Err(SyncError::InvalidParams(format!(
                "timeout {:?} must exceed poll interval {:?}",
                self.timeout, self.poll_interval
            )));
        }
        Ok(())
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// A successfully synchronized element. Terminal: the outcome is never
/// re-polled; callers act on the element reference directly.
#[derive(Clone, Debug)]
pub struct SyncedElement {
    pub element: ElementRef,
    pub waited: Duration,
    pub polls: u32,
}

enum Poll {
    Satisfied(ElementRef),
    MatchedUnsatisfied,
    NoMatch,
}

/// Poll the live document until `condition` holds for the first node
/// matching `locator`, or the deadline elapses.
///
/// Outcomes:
/// - `Ok` as soon as a poll satisfies the condition, with the matched
///   element and how long it took;
/// - [`SyncError::NotFound`] when nothing ever matched the locator;
/// - [`SyncError::ConditionTimeout`] when node(s) matched but the
///   condition never held;
/// - [`SyncError::SessionLost`] immediately once the session is gone,
///   with no further polls;
/// - [`SyncError::Backend`] when the document query itself broke.
///
/// The routine never retries past its own polling: a returned failure is
/// final.
pub async fn wait_for(
    session: &Session,
    locator: &Locator,
    condition: &Condition,
    params: &WaitParams,
) -> Result<SyncedElement, SyncError> {
    params.validate()?;
    locator
        .validate()
        .map_err(|err| SyncError::InvalidParams(err.to_string()))?;

    let dom = session.dom();
    let page = session.page();
    let start = Instant::now();
    let deadline = start + params.timeout;
    let mut matched_once = false;
    let mut polls: u32 = 0;

    loop {
        if !session.is_alive() {
            warn!(target: "element-sync", %locator, "session lost mid-wait");
            return Err(SyncError::SessionLost {
                locator: locator.clone(),
            });
        }

        polls += 1;
        match poll_once(dom, page, locator, condition).await {
            Ok(Poll::Satisfied(element)) => {
                let waited = start.elapsed();
                debug!(target: "element-sync", %locator, %condition, ?waited, polls, "satisfied");
                return Ok(SyncedElement {
                    element,
                    waited,
                    polls,
                });
            }
            Ok(Poll::MatchedUnsatisfied) => matched_once = true,
            Ok(Poll::NoMatch) => {}
            Err(err) if err.is_session_closed() => {
                warn!(target: "element-sync", %locator, "session lost mid-wait");
                return Err(SyncError::SessionLost {
                    locator: locator.clone(),
                });
            }
            Err(err) => {
                return Err(SyncError::Backend {
                    locator: locator.clone(),
                    source: err,
                });
            }
        }

        let now = Instant::now();
        if now >= deadline {
            let waited = start.elapsed();
            warn!(target: "element-sync", %locator, %condition, ?waited, matched_once, "wait timed out");
            return Err(if matched_once {
                SyncError::ConditionTimeout {
                    locator: locator.clone(),
                    condition: condition.clone(),
                    timeout_ms: params.timeout_ms(),
                }
            } else {
                SyncError::NotFound {
                    locator: locator.clone(),
                    timeout_ms: params.timeout_ms(),
                }
            });
        }

        sleep(params.poll_interval.min(deadline - now)).await;
    }
}

async fn poll_once(
    dom: &dyn Dom,
    page: PageId,
    locator: &Locator,
    condition: &Condition,
) -> Result<Poll, AdapterError> {
    let matches = dom.find_all(page, locator).await?;
    let Some(first) = matches.into_iter().next() else {
        return Ok(Poll::NoMatch);
    };

    match condition.holds(dom, page, &first).await {
        Ok(true) => Ok(Poll::Satisfied(first)),
        Ok(false) => Ok(Poll::MatchedUnsatisfied),
        // The node vanished between the query and the check; for this
        // poll that is "matched, condition not held".
        Err(err) if err.kind == AdapterErrorKind::TargetNotFound => Ok(Poll::MatchedUnsatisfied),
        Err(err) => Err(err),
    }
}
