//! Case registration and sequential execution.
//!
//! The declaration surface supports ordered cases, unordered cases and
//! parameterized expansion over a static input table. Execution is
//! strictly sequential against the single shared session; a failing (or
//! panicking) case aborts only itself.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use dom_adapter::Session;

use crate::steps::StepError;

pub type CaseFuture = Pin<Box<dyn Future<Output = Result<(), StepError>> + Send + 'static>>;
pub type CaseFn = Arc<dyn Fn(Arc<Session>) -> CaseFuture + Send + Sync>;

struct RegisteredCase {
    name: String,
    rank: Option<u32>,
    run: CaseFn,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed(String),
    Skipped,
}

#[derive(Clone, Debug)]
pub struct CaseOutcome {
    pub name: String,
    pub status: CaseStatus,
    pub elapsed: Duration,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<CaseOutcome>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.count(|status| matches!(status, CaseStatus::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, CaseStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, CaseStatus::Skipped))
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&CaseStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }

    /// Human-readable report, one line per case plus a tally.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            let elapsed =
                humantime::format_duration(Duration::from_millis(outcome.elapsed.as_millis() as u64));
            match &outcome.status {
                CaseStatus::Passed => {
                    out.push_str(&format!("PASS {} ({})\n", outcome.name, elapsed))
                }
                CaseStatus::Failed(reason) => {
                    out.push_str(&format!("FAIL {} ({}): {}\n", outcome.name, elapsed, reason))
                }
                CaseStatus::Skipped => out.push_str(&format!("SKIP {}\n", outcome.name)),
            }
        }
        out.push_str(&format!(
            "{} passed, {} failed, {} skipped\n",
            self.passed(),
            self.failed(),
            self.skipped()
        ));
        out
    }
}

/// The declared suite: an ordered list of named cases.
#[derive(Default)]
pub struct Suite {
    cases: Vec<RegisteredCase>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unordered case; unordered cases run in declaration
    /// order after every ranked one.
    pub fn case(&mut self, name: impl Into<String>, run: CaseFn) -> &mut Self {
        self.cases.push(RegisteredCase {
            name: name.into(),
            rank: None,
            run,
        });
        self
    }

    /// Register a case with an explicit rank; lower ranks run first.
    pub fn ordered(&mut self, rank: u32, name: impl Into<String>, run: CaseFn) -> &mut Self {
        self.cases.push(RegisteredCase {
            name: name.into(),
            rank: Some(rank),
            run,
        });
        self
    }

    /// Expand one case over a static input table, naming each instance
    /// `name[input]`.
    pub fn parameterized(
        &mut self,
        name: &str,
        inputs: &'static [&'static str],
        make: impl Fn(&'static str) -> CaseFn,
    ) -> &mut Self {
        for input in inputs {
            self.case(format!("{name}[{input}]"), make(input));
        }
        self
    }

    pub fn names(&self) -> Vec<&str> {
        let mut order = self.execution_order();
        order
            .drain(..)
            .map(|index| self.cases[index].name.as_str())
            .collect()
    }

    fn execution_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.cases.len()).collect();
        order.sort_by_key(|&index| (self.cases[index].rank.unwrap_or(u32::MAX), index));
        order
    }

    /// Drive every case sequentially against the shared session.
    ///
    /// Failures and panics are contained per case; the session is left
    /// open for the caller to tear down.
    pub async fn run(&self, session: Arc<Session>, filter: Option<&str>) -> RunSummary {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.cases.len());

        for index in self.execution_order() {
            let case = &self.cases[index];

            if let Some(needle) = filter {
                if !case.name.contains(needle) {
                    outcomes.push(CaseOutcome {
                        name: case.name.clone(),
                        status: CaseStatus::Skipped,
                        elapsed: Duration::ZERO,
                    });
                    continue;
                }
            }

            info!(target: "jobcafe-e2e", case = %case.name, "running case");
            let started = Instant::now();
            // Spawned so a panicking case body cannot take down the run.
            let result = tokio::spawn((case.run)(session.clone())).await;
            let elapsed = started.elapsed();

            let status = match result {
                Ok(Ok(())) => CaseStatus::Passed,
                Ok(Err(err)) => {
                    error!(target: "jobcafe-e2e", case = %case.name, %err, "case failed");
                    CaseStatus::Failed(err.to_string())
                }
                Err(join_err) => {
                    let reason = panic_message(join_err);
                    error!(target: "jobcafe-e2e", case = %case.name, reason = %reason, "case aborted");
                    CaseStatus::Failed(reason)
                }
            };

            outcomes.push(CaseOutcome {
                name: case.name.clone(),
                status,
                elapsed,
            });
        }

        RunSummary {
            started_at,
            outcomes,
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "opaque panic payload".to_string());
        format!("case panicked: {message}")
    } else {
        "case was cancelled".to_string()
    }
}
