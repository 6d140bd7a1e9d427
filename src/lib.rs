//! Browser-driven end-to-end UI suite for the JobCafe job-listing site.
//!
//! One browser session is opened before the first case and torn down
//! after the last one, whatever the outcomes in between. Each case is a
//! sequence of synchronize-act-assert steps built on the `element-sync`
//! wait routine; the browser itself sits behind the `dom-adapter` crate.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use dom_adapter::Session;
use element_sync::SyncError;

pub mod cases;
pub mod config;
pub mod fixtures;
pub mod runner;
pub mod steps;

pub use config::SuiteConfig;
pub use runner::{CaseOutcome, CaseStatus, RunSummary, Suite};
pub use steps::{StepError, Steps};

use cases::CaseCtx;
use runner::{CaseFn, CaseFuture};

/// Declare the full JobCafe suite: the ranked landing check first, then
/// the navigation and search cases, with the parameterized searches
/// expanded over their input tables.
pub fn build_suite(config: &SuiteConfig) -> Result<Suite, SyncError> {
    let ctx = CaseCtx {
        wait: config.wait()?,
        landing_wait: config.landing_wait()?,
    };

    let mut suite = Suite::new();
    suite.ordered(1, "logo_visible", case_fn(ctx, cases::logo_visible));
    suite.case("about_page_opens", case_fn(ctx, cases::about_page_opens));
    suite.parameterized("location_search", fixtures::LOCATION_INPUTS, |input| {
        param_case_fn(ctx, cases::location_search, input)
    });
    suite.parameterized("position_search", fixtures::POSITION_INPUTS, |input| {
        param_case_fn(ctx, cases::position_search, input)
    });
    suite.parameterized("company_search", fixtures::COMPANY_INPUTS, |input| {
        param_case_fn(ctx, cases::company_search, input)
    });
    suite.case("combined_search", case_fn(ctx, cases::combined_search));
    suite.case("no_results_message", case_fn(ctx, cases::no_results_message));
    suite.case(
        "reset_clears_fields",
        case_fn(ctx, cases::reset_clears_fields),
    );
    Ok(suite)
}

/// Open the real browser session and run the suite against it.
pub async fn run_suite(config: &SuiteConfig) -> Result<RunSummary> {
    let session = Arc::new(Session::open(config.adapter_config(), &config.base_url).await?);
    run_suite_with_session(config, session).await
}

/// Run the suite against an already opened session. The session is
/// closed before returning, regardless of individual case outcomes.
pub async fn run_suite_with_session(
    config: &SuiteConfig,
    session: Arc<Session>,
) -> Result<RunSummary> {
    let suite = build_suite(config)?;
    info!(target: "jobcafe-e2e", cases = suite.names().len(), base_url = %config.base_url, "starting run");

    let summary = suite.run(session.clone(), config.filter.as_deref()).await;

    // Teardown must happen even when cases failed.
    session.close().await;
    Ok(summary)
}

fn case_fn<F, Fut>(ctx: CaseCtx, case: F) -> CaseFn
where
    F: Fn(Arc<Session>, CaseCtx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    Arc::new(move |session| -> CaseFuture { Box::pin(case(session, ctx)) })
}

fn param_case_fn<F, Fut>(ctx: CaseCtx, case: F, input: &'static str) -> CaseFn
where
    F: Fn(Arc<Session>, CaseCtx, &'static str) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    Arc::new(move |session| -> CaseFuture { Box::pin(case(session, ctx, input)) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_declares_every_case() {
        let suite = build_suite(&SuiteConfig::default()).expect("default config is valid");
        let names = suite.names();

        assert_eq!(names[0], "logo_visible");
        assert_eq!(names.len(), 16);
        assert!(names.contains(&"location_search[Toronto]"));
        assert!(names.contains(&"position_search[QA]"));
        assert!(names.contains(&"company_search[Google]"));
        assert!(names.contains(&"no_results_message"));
        assert!(names.contains(&"reset_clears_fields"));
    }
}
