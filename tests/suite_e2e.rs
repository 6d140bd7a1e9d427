//! End-to-end runs of the declared suite against the in-memory site.

mod common;

use std::sync::Arc;

use common::FakeJobCafe;

use dom_adapter::Session;
use element_sync::WaitParams;
use jobcafe_core_types::PageId;
use jobcafe_e2e::runner::{CaseFn, CaseFuture, Suite};
use jobcafe_e2e::{fixtures, run_suite_with_session, CaseStatus, Steps, SuiteConfig};

fn fast_config() -> SuiteConfig {
    SuiteConfig {
        timeout_ms: 600,
        poll_ms: 40,
        landing_timeout_ms: 800,
        ..SuiteConfig::default()
    }
}

fn fake_session(site: &Arc<FakeJobCafe>) -> Arc<Session> {
    Arc::new(Session::attach(site.clone(), PageId::new()))
}

#[tokio::test]
async fn full_suite_passes_against_fake_site() {
    let site = FakeJobCafe::new();
    let session = fake_session(&site);

    let summary = run_suite_with_session(&fast_config(), session.clone())
        .await
        .expect("run completes");

    assert_eq!(summary.failed(), 0, "unexpected failures:\n{}", summary.render());
    assert_eq!(summary.passed(), 16);
    assert_eq!(summary.outcomes[0].name, "logo_visible");

    // Teardown ran even though nothing failed.
    assert!(!session.is_alive());
}

#[tokio::test]
async fn failing_case_aborts_only_itself_and_teardown_still_runs() {
    let site = FakeJobCafe::without_banner();
    let session = fake_session(&site);

    let summary = run_suite_with_session(&fast_config(), session.clone())
        .await
        .expect("run completes despite the failure");

    assert_eq!(summary.failed(), 1, "{}", summary.render());
    assert_eq!(summary.passed(), 15);

    let failed_at = summary
        .outcomes
        .iter()
        .position(|outcome| matches!(outcome.status, CaseStatus::Failed(_)))
        .expect("one failure");
    let failure = &summary.outcomes[failed_at];
    assert_eq!(failure.name, "no_results_message");

    // The failure names the locator so triage starts from the report.
    match &failure.status {
        CaseStatus::Failed(reason) => assert!(reason.contains("No results found!")),
        other => panic!("expected failure, got {other:?}"),
    }

    // Cases declared after the failing one still ran.
    assert!(summary
        .outcomes
        .iter()
        .skip(failed_at + 1)
        .any(|outcome| outcome.status == CaseStatus::Passed));

    assert!(!session.is_alive());
}

#[tokio::test]
async fn filter_runs_matching_cases_only() {
    let site = FakeJobCafe::new();
    let session = fake_session(&site);

    let config = SuiteConfig {
        filter: Some("reset".to_string()),
        ..fast_config()
    };
    let summary = run_suite_with_session(&config, session)
        .await
        .expect("filtered run");

    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.skipped(), 15);
}

#[tokio::test]
async fn panicking_case_is_contained() {
    let site = FakeJobCafe::new();
    let session = fake_session(&site);

    let boom: CaseFn = Arc::new(|_session| -> CaseFuture { Box::pin(async { panic!("kaboom") }) });
    let after: CaseFn = Arc::new(|_session| -> CaseFuture { Box::pin(async { Ok(()) }) });

    let mut suite = Suite::new();
    suite.case("boom", boom);
    suite.case("after", after);

    let summary = suite.run(session, None).await;

    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.passed(), 1);
    match &summary.outcomes[0].status {
        CaseStatus::Failed(reason) => assert!(reason.contains("kaboom")),
        other => panic!("expected panic failure, got {other:?}"),
    }
    assert_eq!(summary.outcomes[1].status, CaseStatus::Passed);
}

#[tokio::test]
async fn location_field_echoes_typed_input() {
    let site = FakeJobCafe::new();
    let session = fake_session(&site);
    let steps = Steps::new(&session, WaitParams::from_millis(600, 40).expect("params"));

    steps
        .click(&fixtures::job_page_link())
        .await
        .expect("open job page");
    steps
        .fill(&fixtures::location_field(), "Toronto")
        .await
        .expect("type location");

    let value = steps
        .value_of(&fixtures::location_field())
        .await
        .expect("read back");
    assert_eq!(value, "Toronto");
    assert_eq!(site.field("location"), "Toronto");
}

#[tokio::test]
async fn reset_case_leaves_all_fields_empty() {
    let site = FakeJobCafe::new();
    let session = fake_session(&site);

    let config = SuiteConfig {
        filter: Some("reset_clears_fields".to_string()),
        ..fast_config()
    };
    let summary = run_suite_with_session(&config, session)
        .await
        .expect("reset case run");

    assert_eq!(summary.passed(), 1, "{}", summary.render());
    for field in ["position", "location", "company"] {
        assert_eq!(site.field(field), "", "{field} should be empty after reset");
    }
}
