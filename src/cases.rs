//! The test cases, one async fn per site behavior under test.
//!
//! Every case leaves the form the way it found it (cleared), so cases
//! stay independent of execution order apart from the landing check.

use std::sync::Arc;

use dom_adapter::Session;
use element_sync::WaitParams;
use jobcafe_core_types::Locator;

use crate::fixtures;
use crate::steps::{StepError, Steps};

/// Per-case timing context, copied into every case closure.
#[derive(Clone, Copy, Debug)]
pub struct CaseCtx {
    pub wait: WaitParams,
    /// Longer deadline for the landing page render.
    pub landing_wait: WaitParams,
}

/// The logo and the "coming soon" image are visible on the landing page.
pub async fn logo_visible(session: Arc<Session>, ctx: CaseCtx) -> Result<(), StepError> {
    let steps = Steps::new(&session, ctx.landing_wait);
    steps.assert_visible(&fixtures::logo()).await?;
    steps.assert_visible(&fixtures::coming_soon()).await?;
    Ok(())
}

/// Navigating to the about page shows the CAFE logo text.
pub async fn about_page_opens(session: Arc<Session>, ctx: CaseCtx) -> Result<(), StepError> {
    let steps = Steps::new(&session, ctx.wait);
    steps.click(&fixtures::about_link()).await?;
    steps.assert_text(&fixtures::about_logo(), "CAFE").await
}

/// Fill one search field, submit, and check the field still carries the
/// input afterwards.
async fn field_search(
    session: &Session,
    ctx: CaseCtx,
    field: Locator,
    input: &str,
) -> Result<(), StepError> {
    let steps = Steps::new(session, ctx.wait);
    steps.click(&fixtures::job_page_link()).await?;
    steps.fill(&field, input).await?;
    steps.click(&fixtures::search_button()).await?;
    steps.assert_value(&field, input).await?;
    steps.clear(&field).await
}

pub async fn location_search(
    session: Arc<Session>,
    ctx: CaseCtx,
    input: &'static str,
) -> Result<(), StepError> {
    field_search(&session, ctx, fixtures::location_field(), input).await
}

pub async fn position_search(
    session: Arc<Session>,
    ctx: CaseCtx,
    input: &'static str,
) -> Result<(), StepError> {
    field_search(&session, ctx, fixtures::position_field(), input).await
}

pub async fn company_search(
    session: Arc<Session>,
    ctx: CaseCtx,
    input: &'static str,
) -> Result<(), StepError> {
    field_search(&session, ctx, fixtures::company_field(), input).await
}

/// Searching with all three fields filled yields a results count line.
pub async fn combined_search(session: Arc<Session>, ctx: CaseCtx) -> Result<(), StepError> {
    let steps = Steps::new(&session, ctx.wait);
    steps.click(&fixtures::job_page_link()).await?;

    steps.fill(&fixtures::position_field(), "Manager").await?;
    steps.fill(&fixtures::location_field(), "USA").await?;
    steps.fill(&fixtures::company_field(), "Apple").await?;
    steps.click(&fixtures::search_button()).await?;

    steps.assert_visible(&fixtures::results_probe()).await?;

    clear_search_form(&steps).await
}

/// A search matching no record renders the exact no-results banner.
pub async fn no_results_message(session: Arc<Session>, ctx: CaseCtx) -> Result<(), StepError> {
    let steps = Steps::new(&session, ctx.wait);
    steps.click(&fixtures::job_page_link()).await?;

    steps.fill(&fixtures::position_field(), "manager").await?;
    steps.fill(&fixtures::location_field(), "Russia").await?;
    steps.fill(&fixtures::company_field(), "Fusiom").await?;
    steps.click(&fixtures::search_button()).await?;

    steps
        .assert_text(&fixtures::no_results_banner(), "No results found!")
        .await?;

    clear_search_form(&steps).await
}

/// The reset control empties all three search fields.
pub async fn reset_clears_fields(session: Arc<Session>, ctx: CaseCtx) -> Result<(), StepError> {
    let steps = Steps::new(&session, ctx.wait);
    steps.click(&fixtures::job_page_link()).await?;

    steps.fill(&fixtures::position_field(), "manager").await?;
    steps.fill(&fixtures::location_field(), "Russia").await?;
    steps.fill(&fixtures::company_field(), "Fusiom").await?;
    steps.click(&fixtures::reset_button()).await?;

    steps
        .assert_value_empty(&fixtures::position_field())
        .await?;
    steps
        .assert_value_empty(&fixtures::location_field())
        .await?;
    steps.assert_value_empty(&fixtures::company_field()).await?;

    clear_search_form(&steps).await
}

async fn clear_search_form(steps: &Steps<'_>) -> Result<(), StepError> {
    steps.clear(&fixtures::position_field()).await?;
    steps.clear(&fixtures::location_field()).await?;
    steps.clear(&fixtures::company_field()).await
}
