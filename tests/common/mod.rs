//! In-memory stand-in for the JobCafe site.
//!
//! Implements the `Dom` trait over a small mutable page model so the
//! whole suite can run without a browser: routes, the three search
//! fields, the search/reset controls, and a results area that renders
//! one poll late to exercise the synchronizer's wait loop.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dom_adapter::{AdapterError, AdapterErrorKind, Dom, ElementRef};
use jobcafe_core_types::{Locator, PageId};
use jobcafe_e2e::fixtures;

/// Polls of the results area before it "renders".
const RENDER_LAG: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    Home,
    Jobs,
    About,
}

#[derive(Clone, Debug)]
struct Search {
    position: String,
    location: String,
    company: String,
}

impl Search {
    fn matches_nothing(&self) -> bool {
        self.position == "manager" && self.location == "Russia" && self.company == "Fusiom"
    }

    fn results_text(&self) -> &'static str {
        if self.matches_nothing() {
            "No results found!"
        } else {
            "7 jobs found"
        }
    }
}

struct SiteState {
    route: Route,
    fields: BTreeMap<&'static str, String>,
    search: Option<Search>,
    polls_since_search: u32,
    banner_enabled: bool,
    alive: bool,
}

pub struct FakeJobCafe {
    state: Mutex<SiteState>,
}

impl FakeJobCafe {
    pub fn new() -> Arc<Self> {
        Self::with_banner(true)
    }

    /// Sabotaged variant: the no-results banner never renders, so the
    /// no-results case must time out.
    pub fn without_banner() -> Arc<Self> {
        Self::with_banner(false)
    }

    fn with_banner(banner_enabled: bool) -> Arc<Self> {
        let fields = BTreeMap::from([
            ("position", String::new()),
            ("location", String::new()),
            ("company", String::new()),
        ]);
        Arc::new(Self {
            state: Mutex::new(SiteState {
                route: Route::Home,
                fields,
                search: None,
                polls_since_search: 0,
                banner_enabled,
                alive: true,
            }),
        })
    }

    pub fn field(&self, name: &str) -> String {
        self.state
            .lock()
            .unwrap()
            .fields
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn guard(state: &SiteState) -> Result<(), AdapterError> {
        if state.alive {
            Ok(())
        } else {
            Err(AdapterError::new(AdapterErrorKind::SessionClosed).with_hint("fake site closed"))
        }
    }

    fn present(state: &SiteState, id: &str) -> bool {
        match id {
            "logo" | "coming-soon" => state.route == Route::Home,
            "job-link" | "about-link" => true,
            "position" | "location" | "company" | "search" | "reset" => state.route == Route::Jobs,
            "about-logo" => state.route == Route::About,
            "results-line" => {
                state.route == Route::Jobs
                    && state.search.is_some()
                    && state.polls_since_search >= RENDER_LAG
            }
            _ => false,
        }
    }

    fn results_line_text(state: &SiteState) -> &'static str {
        state
            .search
            .as_ref()
            .map(Search::results_text)
            .unwrap_or_default()
    }
}

#[async_trait]
impl Dom for FakeJobCafe {
    async fn navigate(
        &self,
        _page: PageId,
        _url: &str,
        _deadline: Duration,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap();
        Self::guard(&state)?;
        state.route = Route::Home;
        Ok(())
    }

    async fn find_all(
        &self,
        _page: PageId,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, AdapterError> {
        let mut state = self.state.lock().unwrap();
        Self::guard(&state)?;

        let Locator::XPath(expr) = locator else {
            return Ok(Vec::new());
        };

        let ids: Vec<&str> = match expr.as_str() {
            fixtures::LOGO => vec!["logo"],
            fixtures::COMING_SOON => vec!["coming-soon"],
            fixtures::JOB_PAGE => vec!["job-link"],
            fixtures::ABOUT_PAGE => vec!["about-link"],
            fixtures::POSITION_FIELD => vec!["position"],
            fixtures::LOCATION_FIELD => vec!["location"],
            fixtures::COMPANY_FIELD => vec!["company"],
            fixtures::SEARCH_BUTTON => vec!["search"],
            fixtures::RESET_BUTTON => vec!["reset"],
            fixtures::ABOUT_LOGO => vec!["about-logo"],
            fixtures::RESULTS_PROBE | fixtures::NO_RESULTS_BANNER => {
                if state.search.is_some() {
                    state.polls_since_search += 1;
                }
                let banner_only = expr == fixtures::NO_RESULTS_BANNER;
                let text_matches = Self::results_line_text(&state) == "No results found!";
                if banner_only && !(state.banner_enabled && text_matches) {
                    vec![]
                } else {
                    vec!["results-line"]
                }
            }
            _ => vec![],
        };

        Ok(ids
            .into_iter()
            .filter(|id| Self::present(&state, id))
            .map(ElementRef::new)
            .collect())
    }

    async fn is_visible(&self, _page: PageId, element: &ElementRef) -> Result<bool, AdapterError> {
        let state = self.state.lock().unwrap();
        Self::guard(&state)?;
        Ok(Self::present(&state, element.selector()))
    }

    async fn is_clickable(
        &self,
        page: PageId,
        element: &ElementRef,
    ) -> Result<bool, AdapterError> {
        self.is_visible(page, element).await
    }

    async fn text(&self, _page: PageId, element: &ElementRef) -> Result<String, AdapterError> {
        let state = self.state.lock().unwrap();
        Self::guard(&state)?;
        let text = match element.selector() {
            "about-logo" => "CAFE",
            "results-line" => Self::results_line_text(&state),
            "reset" => "reset",
            _ => "",
        };
        Ok(text.to_string())
    }

    async fn attribute(
        &self,
        _page: PageId,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        let state = self.state.lock().unwrap();
        Self::guard(&state)?;
        if name == "value" {
            return Ok(state.fields.get(element.selector()).cloned());
        }
        Ok(None)
    }

    async fn value(&self, _page: PageId, element: &ElementRef) -> Result<String, AdapterError> {
        let state = self.state.lock().unwrap();
        Self::guard(&state)?;
        Ok(state
            .fields
            .get(element.selector())
            .cloned()
            .unwrap_or_default())
    }

    async fn click(&self, _page: PageId, element: &ElementRef) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap();
        Self::guard(&state)?;
        match element.selector() {
            "job-link" => state.route = Route::Jobs,
            "about-link" => state.route = Route::About,
            "search" => {
                state.search = Some(Search {
                    position: state.fields["position"].clone(),
                    location: state.fields["location"].clone(),
                    company: state.fields["company"].clone(),
                });
                state.polls_since_search = 0;
            }
            "reset" => {
                for value in state.fields.values_mut() {
                    value.clear();
                }
            }
            other => {
                return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("nothing clickable at {other}")));
            }
        }
        Ok(())
    }

    async fn send_input(
        &self,
        _page: PageId,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap();
        Self::guard(&state)?;
        let id = element.selector().to_string();
        match state.fields.get_mut(id.as_str()) {
            Some(value) => {
                value.push_str(text);
                Ok(())
            }
            None => Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{id} is not an input"))),
        }
    }

    async fn clear(&self, _page: PageId, element: &ElementRef) -> Result<(), AdapterError> {
        let mut state = self.state.lock().unwrap();
        Self::guard(&state)?;
        let id = element.selector().to_string();
        match state.fields.get_mut(id.as_str()) {
            Some(value) => {
                value.clear();
                Ok(())
            }
            None => Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{id} is not an input"))),
        }
    }

    async fn close_page(&self, _page: PageId) -> Result<(), AdapterError> {
        self.state.lock().unwrap().alive = false;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.state.lock().unwrap().alive
    }
}
