//! The adapter proper: page registry, event pump, and the [`Dom`]
//! capability trait the synchronizer and suite steps are written against.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jobcafe_core_types::{Locator, PageId};

use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::js;
use crate::transport::{CommandTarget, DomTransport, TransportEvent};

/// Opaque reference to a located element, addressed by the token selector
/// the query tagged it with. Stays valid as long as the node itself
/// survives in the document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    selector: String,
}

impl ElementRef {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn for_token(token: &str) -> Self {
        Self::new(format!("[{}=\"{}\"]", js::HANDLE_ATTR, token))
    }
}

/// Read and act operations the browser control surface must provide.
///
/// Everything the suite knows about a page goes through this trait; the
/// integration tests substitute an in-memory document for the real
/// Chromium-backed implementation.
#[async_trait]
pub trait Dom: Send + Sync {
    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError>;

    /// All nodes currently matching `locator`, in document order. An empty
    /// result is not an error; not-found semantics belong to the caller.
    async fn find_all(&self, page: PageId, locator: &Locator)
        -> Result<Vec<ElementRef>, AdapterError>;

    async fn is_visible(&self, page: PageId, element: &ElementRef) -> Result<bool, AdapterError>;
    async fn is_clickable(&self, page: PageId, element: &ElementRef) -> Result<bool, AdapterError>;
    async fn text(&self, page: PageId, element: &ElementRef) -> Result<String, AdapterError>;
    async fn attribute(
        &self,
        page: PageId,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError>;

    /// Current `value` of a form control (empty string when unset).
    async fn value(&self, page: PageId, element: &ElementRef) -> Result<String, AdapterError>;

    async fn click(&self, page: PageId, element: &ElementRef) -> Result<(), AdapterError>;
    async fn send_input(
        &self,
        page: PageId,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), AdapterError>;
    async fn clear(&self, page: PageId, element: &ElementRef) -> Result<(), AdapterError>;

    /// Close the driven page and release the underlying connection.
    async fn close_page(&self, page: PageId) -> Result<(), AdapterError>;

    /// False once the browser connection is gone; every operation will
    /// fail with `SessionClosed` from then on.
    fn is_alive(&self) -> bool;
}

#[derive(Clone, Debug, Default)]
struct PageEntry {
    target_id: String,
    cdp_session: Option<String>,
    gone: bool,
}

/// Adapter implementation with pluggable transport.
pub struct DomAdapter {
    cfg: AdapterConfig,
    transport: Arc<dyn DomTransport>,
    pages: DashMap<PageId, PageEntry>,
    targets: DashMap<String, PageId>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    query_seq: AtomicU64,
}

impl DomAdapter {
    pub fn new(cfg: AdapterConfig, transport: Arc<dyn DomTransport>) -> Self {
        Self {
            cfg,
            transport,
            pages: DashMap::new(),
            targets: DashMap::new(),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            query_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.cfg
    }

    /// Start the transport and the event pump. Must be called once before
    /// any page is created.
    pub async fn start(self: Arc<Self>) -> Result<(), AdapterError> {
        self.transport.start().await?;
        let adapter = Arc::clone(&self);
        let pump = tokio::spawn(async move { adapter.event_loop().await });
        self.tasks.lock().await.push(pump);
        debug!(target: "dom-adapter", "event pump started");
        Ok(())
    }

    /// Stop the event pump. Idempotent.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let mut tasks = self.tasks.lock().await;
        while let Some(task) = tasks.pop() {
            task.abort();
            let _ = task.await;
        }
    }

    async fn event_loop(&self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = self.transport.next_event() => match event {
                    Some(event) => self.handle_transport_event(event),
                    None => break,
                },
            }
        }
        debug!(target: "dom-adapter", "event pump stopped");
    }

    fn handle_transport_event(&self, event: TransportEvent) {
        match event.method.as_str() {
            "Target.attachedToTarget" => {
                let session = event
                    .params
                    .get("sessionId")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let info = event.params.get("targetInfo");
                let target_id = info
                    .and_then(|v| v.get("targetId"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let kind = info
                    .and_then(|v| v.get("type"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();

                if kind != "page" {
                    return;
                }
                let (Some(session), Some(target_id)) = (session, target_id) else {
                    return;
                };

                let page = *self
                    .targets
                    .entry(target_id.clone())
                    .or_insert_with(PageId::new);
                let mut entry = self.pages.entry(page).or_default();
                entry.target_id = target_id;
                entry.cdp_session = Some(session);
                entry.gone = false;
                debug!(target: "dom-adapter", ?page, "page attached");
            }
            "Target.targetDestroyed" | "Target.targetCrashed" => {
                let Some(target_id) = event.params.get("targetId").and_then(|v| v.as_str()) else {
                    return;
                };
                if let Some(page) = self.targets.get(target_id).map(|entry| *entry.value()) {
                    if let Some(mut entry) = self.pages.get_mut(&page) {
                        entry.gone = true;
                    }
                    warn!(target: "dom-adapter", ?page, method = %event.method, "page target gone");
                }
            }
            _ => {}
        }
    }

    /// Open a new tab and wait for its CDP session to attach.
    pub async fn create_page(&self, url: &str) -> Result<PageId, AdapterError> {
        let response = self
            .transport
            .send_command(
                CommandTarget::Browser,
                "Target.createTarget",
                json!({ "url": url }),
            )
            .await?;
        let target_id = response
            .get("targetId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("createTarget missing targetId")
            })?
            .to_string();

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(entry) = self.targets.get(&target_id) {
                let page = *entry.value();
                if self
                    .pages
                    .get(&page)
                    .map(|ctx| ctx.cdp_session.is_some())
                    .unwrap_or(false)
                {
                    info!(target: "dom-adapter", ?page, "page created");
                    return Ok(page);
                }
            }

            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("timed out waiting for target attach"));
            }

            sleep(Duration::from_millis(50)).await;
        }
    }

    /// Apply fixed viewport metrics; headless Chromium has no OS window
    /// to maximize, so the viewport is pinned instead.
    pub async fn set_device_metrics(
        &self,
        page: PageId,
        width: u32,
        height: u32,
    ) -> Result<(), AdapterError> {
        self.send_page_command(
            page,
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1.0,
                "mobile": false,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn send_page_command(
        &self,
        page: PageId,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let (session, gone) = {
            let entry = self.pages.get(&page).ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::SessionClosed).with_hint("unknown page")
            })?;
            (entry.cdp_session.clone(), entry.gone)
        };

        if gone {
            return Err(
                AdapterError::new(AdapterErrorKind::SessionClosed).with_hint("page destroyed")
            );
        }
        let session = session.ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::SessionClosed).with_hint("page has no cdp session")
        })?;

        self.transport
            .send_command(CommandTarget::Session(session), method, params)
            .await
    }

    /// Evaluate an expression in the page and return its value.
    async fn evaluate(&self, page: PageId, expression: &str) -> Result<Value, AdapterError> {
        let response = self
            .send_page_command(
                page,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                    "userGesture": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            return Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("script raised exception: {details}")));
        }

        Ok(response
            .get("result")
            .and_then(|res| res.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Evaluate one of the `js` module snippets and unwrap its status
    /// envelope.
    async fn eval_status(&self, page: PageId, expression: &str) -> Result<Value, AdapterError> {
        let value = self.evaluate(page, expression).await?;
        match value.get("status").and_then(|v| v.as_str()) {
            Some("ok") => Ok(value),
            Some("missing") => Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint("element no longer in document")),
            Some("error") => {
                let message = value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown script error");
                Err(AdapterError::new(AdapterErrorKind::Internal).with_hint(message))
            }
            _ => Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint("script returned no status envelope")),
        }
    }

    async fn wait_dom_ready(&self, page: PageId, deadline: Instant) -> Result<(), AdapterError> {
        loop {
            let state = self.evaluate(page, &js::ready_state()).await?;
            if matches!(state.as_str(), Some("interactive") | Some("complete")) {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint("document never became ready"));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    fn next_query_prefix(&self) -> String {
        format!("q{}", self.query_seq.fetch_add(1, Ordering::Relaxed))
    }

    fn bool_value(value: &Value) -> Result<bool, AdapterError> {
        value
            .get("value")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("script returned no boolean value")
            })
    }
}

#[async_trait]
impl Dom for DomAdapter {
    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        info!(target: "dom-adapter", ?page, url, "navigating");
        self.send_page_command(page, "Page.navigate", json!({ "url": url }))
            .await?;
        let deadline_at = Instant::now() + deadline;
        self.wait_dom_ready(page, deadline_at).await
    }

    async fn find_all(
        &self,
        page: PageId,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, AdapterError> {
        let script = js::find_all(locator, &self.next_query_prefix());
        let value = self.eval_status(page, &script).await?;
        let tokens = value
            .get("tokens")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("find_all returned no token array")
            })?;

        Ok(tokens
            .iter()
            .filter_map(|token| token.as_str())
            .map(ElementRef::for_token)
            .collect())
    }

    async fn is_visible(&self, page: PageId, element: &ElementRef) -> Result<bool, AdapterError> {
        let value = self
            .eval_status(page, &js::is_visible(element.selector()))
            .await?;
        Self::bool_value(&value)
    }

    async fn is_clickable(&self, page: PageId, element: &ElementRef) -> Result<bool, AdapterError> {
        let value = self
            .eval_status(page, &js::is_clickable(element.selector()))
            .await?;
        Self::bool_value(&value)
    }

    async fn text(&self, page: PageId, element: &ElementRef) -> Result<String, AdapterError> {
        let value = self
            .eval_status(page, &js::text(element.selector()))
            .await?;
        Ok(value
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn attribute(
        &self,
        page: PageId,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        let value = self
            .eval_status(page, &js::attribute(element.selector(), name))
            .await?;
        Ok(value
            .get("value")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    async fn value(&self, page: PageId, element: &ElementRef) -> Result<String, AdapterError> {
        let value = self
            .eval_status(page, &js::value(element.selector()))
            .await?;
        Ok(value
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn click(&self, page: PageId, element: &ElementRef) -> Result<(), AdapterError> {
        debug!(target: "dom-adapter", selector = element.selector(), "click");
        self.eval_status(page, &js::click(element.selector()))
            .await
            .map(|_| ())
    }

    async fn send_input(
        &self,
        page: PageId,
        element: &ElementRef,
        text: &str,
    ) -> Result<(), AdapterError> {
        debug!(target: "dom-adapter", selector = element.selector(), "send_input");
        self.eval_status(page, &js::send_input(element.selector(), text))
            .await
            .map(|_| ())
    }

    async fn clear(&self, page: PageId, element: &ElementRef) -> Result<(), AdapterError> {
        self.eval_status(page, &js::clear(element.selector()))
            .await
            .map(|_| ())
    }

    async fn close_page(&self, page: PageId) -> Result<(), AdapterError> {
        let target_id = self
            .pages
            .get(&page)
            .map(|entry| entry.target_id.clone())
            .unwrap_or_default();

        let result = if target_id.is_empty() {
            Ok(Value::Null)
        } else {
            self.transport
                .send_command(
                    CommandTarget::Browser,
                    "Target.closeTarget",
                    json!({ "targetId": target_id }),
                )
                .await
        };

        if let Some(mut entry) = self.pages.get_mut(&page) {
            entry.gone = true;
        }

        // One page per run: closing it also stops the event pump.
        self.stop().await;
        result.map(|_| ())
    }

    fn is_alive(&self) -> bool {
        self.transport.is_alive() && !self.shutdown.is_cancelled()
    }
}
