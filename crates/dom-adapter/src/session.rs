//! Run-scoped browser session handle.
//!
//! One `Session` is opened before the first test case and closed after
//! the last one; every step borrows it, nothing owns it globally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use jobcafe_core_types::{PageId, SessionId};

use crate::adapter::{Dom, DomAdapter};
use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::transport::ChromiumTransport;

pub struct Session {
    id: SessionId,
    dom: Arc<dyn Dom>,
    page: PageId,
    closed: AtomicBool,
}

impl Session {
    /// Launch (or attach to) Chromium, open the single driven tab, apply
    /// the configured viewport and land on `base_url`.
    pub async fn open(cfg: AdapterConfig, base_url: &str) -> Result<Self, AdapterError> {
        let transport = Arc::new(ChromiumTransport::new(cfg.clone()));
        let adapter = Arc::new(DomAdapter::new(cfg.clone(), transport));
        adapter.clone().start().await?;

        let page = adapter.create_page("about:blank").await?;
        adapter
            .set_device_metrics(page, cfg.window_width, cfg.window_height)
            .await?;
        adapter
            .navigate(
                page,
                base_url,
                Duration::from_millis(cfg.default_deadline_ms),
            )
            .await?;

        let session = Self::attach(adapter, page);
        info!(target: "dom-adapter", id = ?session.id, base_url, "session opened");
        Ok(session)
    }

    /// Wrap an already prepared `Dom` implementation. This is how the
    /// integration tests hand an in-memory document to the runner.
    pub fn attach(dom: Arc<dyn Dom>, page: PageId) -> Self {
        Self {
            id: SessionId::new(),
            dom,
            page,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn dom(&self) -> &dyn Dom {
        self.dom.as_ref()
    }

    /// Valid (non-torn-down, connection up) for the lifetime of any
    /// pending wait.
    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Relaxed) && self.dom.is_alive()
    }

    /// Tear the session down. Idempotent; later calls are no-ops so that
    /// teardown paths may run unconditionally.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::Relaxed) {
            return;
        }
        if let Err(err) = self.dom.close_page(self.page).await {
            warn!(target: "dom-adapter", ?err, "session close was not clean");
        }
        info!(target: "dom-adapter", id = ?self.id, "session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobcafe_core_types::Locator;
    use std::sync::atomic::AtomicU32;

    use crate::adapter::ElementRef;

    #[derive(Default)]
    struct CountingDom {
        closes: AtomicU32,
        dead: AtomicBool,
    }

    #[async_trait]
    impl Dom for CountingDom {
        async fn navigate(
            &self,
            _page: PageId,
            _url: &str,
            _deadline: Duration,
        ) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn find_all(
            &self,
            _page: PageId,
            _locator: &Locator,
        ) -> Result<Vec<ElementRef>, AdapterError> {
            Ok(Vec::new())
        }

        async fn is_visible(
            &self,
            _page: PageId,
            _element: &ElementRef,
        ) -> Result<bool, AdapterError> {
            Ok(false)
        }

        async fn is_clickable(
            &self,
            _page: PageId,
            _element: &ElementRef,
        ) -> Result<bool, AdapterError> {
            Ok(false)
        }

        async fn text(&self, _page: PageId, _element: &ElementRef) -> Result<String, AdapterError> {
            Ok(String::new())
        }

        async fn attribute(
            &self,
            _page: PageId,
            _element: &ElementRef,
            _name: &str,
        ) -> Result<Option<String>, AdapterError> {
            Ok(None)
        }

        async fn value(
            &self,
            _page: PageId,
            _element: &ElementRef,
        ) -> Result<String, AdapterError> {
            Ok(String::new())
        }

        async fn click(&self, _page: PageId, _element: &ElementRef) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn send_input(
            &self,
            _page: PageId,
            _element: &ElementRef,
            _text: &str,
        ) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn clear(&self, _page: PageId, _element: &ElementRef) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn close_page(&self, _page: PageId) -> Result<(), AdapterError> {
            self.closes.fetch_add(1, Ordering::Relaxed);
            self.dead.store(true, Ordering::Relaxed);
            Ok(())
        }

        fn is_alive(&self) -> bool {
            !self.dead.load(Ordering::Relaxed)
        }
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let dom = Arc::new(CountingDom::default());
        let session = Session::attach(dom.clone(), PageId::new());

        assert!(session.is_alive());
        session.close().await;
        session.close().await;

        assert_eq!(dom.closes.load(Ordering::Relaxed), 1);
        assert!(!session.is_alive());
    }
}
