//! Pluggable command transport between the adapter and Chromium.
//!
//! The adapter never talks to a websocket directly; it goes through the
//! [`DomTransport`] trait so tests can substitute a scripted transport.

use std::collections::HashMap;
use std::convert::TryInto;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, CdpJsonEventMessage, Message, MethodId, Response};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::AdapterConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::util::extract_ws_url;

/// One raw CDP event forwarded to the adapter.
#[derive(Clone, Debug)]
pub struct TransportEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// Addressing for a CDP command: browser-level or a page session.
#[derive(Clone, Debug)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

#[async_trait]
pub trait DomTransport: Send + Sync {
    async fn start(&self) -> Result<(), AdapterError>;
    async fn next_event(&self) -> Option<TransportEvent>;
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;

    /// False once the connection (or the browser process) is gone.
    fn is_alive(&self) -> bool {
        true
    }
}

/// Inert transport for wiring tests.
#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl DomTransport for NoopTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        None
    }

    async fn send_command(
        &self,
        _target: CommandTarget,
        method: &str,
        _params: Value,
    ) -> Result<Value, AdapterError> {
        Err(AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("transport not available for method {method}")))
    }
}

/// Transport backed by a launched (or attached) Chromium instance.
///
/// One browser per run: once the connection dies every further command
/// fails with `SessionClosed` and nothing is relaunched.
pub struct ChromiumTransport {
    cfg: AdapterConfig,
    state: OnceCell<Arc<RuntimeState>>,
}

impl ChromiumTransport {
    pub fn new(cfg: AdapterConfig) -> Self {
        Self {
            cfg,
            state: OnceCell::new(),
        }
    }

    fn runtime(&self) -> Result<&Arc<RuntimeState>, AdapterError> {
        self.state.get().ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::SessionClosed).with_hint("transport not started")
        })
    }
}

#[async_trait]
impl DomTransport for ChromiumTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        let cfg = self.cfg.clone();
        let runtime = self
            .state
            .get_or_try_init(|| async move {
                let state = RuntimeState::start(cfg).await?;
                Ok::<_, AdapterError>(Arc::new(state))
            })
            .await?;

        let deadline = Duration::from_millis(self.cfg.default_deadline_ms);

        runtime
            .send_internal(
                CommandTarget::Browser,
                "Target.setDiscoverTargets",
                serde_json::json!({ "discover": true }),
                deadline,
            )
            .await?;

        runtime
            .send_internal(
                CommandTarget::Browser,
                "Target.setAutoAttach",
                serde_json::json!({
                    "autoAttach": true,
                    "waitForDebuggerOnStart": false,
                    "flatten": true,
                }),
                deadline,
            )
            .await?;

        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        match self.runtime() {
            Ok(runtime) => runtime.next_event().await,
            Err(_) => None,
        }
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let runtime = self.runtime()?;
        if !runtime.is_alive() {
            return Err(AdapterError::new(AdapterErrorKind::SessionClosed)
                .with_hint("browser connection lost"));
        }
        runtime
            .send_internal(
                target,
                method,
                params,
                Duration::from_millis(self.cfg.default_deadline_ms),
            )
            .await
    }

    fn is_alive(&self) -> bool {
        self.state
            .get()
            .map(|runtime| runtime.is_alive())
            .unwrap_or(false)
    }
}

struct ControlMessage {
    target: CommandTarget,
    method: String,
    params: Value,
    responder: oneshot::Sender<Result<Value, AdapterError>>,
}

struct RuntimeState {
    command_tx: mpsc::Sender<ControlMessage>,
    events_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    loop_task: JoinHandle<()>,
    child: Mutex<Option<Child>>,
    alive: Arc<AtomicBool>,
}

impl RuntimeState {
    async fn start(cfg: AdapterConfig) -> Result<Self, AdapterError> {
        let (child, ws_url) = if let Some(url) = cfg.websocket_url.clone() {
            (None, url)
        } else {
            let browser_cfg = Self::browser_config(&cfg)?;
            Self::launch_browser(browser_cfg).await?
        };

        let conn = Connection::<CdpEventMessage>::connect(&ws_url)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(128);
        let (events_tx, events_rx) = mpsc::channel(512);

        let alive = Arc::new(AtomicBool::new(true));
        let loop_alive = alive.clone();

        let loop_task = tokio::spawn(async move {
            let result = Self::run_loop(conn, command_rx, events_tx).await;
            loop_alive.store(false, Ordering::Relaxed);
            if let Err(err) = result {
                error!(target: "dom-transport", ?err, "transport loop terminated with error");
            }
        });

        info!(target: "dom-transport", url = %ws_url, "chromium connection established");

        Ok(Self {
            command_tx,
            events_rx: Mutex::new(events_rx),
            loop_task,
            child: Mutex::new(child),
            alive,
        })
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn send_internal(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, AdapterError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let message = ControlMessage {
            target,
            method: method.to_string(),
            params,
            responder: resp_tx,
        };

        self.command_tx.send(message).await.map_err(|_| {
            AdapterError::new(AdapterErrorKind::SessionClosed).with_hint("command loop gone")
        })?;

        match tokio::time::timeout(deadline, resp_rx).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(AdapterError::new(AdapterErrorKind::SessionClosed)
                .with_hint("command response channel closed")),
            Err(_) => {
                Err(AdapterError::new(AdapterErrorKind::NavTimeout).with_hint("command timed out"))
            }
        }
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        let mut guard = self.events_rx.lock().await;
        guard.recv().await
    }

    fn browser_config(cfg: &AdapterConfig) -> Result<BrowserConfig, AdapterError> {
        if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!(
                "chrome executable not found at {} (set JOBCAFE_CHROME)",
                cfg.executable.display()
            )));
        }

        let profile_dir = if cfg.user_data_dir.is_absolute() {
            cfg.user_data_dir.clone()
        } else {
            let cwd = std::env::current_dir().map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("failed to resolve cwd for user-data-dir: {err}"))
            })?;
            cwd.join(&cfg.user_data_dir)
        };

        fs::create_dir_all(&profile_dir).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to ensure user-data-dir: {err}"))
        })?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
            .launch_timeout(Duration::from_secs(20))
            .window_size(cfg.window_width, cfg.window_height);

        if !cfg.headless {
            builder = builder.with_head();
        }

        let mut args = vec![
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-breakpad",
            "--disable-component-update",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-hang-monitor",
            "--disable-popup-blocking",
            "--disable-prompt-on-repost",
            "--disable-sync",
            "--metrics-recording-only",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--remote-allow-origins=*",
            "--use-mock-keychain",
        ];
        if cfg.headless {
            args.push("--headless=new");
            args.push("--hide-scrollbars");
            args.push("--mute-audio");
        }
        builder = builder.args(args);

        if !cfg.executable.as_os_str().is_empty() {
            builder = builder.chrome_executable(cfg.executable.clone());
        }
        builder = builder.user_data_dir(profile_dir);

        builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("browser config error: {err}"))
        })
    }

    async fn launch_browser(
        config: BrowserConfig,
    ) -> Result<(Option<Child>, String), AdapterError> {
        let mut child = config.launch().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let ws_url = extract_ws_url(&mut child)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        Ok((Some(child), ws_url))
    }

    async fn run_loop(
        mut conn: Connection<CdpEventMessage>,
        mut command_rx: mpsc::Receiver<ControlMessage>,
        mut event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<(), AdapterError> {
        let mut inflight: HashMap<CallId, oneshot::Sender<Result<Value, AdapterError>>> =
            HashMap::new();

        loop {
            tokio::select! {
                Some(cmd) = command_rx.recv() => {
                    Self::handle_command(&mut conn, cmd, &mut inflight)?;
                }
                message = conn.next() => {
                    match message {
                        Some(Ok(Message::Response(resp))) => {
                            Self::handle_response(resp, &mut inflight);
                        }
                        Some(Ok(Message::Event(event))) => {
                            if let Err(err) = Self::handle_event(event, &mut event_tx).await {
                                warn!(target: "dom-transport", ?err, "failed to forward event");
                            }
                        }
                        Some(Err(err)) => {
                            let adapter_err = Self::map_cdp_error(err);
                            for (_, sender) in inflight.drain() {
                                let _ = sender.send(Err(adapter_err.clone()));
                            }
                            return Err(adapter_err);
                        }
                        None => {
                            let err = AdapterError::new(AdapterErrorKind::SessionClosed)
                                .with_hint("cdp connection closed");
                            for (_, sender) in inflight.drain() {
                                let _ = sender.send(Err(err.clone()));
                            }
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn handle_command(
        conn: &mut Connection<CdpEventMessage>,
        cmd: ControlMessage,
        inflight: &mut HashMap<CallId, oneshot::Sender<Result<Value, AdapterError>>>,
    ) -> Result<(), AdapterError> {
        let session = match cmd.target {
            CommandTarget::Browser => None,
            CommandTarget::Session(session_id) => Some(CdpSessionId::from(session_id)),
        };

        let method_id: MethodId = cmd.method.clone().into();
        match conn.submit_command(method_id, session, cmd.params) {
            Ok(call_id) => {
                inflight.insert(call_id, cmd.responder);
                Ok(())
            }
            Err(err) => {
                let adapter_err =
                    AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string());
                let _ = cmd.responder.send(Err(adapter_err.clone()));
                Err(adapter_err)
            }
        }
    }

    fn handle_response(
        resp: Response,
        inflight: &mut HashMap<CallId, oneshot::Sender<Result<Value, AdapterError>>>,
    ) {
        let entry = inflight.remove(&resp.id);
        let result = Self::extract_payload(resp);

        if let Some(sender) = entry {
            let _ = sender.send(result);
        }
    }

    async fn handle_event(
        event: CdpEventMessage,
        event_tx: &mut mpsc::Sender<TransportEvent>,
    ) -> Result<(), AdapterError> {
        let raw: CdpJsonEventMessage = event.try_into().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to decode cdp event: {err}"))
        })?;

        let payload = TransportEvent {
            method: raw.method.into_owned(),
            params: raw.params,
            session_id: raw.session_id,
        };

        event_tx
            .send(payload)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
    }

    fn extract_payload(resp: Response) -> Result<Value, AdapterError> {
        if let Some(result) = resp.result {
            Ok(result)
        } else if let Some(error) = resp.error {
            let retriable = error.code >= 500;
            Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("cdp error {}: {}", error.code, error.message))
                .retriable(retriable))
        } else {
            Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("empty cdp response"))
        }
    }

    fn map_cdp_error(err: CdpError) -> AdapterError {
        let hint = err.to_string();
        match err {
            CdpError::Timeout => AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(hint)
                .retriable(true),
            CdpError::FrameNotFound(_)
            | CdpError::JavascriptException(_)
            | CdpError::Serde(_) => AdapterError::new(AdapterErrorKind::Internal).with_hint(hint),
            _ => AdapterError::new(AdapterErrorKind::SessionClosed).with_hint(hint),
        }
    }
}

impl Drop for RuntimeState {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();

        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(mut child) = guard.take() {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(err) = child.kill().await {
                            warn!(target: "dom-transport", ?err, "failed to kill chromium child");
                        }
                    });
                } else {
                    debug!(target: "dom-transport", "no tokio runtime available to kill chromium child");
                }
            }
        }
    }
}
