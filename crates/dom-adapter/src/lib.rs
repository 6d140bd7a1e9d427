//! Chromium DevTools Protocol control surface for the jobcafe-e2e suite.
//!
//! The adapter owns everything browser-shaped: launching or attaching to
//! Chromium, the websocket command loop, the page registry, and the
//! script-based element operations. Upper layers only ever see the
//! [`Dom`] trait plus the run-scoped [`Session`] handle, which keeps the
//! real browser swappable for an in-memory document in tests.

pub mod adapter;
pub mod config;
pub mod error;
pub mod js;
pub mod session;
pub mod transport;
pub mod util;

pub use adapter::{Dom, DomAdapter, ElementRef};
pub use config::{detect_chrome_executable, AdapterConfig};
pub use error::{AdapterError, AdapterErrorKind};
pub use session::Session;
pub use transport::{ChromiumTransport, CommandTarget, DomTransport, NoopTransport, TransportEvent};
