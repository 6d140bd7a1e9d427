//! Suite configuration.
//!
//! Everything the run needs in one place, resolved from defaults, the
//! `JOBCAFE_*` environment and the CLI. The browser-level knobs are
//! translated into an [`AdapterConfig`] when the session is opened.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use dom_adapter::AdapterConfig;
use element_sync::{SyncError, WaitParams};

/// Deployment the suite runs against when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://167.99.178.249:3000/";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub base_url: String,
    pub headless: bool,
    /// Explicit chrome/chromium binary; discovered from the environment
    /// when absent.
    pub chrome: Option<PathBuf>,
    pub timeout_ms: u64,
    pub poll_ms: u64,
    /// The landing page render gets a longer deadline than everything
    /// else.
    pub landing_timeout_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
    /// Run only cases whose name contains this substring.
    pub filter: Option<String>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("JOBCAFE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            headless: true,
            chrome: None,
            timeout_ms: 5000,
            poll_ms: 250,
            landing_timeout_ms: 7000,
            window_width: 1920,
            window_height: 1080,
            filter: None,
        }
    }
}

impl SuiteConfig {
    pub fn wait(&self) -> Result<WaitParams, SyncError> {
        WaitParams::from_millis(self.timeout_ms, self.poll_ms)
    }

    pub fn landing_wait(&self) -> Result<WaitParams, SyncError> {
        WaitParams::from_millis(self.landing_timeout_ms, self.poll_ms)
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        let mut cfg = AdapterConfig {
            headless: self.headless,
            window_width: self.window_width,
            window_height: self.window_height,
            ..AdapterConfig::default()
        };
        if let Some(chrome) = &self.chrome {
            cfg.executable = chrome.clone();
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wait_timings_are_valid() {
        let cfg = SuiteConfig::default();
        assert_eq!(cfg.timeout_ms, 5000);
        assert_eq!(cfg.landing_timeout_ms, 7000);
        assert_eq!(cfg.poll_ms, 250);

        let wait = cfg.wait().expect("valid defaults");
        assert_eq!(wait.poll_interval.as_millis(), 250);
    }

    #[test]
    fn explicit_chrome_overrides_discovery() {
        let cfg = SuiteConfig {
            chrome: Some(PathBuf::from("/opt/chromium/chrome")),
            ..Default::default()
        };
        assert_eq!(
            cfg.adapter_config().executable,
            PathBuf::from("/opt/chromium/chrome")
        );
    }
}
