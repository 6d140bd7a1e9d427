//! Configuration for launching and tuning the adapter.

use std::{
    env,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use which::which;

/// Configuration for the Chromium connection driven by the suite.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub executable: PathBuf,
    pub user_data_dir: PathBuf,
    pub headless: bool,
    pub default_deadline_ms: u64,
    /// Connect to an already running browser instead of launching one.
    pub websocket_url: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            executable: default_chrome_path(),
            user_data_dir: default_profile_dir(),
            headless: resolve_headless_default(),
            default_deadline_ms: 30_000,
            websocket_url: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

fn resolve_headless_default() -> bool {
    // JOBCAFE_HEADLESS: "0", "false", "no", "off" means headful
    match env::var("JOBCAFE_HEADLESS") {
        Ok(value) => {
            let lower = value.to_ascii_lowercase();
            !matches!(lower.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

fn default_chrome_path() -> PathBuf {
    detect_chrome_executable().unwrap_or_default()
}

fn default_profile_dir() -> PathBuf {
    if let Ok(path) = env::var("JOBCAFE_CHROME_PROFILE") {
        return PathBuf::from(path);
    }

    Path::new("./.jobcafe-profile").into()
}

/// Locate a usable Chromium binary: explicit env override first, then
/// whatever is on PATH under the usual names.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("JOBCAFE_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_viewport_and_deadline() {
        let cfg = AdapterConfig::default();
        assert_eq!((cfg.window_width, cfg.window_height), (1920, 1080));
        assert_eq!(cfg.default_deadline_ms, 30_000);
    }
}
