use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobcafe_e2e::{run_suite, SuiteConfig};

/// Browser-driven end-to-end suite for the JobCafe site.
#[derive(Debug, Parser)]
#[command(name = "jobcafe-e2e", version, about)]
struct Cli {
    /// Base URL of the deployment under test.
    #[arg(long)]
    base_url: Option<String>,

    /// Run with a visible browser window.
    #[arg(long)]
    headful: bool,

    /// Path to the chrome/chromium binary.
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Wait deadline per element, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Poll interval between element checks, in milliseconds.
    #[arg(long, default_value_t = 250)]
    poll_ms: u64,

    /// Run only cases whose name contains this substring.
    #[arg(long)]
    filter: Option<String>,
}

impl Cli {
    fn into_config(self) -> SuiteConfig {
        let mut config = SuiteConfig {
            headless: !self.headful,
            chrome: self.chrome,
            timeout_ms: self.timeout_ms,
            poll_ms: self.poll_ms,
            filter: self.filter,
            ..SuiteConfig::default()
        };
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().into_config();
    info!(target: "jobcafe-e2e", base_url = %config.base_url, "suite starting");

    let summary = run_suite(&config).await?;
    print!("{}", summary.render());

    if !summary.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
