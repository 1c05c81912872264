use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;

use riskscan_client_core::settings::ClientSettings;
use riskscan_client_engine::SessionConfig;

#[cfg(feature = "prod-backend")]
const DEFAULT_BACKEND_URL: &str = "https://api.riskscan.dev/";

#[cfg(not(feature = "prod-backend"))]
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

fn default_backend_url() -> Url {
    Url::parse(DEFAULT_BACKEND_URL).expect("DEFAULT_BACKEND_URL must be a valid URL")
}

#[derive(Debug, Clone, Parser)]
#[command(name = "riskscan", version, about = "Contract risk analysis client")]
pub struct Cli {
    /// Contract document to analyze (.pdf or .txt, at most 10 MiB).
    #[arg(value_name = "FILE", required_unless_present = "health")]
    pub file: Option<PathBuf>,

    /// Backend base URL. Falls back to the saved settings file, then to the
    /// compiled-in default.
    #[arg(long, env = "RISKSCAN_BACKEND_URL")]
    pub backend_url: Option<Url>,

    /// Delay between consecutive status polls, in milliseconds.
    #[arg(
        long,
        env = "RISKSCAN_POLL_INTERVAL_MS",
        default_value_t = SessionConfig::DEFAULT_POLL_INTERVAL.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_ms: u64,

    /// Number of status polls tolerated before giving up with a timeout.
    #[arg(
        long,
        env = "RISKSCAN_MAX_ATTEMPTS",
        default_value_t = SessionConfig::DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,

    /// Print the analysis result as JSON instead of the formatted report.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "RISKSCAN_NO_PROGRESS", default_value_t = false)]
    pub no_progress: bool,

    /// Query backend health and exit.
    #[arg(long, default_value_t = false)]
    pub health: bool,
}

impl Cli {
    /// Resolve the backend URL: flag/env wins, then the settings file, then
    /// the compiled-in default.
    pub fn resolve_backend_url(&self, settings: Option<&ClientSettings>) -> anyhow::Result<Url> {
        if let Some(url) = &self.backend_url {
            return Ok(url.clone());
        }
        if let Some(saved) = settings.and_then(|s| s.backend_url.as_deref()) {
            return Url::parse(saved)
                .map_err(|err| anyhow::anyhow!("invalid backend URL in settings ({saved:?}): {err}"));
        }
        Ok(default_backend_url())
    }
}
