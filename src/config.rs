//! Settings read from the environment (and a `.env` file, if present)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::scraper::fetcher::{DEFAULT_MIN_MEMBERS, FetcherConfig};
use crate::scraper::jikan;
use crate::scraper::qbittorrent::PushSettings;
use crate::scraper::rss::DEFAULT_FANSUBBER;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jikan_base_url: String,
    pub min_members: u64,
    pub page_delay: Duration,
    pub save_dir: PathBuf,
    pub qb_base_url: String,
    pub qb_user: String,
    pub qb_password: String,
    pub qb_download_root: String,
    pub qb_category: String,
}

impl AppConfig {
    /// Loads `.env` and reads the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let min_members = match lookup("MIN_MEMBERS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("Invalid MIN_MEMBERS value '{}'", value))?,
            None => DEFAULT_MIN_MEMBERS,
        };

        let page_delay_ms: u64 = match lookup("PAGE_DELAY_MS") {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("Invalid PAGE_DELAY_MS value '{}'", value))?,
            None => 1000,
        };

        Ok(Self {
            jikan_base_url: get("JIKAN_BASE_URL", jikan::DEFAULT_BASE_URL),
            min_members,
            page_delay: Duration::from_millis(page_delay_ms),
            save_dir: PathBuf::from(get("SAVE_DIR", "saved_lists")),
            qb_base_url: get("QB_BASE_URL", "http://localhost:8080"),
            qb_user: get("QB_USER", ""),
            qb_password: get("QB_PASSWORD", ""),
            qb_download_root: get("QB_DOWNLOAD_ROOT", "/dl"),
            qb_category: get("QB_CATEGORY", "anime"),
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            min_members: self.min_members,
            page_delay: self.page_delay,
            fansubber: DEFAULT_FANSUBBER.to_string(),
        }
    }

    pub fn push_settings(&self) -> PushSettings {
        PushSettings {
            download_root: self.qb_download_root.clone(),
            category: self.qb_category.clone(),
        }
    }
}
