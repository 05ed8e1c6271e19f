//! qBittorrent Web API client for RSS auto-download rules
//!
//! Each anime of a saved list becomes one RSS feed and one auto-download rule
//! that saves matching releases into a per-title folder.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::rss::is_rss_url;
use super::season::Season;
use crate::store::models::AnimeRecord;

/// Auto-download rule as expected by `/api/v2/rss/setRule`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub enabled: bool,
    pub must_contain: String,
    pub must_not_contain: String,
    pub use_regex: bool,
    pub episode_filter: String,
    pub smart_filter: bool,
    pub previously_matched_episodes: Vec<String>,
    pub affected_feeds: Vec<String>,
    pub ignore_days: u32,
    pub last_match: String,
    pub add_paused: bool,
    pub assigned_category: String,
    pub save_path: String,
    pub save_different_path: bool,
}

impl RuleDefinition {
    /// Rule that grabs every release of one feed into `save_path`
    pub fn for_feed(feed_url: &str, save_path: &str, category: &str) -> Self {
        Self {
            enabled: true,
            must_contain: String::new(),
            must_not_contain: String::new(),
            use_regex: false,
            episode_filter: String::new(),
            smart_filter: false,
            previously_matched_episodes: Vec::new(),
            affected_feeds: vec![feed_url.to_string()],
            ignore_days: 0,
            last_match: String::new(),
            add_paused: false,
            assigned_category: category.to_string(),
            save_path: save_path.to_string(),
            save_different_path: true,
        }
    }
}

/// Logged-in session against one qBittorrent instance
pub struct QBittorrentClient {
    host: String,
    username: String,
    password: String,
    client: Client,
}

impl QBittorrentClient {
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self> {
        // Own client so the SID cookie stays scoped to this session
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create qBittorrent HTTP client")?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.host, path)
    }

    /// Logs in and keeps the SID cookie for later calls
    pub async fn login(&self) -> Result<()> {
        let url = self.api_url("auth/login");
        let resp = self
            .client
            .post(&url)
            .header("Referer", &self.host)
            .form(&[("username", &self.username), ("password", &self.password)])
            .send()
            .await
            .with_context(|| format!("Failed to reach qBittorrent at {}", url))?
            .error_for_status()
            .context("qBittorrent login was rejected")?;

        let body = resp.text().await?;
        if body.trim() == "Fails." {
            bail!("qBittorrent login failed: wrong username or password");
        }

        tracing::info!("Logged in to qBittorrent at {}", self.host);
        Ok(())
    }

    /// Subscribes to a feed, placing it at `path` in the RSS tree
    pub async fn add_rss_feed(&self, feed_url: &str, path: &str) -> Result<()> {
        self.client
            .post(self.api_url("rss/addFeed"))
            .form(&[("url", feed_url), ("path", path)])
            .send()
            .await
            .context("Failed to send addFeed request")?
            .error_for_status()
            .with_context(|| format!("Failed to add RSS feed '{}'", path))?;

        Ok(())
    }

    /// Creates or replaces an auto-download rule
    pub async fn set_rule(&self, rule_name: &str, rule: &RuleDefinition) -> Result<()> {
        let rule_def = serde_json::to_string(rule)?;

        self.client
            .post(self.api_url("rss/setRule"))
            .form(&[("ruleName", rule_name), ("ruleDef", rule_def.as_str())])
            .send()
            .await
            .context("Failed to send setRule request")?
            .error_for_status()
            .with_context(|| format!("Failed to add rule '{}'", rule_name))?;

        Ok(())
    }

    pub async fn app_version(&self) -> Result<String> {
        let version = self
            .client
            .get(self.api_url("app/version"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(version.trim().to_string())
    }

    /// The RSS tree: folders map to nested objects, feeds to feed objects
    pub async fn rss_items(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let items = self
            .client
            .get(self.api_url("rss/items"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse RSS items")?;
        Ok(items)
    }

    pub async fn rss_rules(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let rules = self
            .client
            .get(self.api_url("rss/rules"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse RSS rules")?;
        Ok(rules)
    }
}

/// Counts the feeds in an RSS tree, descending into folders
pub fn count_feeds(items: &serde_json::Map<String, serde_json::Value>) -> usize {
    items
        .values()
        .map(|value| match value.as_object() {
            Some(object) if object.contains_key("url") => 1,
            Some(folder) => count_feeds(folder),
            None => 0,
        })
        .sum()
}

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

const MAX_FILENAME_CHARS: usize = 255;

/// Makes a title safe to use as a folder name on Windows, Linux and macOS
///
/// Invalid characters become spaces, whitespace runs collapse, leading and
/// trailing spaces and dots are trimmed, reserved device names get a `_`
/// prefix, and the result is cut to 255 characters keeping the extension.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized = invalid_chars().replace_all(filename, " ");
    let sanitized = whitespace_runs().replace_all(&sanitized, " ");
    let mut sanitized = sanitized.trim_matches(|c: char| c == ' ' || c == '.').to_string();

    let (base, _) = split_extension(&sanitized);
    if is_reserved_name(&base.to_lowercase()) {
        sanitized = format!("_{}", sanitized);
    }

    if sanitized.chars().count() > MAX_FILENAME_CHARS {
        let (base, ext) = split_extension(&sanitized);
        let keep = MAX_FILENAME_CHARS.saturating_sub(ext.chars().count());
        sanitized = base.chars().take(keep).chain(ext.chars()).collect();
    }

    sanitized
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn is_reserved_name(name: &str) -> bool {
    match name {
        "con" | "prn" | "aux" | "nul" => true,
        _ => {
            let digit_suffix = |prefix: &str| {
                name.strip_prefix(prefix)
                    .is_some_and(|rest| rest.len() == 1 && matches!(rest.as_bytes()[0], b'1'..=b'9'))
            };
            digit_suffix("com") || digit_suffix("lpt")
        }
    }
}

/// Where pushed rules save their downloads
#[derive(Debug, Clone)]
pub struct PushSettings {
    pub download_root: String,
    pub category: String,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            download_root: "/dl".to_string(),
            category: "anime".to_string(),
        }
    }
}

/// Outcome of pushing a list, by anime title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingResults {
    pub successful: Vec<String>,
    /// Feed was added but the rule was rejected
    pub failed: Vec<String>,
    /// Feed could not be added
    pub unavailable: Vec<String>,
}

/// Adds a feed and an auto-download rule for every anime of a list
///
/// `progress` is called with `(current, total, title)` before each entry.
pub async fn push_anime_list(
    client: &QBittorrentClient,
    anime_list: &[AnimeRecord],
    season: Season,
    year: i32,
    settings: &PushSettings,
    mut progress: Option<&mut dyn FnMut(usize, usize, &str)>,
) -> ProcessingResults {
    let mut results = ProcessingResults::default();
    let total = anime_list.len();
    let prefix = format!("{}{}", season.capitalized(), year);

    for (idx, anime) in anime_list.iter().enumerate() {
        if let Some(callback) = progress.as_mut() {
            callback(idx + 1, total, &anime.title);
        }

        if !is_rss_url(&anime.rss_url) {
            tracing::warn!("Skipping '{}': no usable RSS URL", anime.title);
            results.unavailable.push(anime.title.clone());
            continue;
        }

        let feed_path = format!("{}/{}", prefix, anime.title);
        let rule_name = format!("{} {}", prefix, anime.title);
        let save_path = format!(
            "{}/{}",
            settings.download_root.trim_end_matches('/'),
            sanitize_filename(&anime.title)
        );

        if let Err(e) = client.add_rss_feed(&anime.rss_url, &feed_path).await {
            tracing::warn!("Failed to add RSS feed for '{}': {:?}", anime.title, e);
            results.unavailable.push(anime.title.clone());
            continue;
        }

        let rule = RuleDefinition::for_feed(&anime.rss_url, &save_path, &settings.category);
        match client.set_rule(&rule_name, &rule).await {
            Ok(()) => {
                tracing::info!("Added rule '{}'", rule_name);
                results.successful.push(anime.title.clone());
            }
            Err(e) => {
                tracing::error!("Failed to add rule for '{}': {:?}", anime.title, e);
                results.failed.push(anime.title.clone());
            }
        }
    }

    tracing::info!(
        "Pushed {} anime: {} successful, {} failed, {} unavailable",
        total,
        results.successful.len(),
        results.failed.len(),
        results.unavailable.len()
    );

    results
}

/// Counts shown by the `status` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    pub version: String,
    pub feeds: usize,
    pub rules: usize,
}

pub async fn client_status(client: &QBittorrentClient) -> Result<ClientStatus> {
    let version = client.app_version().await?;
    if version.is_empty() {
        return Err(anyhow!("qBittorrent returned an empty version"));
    }
    let feeds = count_feeds(&client.rss_items().await?);
    let rules = client.rss_rules().await?.len();
    Ok(ClientStatus {
        version,
        feeds,
        rules,
    })
}
