//! Seasonal anime fetcher
//!
//! Walks every page of a season's catalog listing, keeps the entries that pass
//! [`AnimeFilter`], normalizes them into [`AnimeRecord`]s with a default feed
//! URL, and removes duplicates. Pages are requested strictly one after the
//! other with a courtesy pause in between to stay under the API rate limit.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use super::anime_filter::{AnimeFilter, FilterVerdict};
use super::jikan::{CatalogClient, CatalogEntry};
use super::rss::{DEFAULT_FANSUBBER, format_rss_url};
use super::season::{self, Season};
use crate::store::models::{AnimeRecord, EpisodeCount};

pub const DEFAULT_MIN_MEMBERS: u64 = 5000;

const NO_SYNOPSIS: &str = "No synopsis available.";
const UNKNOWN: &str = "Unknown";
const TBA: &str = "TBA";

/// Fixed settings of a fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub min_members: u64,
    /// Pause between two page requests
    pub page_delay: Duration,
    /// Fansub group written into every new record's feed URL
    pub fansubber: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            min_members: DEFAULT_MIN_MEMBERS,
            page_delay: Duration::from_secs(1),
            fansubber: DEFAULT_FANSUBBER.to_string(),
        }
    }
}

/// Counters for one fetch; logged at the end and then dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub total_fetched: usize,
    pub filtered_out: usize,
    pub low_members_filtered: usize,
    pub chinese_filtered: usize,
    pub duplicates_removed: usize,
}

/// Start date of an entry, either normalized or left as the catalog gave it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiredDate {
    Parsed(NaiveDate),
    Unparsed(String),
}

impl AiredDate {
    /// Parses an ISO-8601 date or date-time; anything else is kept verbatim
    ///
    /// Only a missing date becomes `"TBA"`.
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw {
            None => return AiredDate::Unparsed(TBA.to_string()),
            Some(raw) if raw.is_empty() || raw == TBA => {
                return AiredDate::Unparsed(raw.to_string());
            }
            Some(raw) => raw,
        };

        if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
            return AiredDate::Parsed(date_time.date_naive());
        }
        if let Ok(date_time) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return AiredDate::Parsed(date_time.date());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return AiredDate::Parsed(date);
        }

        tracing::debug!("Keeping unparseable aired date '{}'", raw);
        AiredDate::Unparsed(raw.to_string())
    }

    /// `YYYY-MM-DD` for parsed dates, the original text otherwise
    pub fn into_display(self) -> String {
        match self {
            AiredDate::Parsed(date) => date.format("%Y-%m-%d").to_string(),
            AiredDate::Unparsed(raw) => raw,
        }
    }
}

/// Season and year to fetch; a missing half falls back to the fetcher's
/// date-based default for both
pub fn resolve_season(season: Option<Season>, year: Option<i32>, today: NaiveDate) -> (Season, i32) {
    match (season, year) {
        (Some(season), Some(year)) => (season, year),
        _ => season::fetch_default(&today),
    }
}

/// Projects a raw catalog entry into a saved-list record
pub fn normalize(entry: &CatalogEntry, fansubber: &str) -> AnimeRecord {
    let title = entry.title.clone().unwrap_or_default();
    let rss_url = format_rss_url(&title, fansubber);

    AnimeRecord {
        date: AiredDate::parse(entry.aired_from()).into_display(),
        synopsis: entry
            .synopsis
            .clone()
            .unwrap_or_else(|| NO_SYNOPSIS.to_string()),
        genres: entry
            .genres
            .iter()
            .flatten()
            .map(|g| g.name.clone().unwrap_or_default())
            .collect(),
        score: entry.score.unwrap_or(0.0),
        members: entry.members(),
        episodes: EpisodeCount::from(entry.episodes),
        status: entry.status.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        image_url: entry.image_url().unwrap_or_default().to_string(),
        kind: entry.kind.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        source: entry.source.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        mal_id: entry.mal_id,
        rss_url,
        fansubber: fansubber.to_string(),
        title,
    }
}

/// Drops records whose catalog id or title was already seen
///
/// The first occurrence wins. Records without an id are matched on title
/// alone, and an empty title never counts as seen.
///
/// # Returns
/// The unique records in encounter order and the number removed
pub fn remove_duplicates(anime_list: Vec<AnimeRecord>) -> (Vec<AnimeRecord>, usize) {
    let original_count = anime_list.len();
    let mut seen_ids: HashSet<u64> = HashSet::new();
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(original_count);

    for anime in anime_list {
        let id_seen = anime.mal_id.is_some_and(|id| seen_ids.contains(&id));
        if id_seen || seen_titles.contains(&anime.title) {
            continue;
        }

        if let Some(id) = anime.mal_id {
            seen_ids.insert(id);
        }
        if !anime.title.is_empty() {
            seen_titles.insert(anime.title.clone());
        }
        unique.push(anime);
    }

    let removed = original_count - unique.len();
    (unique, removed)
}

/// Fetches and filters one season of the catalog
///
/// Holds no state between calls besides its fixed configuration.
pub struct SeasonalFetcher<C> {
    client: C,
    config: FetcherConfig,
    filter: AnimeFilter,
}

impl<C: CatalogClient> SeasonalFetcher<C> {
    pub fn new(client: C, config: FetcherConfig) -> Self {
        let filter = AnimeFilter::new(config.min_members);
        Self {
            client,
            config,
            filter,
        }
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetches, filters and deduplicates a season's anime
    ///
    /// Without a season and year the fetcher's date-based default is used.
    /// `progress` receives `(current_page, total_pages)` once per page, as
    /// soon as the page's pagination is known. A failed page request ends the
    /// walk and whatever was collected so far is returned.
    pub async fn fetch_seasonal_anime(
        &self,
        season: Option<Season>,
        year: Option<i32>,
        progress: Option<&mut dyn FnMut(u32, u32)>,
    ) -> Vec<AnimeRecord> {
        let (season, year) = resolve_season(season, year, Local::now().date_naive());
        let (anime, _) = self.fetch_with_stats(season, year, progress).await;
        anime
    }

    /// Same as [`Self::fetch_seasonal_anime`] for an explicit season, also
    /// returning the counters
    pub async fn fetch_with_stats(
        &self,
        season: Season,
        year: i32,
        mut progress: Option<&mut dyn FnMut(u32, u32)>,
    ) -> (Vec<AnimeRecord>, FetchStats) {
        let mut stats = FetchStats::default();
        let mut filtered_anime = Vec::new();
        let mut current_page = 1u32;
        let mut total_pages = 1u32;

        loop {
            let page = match self.client.fetch_page(year, season, current_page).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!("Error fetching anime data: {:?}", e);
                    break;
                }
            };

            let Some(entries) = page.data else {
                tracing::debug!("Page {} has no data, stopping", current_page);
                break;
            };

            let pagination = page.pagination.unwrap_or_default();
            total_pages = pagination.last_visible_page();

            if let Some(callback) = progress.as_mut() {
                callback(current_page, total_pages);
            }

            for entry in &entries {
                stats.total_fetched += 1;
                match self.filter.evaluate(entry) {
                    FilterVerdict::Keep => {
                        filtered_anime.push(normalize(entry, &self.config.fansubber));
                    }
                    FilterVerdict::LowMembers => {
                        stats.low_members_filtered += 1;
                        stats.filtered_out += 1;
                    }
                    FilterVerdict::ChineseAnimation => {
                        stats.chinese_filtered += 1;
                        stats.filtered_out += 1;
                    }
                }
            }

            if !pagination.has_next_page() {
                break;
            }

            current_page += 1;
            if !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
        }

        let passed = filtered_anime.len();
        let (unique_anime, duplicates_removed) = remove_duplicates(filtered_anime);
        stats.duplicates_removed = duplicates_removed;

        tracing::info!(
            season = season.capitalized(),
            year,
            pages = total_pages,
            total_fetched = stats.total_fetched,
            passed_filters = passed,
            duplicates_removed = stats.duplicates_removed,
            unique = unique_anime.len(),
            filtered_out = stats.filtered_out,
            low_members = stats.low_members_filtered,
            chinese_animation = stats.chinese_filtered,
            "Scraping statistics"
        );

        (unique_anime, stats)
    }
}
