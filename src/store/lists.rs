//! Saved anime lists on disk
//!
//! Lists are pretty-printed JSON arrays named
//! `anime_list_<season>_<year>_<YYYYMMDD_HHMMSS>.json`, so a plain reverse
//! sort of the filenames puts the newest list first within a season.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDateTime};

use super::models::AnimeRecord;
use crate::scraper::rss::DEFAULT_FANSUBBER;
use crate::scraper::season::Season;

const FILE_PREFIX: &str = "anime_list_";
const FILE_SUFFIX: &str = ".json";

/// Builds the filename for a list saved at `now`
pub fn format_filename(season: Season, year: i32, now: NaiveDateTime) -> String {
    format!(
        "{}{}_{}_{}{}",
        FILE_PREFIX,
        season.as_str(),
        year,
        now.format("%Y%m%d_%H%M%S"),
        FILE_SUFFIX
    )
}

/// Recovers the season and year encoded in a saved list's filename
pub fn parse_filename(filename: &str) -> Option<(Season, i32)> {
    let name = Path::new(filename).file_name()?.to_str()?;
    let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    let mut parts = stem.split('_');
    let season = Season::from_str(parts.next()?).ok()?;
    let year = parts.next()?.parse().ok()?;
    Some((season, year))
}

/// Human-readable name of a saved list, e.g. `fall 2024 20241019 120000`
pub fn display_name(filename: &str) -> String {
    filename
        .replace(FILE_PREFIX, "")
        .replace(FILE_SUFFIX, "")
        .replace('_', " ")
}

/// Saves a list under a new timestamped filename in `dir`
///
/// # Returns
/// The filename (not the full path) of the written list
pub fn save_anime_list(
    dir: &Path,
    anime_list: &[AnimeRecord],
    season: Season,
    year: i32,
) -> Result<String> {
    save_anime_list_at(dir, anime_list, season, year, Local::now().naive_local())
}

fn save_anime_list_at(
    dir: &Path,
    anime_list: &[AnimeRecord],
    season: Season,
    year: i32,
    now: NaiveDateTime,
) -> Result<String> {
    if anime_list.is_empty() {
        bail!("No anime list to save");
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create save directory {}", dir.display()))?;

    let filename = format_filename(season, year, now);
    write_anime_list(&dir.join(&filename), anime_list)?;

    tracing::info!("Successfully saved anime list to {}", filename);
    Ok(filename)
}

/// Writes a list to `path`, replacing any existing file
pub fn write_anime_list(path: &Path, anime_list: &[AnimeRecord]) -> Result<()> {
    let mut records = anime_list.to_vec();
    for anime in &mut records {
        if anime.title.is_empty() {
            tracing::warn!("Saving anime entry without a title: {:?}", anime.mal_id);
        }
        if anime.fansubber.is_empty() {
            anime.fansubber = DEFAULT_FANSUBBER.to_string();
        }
    }

    tracing::info!("Saving {} anime entries", records.len());

    let json = serde_json::to_string_pretty(&records).context("Failed to serialize anime list")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Loads a saved list by filename from `dir`
pub fn load_anime_list(dir: &Path, filename: &str) -> Result<Vec<AnimeRecord>> {
    let path = dir.join(filename);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let list = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse anime list {}", path.display()))?;
    Ok(list)
}

/// Saved list filenames in `dir`, most recent first
///
/// A missing directory is treated as having no saved lists.
pub fn list_saved_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read save directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(FILE_SUFFIX))
        .collect();

    files.sort_by(|a, b| b.cmp(a));
    Ok(files)
}

/// Ordering applied when displaying a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Original,
    Date,
    DateReverse,
    Alpha,
    AlphaReverse,
    MembersHigh,
    MembersLow,
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(SortOrder::Original),
            "date" => Ok(SortOrder::Date),
            "date_reverse" => Ok(SortOrder::DateReverse),
            "alpha" => Ok(SortOrder::Alpha),
            "alpha_reverse" => Ok(SortOrder::AlphaReverse),
            "members_high" => Ok(SortOrder::MembersHigh),
            "members_low" => Ok(SortOrder::MembersLow),
            other => Err(anyhow!("Unknown sort order '{}'", other)),
        }
    }
}

/// Sorts a list; ties keep their original relative order
pub fn sort_anime_list(mut anime_list: Vec<AnimeRecord>, order: SortOrder) -> Vec<AnimeRecord> {
    match order {
        SortOrder::Original => {}
        SortOrder::Date => anime_list.sort_by(|a, b| a.date.cmp(&b.date)),
        SortOrder::DateReverse => anime_list.sort_by(|a, b| b.date.cmp(&a.date)),
        SortOrder::Alpha => anime_list.sort_by_key(|a| a.title.to_lowercase()),
        SortOrder::AlphaReverse => {
            anime_list.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()))
        }
        SortOrder::MembersHigh => anime_list.sort_by(|a, b| b.members.cmp(&a.members)),
        SortOrder::MembersLow => anime_list.sort_by_key(|a| a.members),
    }
    anime_list
}

/// Titles that occur more than once, in first-seen order
pub fn duplicate_titles(anime_list: &[AnimeRecord]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for anime in anime_list {
        *counts.entry(anime.title.as_str()).or_default() += 1;
    }

    let mut duplicates = Vec::new();
    for anime in anime_list {
        if counts.get(anime.title.as_str()).copied().unwrap_or(0) > 1
            && !duplicates.contains(&anime.title)
        {
            duplicates.push(anime.title.clone());
        }
    }
    duplicates
}
