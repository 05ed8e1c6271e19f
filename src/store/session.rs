//! Per-list edit state kept by the caller between user actions
//!
//! Edits are keyed by the entry's position in the list. A feed URL the user
//! typed by hand is never regenerated when the title or fansub group changes.

use std::collections::{HashMap, HashSet};

use super::models::AnimeRecord;
use crate::scraper::rss::{DEFAULT_FANSUBBER, fansubber_from_rss_url, format_rss_url};

#[derive(Debug, Clone, Default)]
pub struct EditSession {
    titles: HashMap<usize, String>,
    fansubbers: HashMap<usize, String>,
    rss_urls: HashMap<usize, String>,
    manual_rss: HashSet<usize>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking every entry of a freshly loaded list
    pub fn for_list(anime_list: &[AnimeRecord]) -> Self {
        let mut session = Self::new();
        for (index, anime) in anime_list.iter().enumerate() {
            session.initialize_entry(index, anime);
        }
        session
    }

    /// Seeds the edit state of one entry, keeping anything already edited
    pub fn initialize_entry(&mut self, index: usize, anime: &AnimeRecord) {
        self.titles
            .entry(index)
            .or_insert_with(|| anime.title.clone());

        if !self.fansubbers.contains_key(&index) {
            let fansubber = if !anime.rss_url.is_empty() {
                fansubber_from_rss_url(&anime.rss_url)
            } else if !anime.fansubber.is_empty() {
                anime.fansubber.clone()
            } else {
                DEFAULT_FANSUBBER.to_string()
            };
            self.fansubbers.insert(index, fansubber);
        }

        if self.is_manual_rss(index) {
            return;
        }

        if !self.rss_urls.contains_key(&index) && !anime.rss_url.is_empty() {
            // An existing URL may have been tuned by hand in an earlier session
            self.rss_urls.insert(index, anime.rss_url.clone());
            self.manual_rss.insert(index);
        } else {
            self.regenerate(index);
        }
    }

    pub fn title(&self, index: usize) -> Option<&str> {
        self.titles.get(&index).map(String::as_str)
    }

    pub fn fansubber(&self, index: usize) -> Option<&str> {
        self.fansubbers.get(&index).map(String::as_str)
    }

    pub fn rss_url(&self, index: usize) -> Option<&str> {
        self.rss_urls.get(&index).map(String::as_str)
    }

    pub fn is_manual_rss(&self, index: usize) -> bool {
        self.manual_rss.contains(&index)
    }

    pub fn set_title(&mut self, index: usize, title: &str) {
        self.titles.insert(index, title.to_string());
        if !self.is_manual_rss(index) {
            self.regenerate(index);
        }
    }

    pub fn set_fansubber(&mut self, index: usize, fansubber: &str) {
        self.fansubbers.insert(index, fansubber.to_string());
        if !self.is_manual_rss(index) {
            self.regenerate(index);
        }
    }

    pub fn set_rss_url(&mut self, index: usize, rss_url: &str) {
        self.rss_urls.insert(index, rss_url.to_string());
        self.manual_rss.insert(index);
    }

    /// Drops a hand-typed URL in favour of one built from title and group
    pub fn reset_rss_url(&mut self, index: usize) {
        self.manual_rss.remove(&index);
        self.regenerate(index);
    }

    fn regenerate(&mut self, index: usize) {
        let title = self.titles.get(&index).map(String::as_str).unwrap_or_default();
        let fansubber = self
            .fansubbers
            .get(&index)
            .map(String::as_str)
            .unwrap_or(DEFAULT_FANSUBBER);
        let url = format_rss_url(title, fansubber);
        self.rss_urls.insert(index, url);
    }

    /// The list with every edit merged in; untouched fields are preserved
    pub fn apply(&self, anime_list: &[AnimeRecord]) -> Vec<AnimeRecord> {
        anime_list
            .iter()
            .enumerate()
            .map(|(index, anime)| AnimeRecord {
                title: self
                    .titles
                    .get(&index)
                    .cloned()
                    .unwrap_or_else(|| anime.title.clone()),
                rss_url: self
                    .rss_urls
                    .get(&index)
                    .cloned()
                    .unwrap_or_else(|| anime.rss_url.clone()),
                fansubber: self
                    .fansubbers
                    .get(&index)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_FANSUBBER.to_string()),
                ..anime.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::EpisodeCount;

    fn make_record(title: &str, rss_url: &str) -> AnimeRecord {
        AnimeRecord {
            title: title.to_string(),
            date: "2024-10-03".to_string(),
            synopsis: "No synopsis available.".to_string(),
            genres: Vec::new(),
            score: 0.0,
            members: 10_000,
            episodes: EpisodeCount::default(),
            status: "Unknown".to_string(),
            image_url: String::new(),
            kind: "TV".to_string(),
            source: "Unknown".to_string(),
            mal_id: Some(1),
            rss_url: rss_url.to_string(),
            fansubber: "ember".to_string(),
        }
    }

    #[test]
    fn test_initialize_from_existing_rss_url() {
        let url = format_rss_url("Dandadan", "SubsPlease");
        let session = EditSession::for_list(&[make_record("Dandadan", &url)]);

        assert_eq!(session.fansubber(0), Some("SubsPlease"));
        assert_eq!(session.rss_url(0), Some(url.as_str()));
        assert!(session.is_manual_rss(0));
    }

    #[test]
    fn test_initialize_generates_missing_rss_url() {
        let session = EditSession::for_list(&[make_record("Dandadan", "")]);

        assert_eq!(session.fansubber(0), Some("ember"));
        assert_eq!(
            session.rss_url(0),
            Some(format_rss_url("Dandadan", "ember").as_str())
        );
        assert!(!session.is_manual_rss(0));
    }

    #[test]
    fn test_edits_regenerate_generated_url() {
        let mut session = EditSession::for_list(&[make_record("Dandadan", "")]);

        session.set_fansubber(0, "Erai-raws");
        session.set_title(0, "Dan Da Dan");

        assert_eq!(
            session.rss_url(0),
            Some(format_rss_url("Dan Da Dan", "Erai-raws").as_str())
        );
    }

    #[test]
    fn test_manual_url_survives_edits() {
        let mut session = EditSession::for_list(&[make_record("Dandadan", "")]);

        session.set_rss_url(0, "https://example.com/rss/custom");
        session.set_title(0, "Dan Da Dan");
        assert_eq!(session.rss_url(0), Some("https://example.com/rss/custom"));

        session.reset_rss_url(0);
        assert_eq!(
            session.rss_url(0),
            Some(format_rss_url("Dan Da Dan", "ember").as_str())
        );
    }

    #[test]
    fn test_apply_preserves_other_fields() {
        let list = vec![make_record("Dandadan", ""), make_record("Blue Lock", "")];
        let mut session = EditSession::for_list(&list);
        session.set_title(1, "Blue Lock vs. U-20 Japan");

        let updated = session.apply(&list);

        assert_eq!(updated[0], AnimeRecord {
            rss_url: format_rss_url("Dandadan", "ember"),
            ..list[0].clone()
        });
        assert_eq!(updated[1].title, "Blue Lock vs. U-20 Japan");
        assert_eq!(updated[1].mal_id, Some(1));
        assert_eq!(updated[1].date, "2024-10-03");
    }

    #[test]
    fn test_initialize_keeps_prior_edits() {
        let list = vec![make_record("Dandadan", "")];
        let mut session = EditSession::new();
        session.set_fansubber(0, "Judas");
        session.initialize_entry(0, &list[0]);

        assert_eq!(session.fansubber(0), Some("Judas"));
        assert_eq!(
            session.rss_url(0),
            Some(format_rss_url("Dandadan", "Judas").as_str())
        );
    }
}
