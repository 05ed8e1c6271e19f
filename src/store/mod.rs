pub mod lists;
pub mod session;

// Saved-list operations used by the CLI
pub use lists::{
    SortOrder, display_name, duplicate_titles, list_saved_files, load_anime_list,
    parse_filename, save_anime_list, sort_anime_list, write_anime_list,
};
pub use session::EditSession;

/// Data models for saved anime lists
pub mod models {
    use std::fmt;

    use serde::{Deserialize, Serialize};

    use crate::scraper::rss::DEFAULT_FANSUBBER;

    /// Episode count, or `"?"` while the catalog does not know it yet
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum EpisodeCount {
        Known(u32),
        Unknown(String),
    }

    impl Default for EpisodeCount {
        fn default() -> Self {
            EpisodeCount::Unknown("?".to_string())
        }
    }

    impl From<Option<u32>> for EpisodeCount {
        fn from(value: Option<u32>) -> Self {
            value.map(EpisodeCount::Known).unwrap_or_default()
        }
    }

    impl fmt::Display for EpisodeCount {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                EpisodeCount::Known(n) => write!(f, "{}", n),
                EpisodeCount::Unknown(marker) => f.write_str(marker),
            }
        }
    }

    /// An anime that passed the seasonal filters, with its download feed
    ///
    /// Field names match the saved JSON files.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct AnimeRecord {
        pub title: String,
        pub date: String,
        pub synopsis: String,
        #[serde(default)]
        pub genres: Vec<String>,
        #[serde(default)]
        pub score: f64,
        #[serde(default)]
        pub members: u64,
        #[serde(default)]
        pub episodes: EpisodeCount,
        pub status: String,
        #[serde(default)]
        pub image_url: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub source: String,
        #[serde(default)]
        pub mal_id: Option<u64>,
        #[serde(rename = "rssUrl", default)]
        pub rss_url: String,
        #[serde(default = "default_fansubber")]
        pub fansubber: String,
    }

    fn default_fansubber() -> String {
        DEFAULT_FANSUBBER.to_string()
    }
}
