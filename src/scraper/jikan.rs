//! Jikan (MyAnimeList) seasonal catalog client
//!
//! The catalog is served page by page from
//! `{base}/seasons/{year}/{season}?page={n}`. Every field of an entry is
//! optional on the wire, so the raw types here default everything and a
//! single odd entry never fails a whole page.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::season::Season;

pub const DEFAULT_BASE_URL: &str = "https://api.jikan.moe/v4";

/// One page of the seasonal listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub data: Option<Vec<CatalogEntry>>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: Option<u32>,
    #[serde(default)]
    pub has_next_page: Option<bool>,
}

impl Pagination {
    pub fn last_visible_page(&self) -> u32 {
        self.last_visible_page.unwrap_or(1)
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page.unwrap_or(false)
    }
}

/// A raw catalog entry, as returned by the API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub mal_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub members: Option<u64>,
    #[serde(default)]
    pub producers: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub aired: Option<Aired>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub images: Option<Images>,
    #[serde(default)]
    pub source: Option<String>,
}

impl CatalogEntry {
    pub fn members(&self) -> u64 {
        self.members.unwrap_or(0)
    }

    pub fn producer_names(&self) -> impl Iterator<Item = &str> {
        self.producers
            .iter()
            .flatten()
            .filter_map(|p| p.name.as_deref())
    }

    pub fn aired_from(&self) -> Option<&str> {
        self.aired.as_ref().and_then(|a| a.from.as_deref())
    }

    pub fn image_url(&self) -> Option<&str> {
        self.images
            .as_ref()
            .and_then(|i| i.jpg.as_ref())
            .and_then(|jpg| jpg.image_url.as_deref())
    }
}

/// `{ "name": ... }` reference used for producers and genres
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Aired {
    #[serde(default)]
    pub from: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Images {
    #[serde(default)]
    pub jpg: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Source of seasonal catalog pages
///
/// Any transport failure, non-success status or unreadable body is an `Err`.
#[allow(async_fn_in_trait)]
pub trait CatalogClient {
    async fn fetch_page(&self, year: i32, season: Season, page: u32) -> Result<CatalogPage>;
}

/// Catalog client backed by the public Jikan REST API
#[derive(Debug, Clone)]
pub struct JikanClient {
    base_url: String,
}

impl JikanClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn page_url(&self, year: i32, season: Season, page: u32) -> String {
        format!(
            "{}/seasons/{}/{}?page={}",
            self.base_url, year, season, page
        )
    }
}

impl Default for JikanClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl CatalogClient for JikanClient {
    async fn fetch_page(&self, year: i32, season: Season, page: u32) -> Result<CatalogPage> {
        let url = self.page_url(year, season, page);
        tracing::info!("Fetching page {} from: {}", page, url);

        let response = super::http_client()
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch catalog page from {}", url))?
            .error_for_status()
            .with_context(|| format!("Catalog returned an error status for {}", url))?;

        let page = response
            .json::<CatalogPage>()
            .await
            .with_context(|| format!("Failed to parse catalog page from {}", url))?;

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_page_url() {
        let client = JikanClient::new("https://api.jikan.moe/v4/");
        assert_eq!(
            client.page_url(2024, Season::Fall, 3),
            "https://api.jikan.moe/v4/seasons/2024/fall?page=3"
        );
    }

    #[test]
    fn test_entry_with_nulls_deserializes() {
        let entry: CatalogEntry = serde_json::from_value(json!({
            "mal_id": 52991,
            "title": "Sousou no Frieren",
            "type": "TV",
            "members": null,
            "producers": null,
            "aired": { "from": null },
            "score": null,
            "episodes": null,
            "images": { "jpg": { "image_url": "https://cdn.example/frieren.jpg" } }
        }))
        .unwrap();

        assert_eq!(entry.members(), 0);
        assert_eq!(entry.producer_names().count(), 0);
        assert!(entry.aired_from().is_none());
        assert_eq!(entry.image_url(), Some("https://cdn.example/frieren.jpg"));
    }

    #[test]
    fn test_page_without_data() {
        let page: CatalogPage = serde_json::from_value(json!({ "status": 404 })).unwrap();
        assert!(page.data.is_none());
        assert!(page.pagination.is_none());
    }

    #[test]
    fn test_pagination_defaults() {
        let pagination = Pagination::default();
        assert_eq!(pagination.last_visible_page(), 1);
        assert!(!pagination.has_next_page());
    }

    #[tokio::test]
    async fn test_fetch_page_from_mock_server() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/seasons/2025/spring")
                    .query_param("page", "1");
                then.status(200).json_body(json!({
                    "pagination": { "last_visible_page": 1, "has_next_page": false },
                    "data": [ { "mal_id": 1, "title": "Test Anime", "members": 9000 } ]
                }));
            })
            .await;

        let client = JikanClient::new(&server.base_url());
        let page = client.fetch_page(2025, Season::Spring, 1).await.unwrap();

        mock.assert_async().await;
        let data = page.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].title.as_deref(), Some("Test Anime"));
    }

    #[tokio::test]
    async fn test_fetch_page_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/seasons/2025/spring");
                then.status(429);
            })
            .await;

        let client = JikanClient::new(&server.base_url());
        assert!(client.fetch_page(2025, Season::Spring, 1).await.is_err());
    }
}
