//! Nyaa.si feed URLs for tracked anime
//!
//! This module builds the RSS and search URLs a torrent client subscribes to,
//! recovers the fansub group from an existing feed URL, and checks whether a
//! feed actually lists any releases.

use std::time::Duration;

use anyhow::{Result, anyhow};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Fansub group used when nothing else is known
pub const DEFAULT_FANSUBBER: &str = "ember";

const FEED_HOST: &str = "https://nyaa.si";

/// Percent-encodes like a form value: spaces become `+`
fn quote_plus(text: &str) -> String {
    urlencoding::encode(text).replace("%20", "+")
}

/// Formats the RSS feed URL for an anime title and fansub group
///
/// Batch releases are excluded with a `-batch` term, and double quotes in the
/// title are swapped for apostrophes before encoding.
///
/// # Example
/// ```ignore
/// let url = format_rss_url("Sousou no Frieren", "ember");
/// assert_eq!(url, "https://nyaa.si/?page=rss&q=-batch+ember+Sousou+no+Frieren&c=0_0&f=0");
/// ```
pub fn format_rss_url(title: &str, fansubber: &str) -> String {
    let safe_fansubber = quote_plus(fansubber);
    let safe_title = quote_plus(&title.replace('"', "'"));

    format!(
        "{}/?page=rss&q=-batch+{}+{}&c=0_0&f=0",
        FEED_HOST, safe_fansubber, safe_title
    )
}

/// Formats the human-facing search page URL for an anime title
///
/// Only the fansub group is encoded; the title keeps its spaces so the
/// search box shows it as typed.
pub fn format_search_url(title: &str, fansubber: &str) -> String {
    let safe_fansubber = quote_plus(fansubber);
    let safe_title = title.replace('"', "'");

    format!(
        "{}/?f=0&c=0_0&q=-batch+{}+{}",
        FEED_HOST, safe_fansubber, safe_title
    )
}

/// Extracts the fansub group and search terms from a feed URL
///
/// # Returns
/// `(fansubber, search_terms)` where the search terms stay `+`-joined, or
/// `None` when the URL has no query or nothing follows `-batch`.
pub fn extract_from_rss_url(rss_url: &str) -> Option<(String, String)> {
    let q_param = rss_url.split("q=").nth(1)?.split('&').next()?;
    let q_param = urlencoding::decode(q_param).ok()?;
    let parts: Vec<&str> = q_param.split('+').collect();

    let batch_index = parts.iter().position(|p| *p == "-batch")?;
    let fansubber = parts.get(batch_index + 1)?;
    if fansubber.is_empty() {
        return None;
    }
    let search_terms = parts[batch_index + 2..].join("+");

    Some((fansubber.to_string(), search_terms))
}

/// Fansub group named in a feed URL, or [`DEFAULT_FANSUBBER`]
pub fn fansubber_from_rss_url(rss_url: &str) -> String {
    extract_from_rss_url(rss_url)
        .map(|(fansubber, _)| fansubber)
        .unwrap_or_else(|| DEFAULT_FANSUBBER.to_string())
}

/// Cheap syntactic check before a URL is handed to the torrent client
pub fn is_rss_url(url: &str) -> bool {
    url.to_lowercase().contains("rss")
        && (url.starts_with("http://") || url.starts_with("https://"))
}

/// Counts the releases listed in an RSS document
///
/// # Returns
/// `Some(count)` when the root has a `<channel>` with at least one `<item>`
/// and some item carries a `<link>`, `None` for a well-formed but empty or
/// linkless feed, and an error for malformed XML.
pub fn count_feed_items(xml: &str) -> Result<Option<usize>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut has_channel = false;
    let mut item_count = 0usize;
    let mut any_link = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                observe_element(&path, &name, &mut has_channel, &mut item_count, &mut any_link);
                path.push(name);
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                observe_element(&path, &name, &mut has_channel, &mut item_count, &mut any_link);
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "Error parsing feed XML at position {}: {:?}",
                    reader.buffer_position(),
                    e
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if has_channel && item_count > 0 && any_link {
        Ok(Some(item_count))
    } else {
        Ok(None)
    }
}

fn observe_element(
    path: &[String],
    name: &str,
    has_channel: &mut bool,
    item_count: &mut usize,
    any_link: &mut bool,
) {
    // Only <rss><channel><item><link> matters; nested lookalikes are ignored
    match (path.len(), name) {
        (1, "channel") => *has_channel = true,
        (2, "item") if path[1] == "channel" => *item_count += 1,
        (3, "link") if path[1] == "channel" && path[2] == "item" => *any_link = true,
        _ => {}
    }
}

/// Fetches a feed and reports how many releases it lists
///
/// Returns `None` for anything unusable: network errors, non-200 status, a
/// non-XML content type, malformed XML or a feed without linked items.
pub async fn validate_rss_feed(url: &str) -> Option<usize> {
    let response = match super::http_client()
        .get(url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Feed request failed for {}: {:?}", url, e);
            return None;
        }
    };

    let is_xml = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("xml"));

    if response.status() != reqwest::StatusCode::OK || !is_xml {
        tracing::debug!("Feed {} rejected: status {}", url, response.status());
        return None;
    }

    let xml = response.text().await.ok()?;
    match count_feed_items(&xml) {
        Ok(count) => count,
        Err(e) => {
            tracing::debug!("Feed {} is not valid XML: {:?}", url, e);
            None
        }
    }
}

/// Outcome of validating one feed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedValidation {
    pub url: String,
    pub episodes: Option<usize>,
}

impl FeedValidation {
    pub fn is_valid(&self) -> bool {
        self.episodes.is_some()
    }
}

/// Validates feeds one at a time with a pause between requests
///
/// `progress` is called with `(validated, total)` after each feed.
pub async fn validate_rss_feeds(
    urls: &[String],
    delay: Duration,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Vec<FeedValidation> {
    let total = urls.len();
    let mut results = Vec::with_capacity(total);

    for (i, url) in urls.iter().enumerate() {
        let episodes = validate_rss_feed(url).await;
        results.push(FeedValidation {
            url: url.clone(),
            episodes,
        });

        if let Some(callback) = progress.as_mut() {
            callback(i + 1, total);
        }

        if i + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss xmlns:atom="http://www.w3.org/2005/Atom" xmlns:nyaa="https://nyaa.si/xmlns/nyaa" version="2.0">
  <channel>
    <title>Nyaa - "-batch ember Sousou no Frieren" - Torrent File RSS</title>
    <link>https://nyaa.si/</link>
    <item>
      <title>[EMBER] Sousou no Frieren - 01 [1080p]</title>
      <link>https://nyaa.si/download/1.torrent</link>
      <nyaa:seeders>18</nyaa:seeders>
    </item>
    <item>
      <title>[EMBER] Sousou no Frieren - 02 [1080p]</title>
      <link>https://nyaa.si/download/2.torrent</link>
    </item>
  </channel>
</rss>"#;

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Nothing</title></channel></rss>"#;

    #[test]
    fn test_format_rss_url() {
        assert_eq!(
            format_rss_url("Sousou no Frieren", "ember"),
            "https://nyaa.si/?page=rss&q=-batch+ember+Sousou+no+Frieren&c=0_0&f=0"
        );
    }

    #[test]
    fn test_format_rss_url_encodes_special_characters() {
        let url = format_rss_url("Re:Zero \"Starting Life\"", "Erai-raws");
        assert_eq!(
            url,
            "https://nyaa.si/?page=rss&q=-batch+Erai-raws+Re%3AZero+%27Starting+Life%27&c=0_0&f=0"
        );
    }

    #[test]
    fn test_format_search_url_keeps_spaces() {
        assert_eq!(
            format_search_url("Dan \"Da\" Dan", "ember"),
            "https://nyaa.si/?f=0&c=0_0&q=-batch+ember+Dan 'Da' Dan"
        );
    }

    #[test]
    fn test_extract_from_rss_url() {
        let url = format_rss_url("Sousou no Frieren", "SubsPlease");
        assert_eq!(
            extract_from_rss_url(&url),
            Some(("SubsPlease".to_string(), "Sousou+no+Frieren".to_string()))
        );
    }

    #[test]
    fn test_extract_from_rss_url_without_terms() {
        assert_eq!(extract_from_rss_url("https://nyaa.si/?page=rss"), None);
        assert_eq!(
            extract_from_rss_url("https://nyaa.si/?page=rss&q=-batch&c=0_0"),
            None
        );
        assert_eq!(
            extract_from_rss_url("https://nyaa.si/?page=rss&q=frieren&c=0_0"),
            None
        );
    }

    #[test]
    fn test_fansubber_from_rss_url_falls_back() {
        assert_eq!(fansubber_from_rss_url("not a feed"), DEFAULT_FANSUBBER);
        assert_eq!(
            fansubber_from_rss_url(&format_rss_url("Dandadan", "Judas")),
            "Judas"
        );
    }

    #[test]
    fn test_is_rss_url() {
        assert!(is_rss_url("https://nyaa.si/?page=rss&q=x"));
        assert!(is_rss_url("http://example.com/RSS"));
        assert!(!is_rss_url("ftp://example.com/rss"));
        assert!(!is_rss_url("https://nyaa.si/?q=x"));
    }

    #[test]
    fn test_count_feed_items() {
        assert_eq!(count_feed_items(SAMPLE_FEED).unwrap(), Some(2));
        assert_eq!(count_feed_items(EMPTY_FEED).unwrap(), None);
        assert!(count_feed_items("<rss><channel><item></channel>").is_err());
    }

    #[test]
    fn test_count_feed_items_requires_links() {
        let xml = "<rss><channel><item><title>a</title></item></channel></rss>";
        assert_eq!(count_feed_items(xml).unwrap(), None);
    }

    #[tokio::test]
    async fn test_validate_rss_feed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/good");
                then.status(200)
                    .header("content-type", "application/xml")
                    .body(SAMPLE_FEED);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/html");
                then.status(200)
                    .header("content-type", "text/html")
                    .body("<html></html>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;

        assert_eq!(validate_rss_feed(&server.url("/good")).await, Some(2));
        assert_eq!(validate_rss_feed(&server.url("/html")).await, None);
        assert_eq!(validate_rss_feed(&server.url("/missing")).await, None);
    }

    #[tokio::test]
    async fn test_validate_rss_feeds_reports_progress() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/feed");
                then.status(200)
                    .header("content-type", "application/rss+xml; charset=utf-8")
                    .body(SAMPLE_FEED);
            })
            .await;

        let urls = vec![server.url("/feed"), server.url("/nope")];
        let mut calls = Vec::new();
        let mut record = |done: usize, total: usize| calls.push((done, total));

        let results = validate_rss_feeds(&urls, Duration::ZERO, Some(&mut record)).await;

        assert_eq!(calls, vec![(1, 2), (2, 2)]);
        assert!(results[0].is_valid());
        assert!(!results[1].is_valid());
    }
}
