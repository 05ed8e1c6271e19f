pub mod anime_filter;
pub mod fetcher;
pub mod jikan;
pub mod qbittorrent;
pub mod rss;
pub mod season;

use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

/// Shared client for catalog and feed requests.
///
/// qBittorrent sessions need their own cookie store and build a separate client.
pub fn http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}
