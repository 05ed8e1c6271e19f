mod config;
mod logging;
mod scraper;
mod store;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};

use config::AppConfig;
use scraper::fetcher::SeasonalFetcher;
use scraper::jikan::JikanClient;
use scraper::qbittorrent::{self, QBittorrentClient};
use scraper::rss;
use scraper::season::{self, Season};
use store::models::AnimeRecord;
use store::{EditSession, SortOrder};

#[derive(Parser)]
#[command(version, about = "Curate seasonal anime and push their feeds to qBittorrent")]
struct Opts {
    /// Directory holding saved lists (overrides SAVE_DIR)
    #[arg(long)]
    save_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, filter and save a season's anime
    Fetch {
        #[arg(long)]
        season: Option<Season>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        min_members: Option<u64>,
        /// Print the list without saving it
        #[arg(long)]
        no_save: bool,
    },
    /// List saved anime lists, newest first
    List,
    /// Print a saved list
    Show {
        file: String,
        #[arg(long, default_value = "original")]
        sort: SortOrder,
    },
    /// Edit one entry of a saved list in place
    Edit {
        file: String,
        index: usize,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        fansubber: Option<String>,
        #[arg(long)]
        rss: Option<String>,
        /// Rebuild the feed URL from title and fansubber
        #[arg(long)]
        reset_rss: bool,
    },
    /// Check that every feed of a saved list lists releases
    Validate { file: String },
    /// Add feeds and auto-download rules for a saved list
    Push {
        file: String,
        #[arg(long)]
        season: Option<Season>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Show qBittorrent version and RSS counts
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let opts = Opts::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = opts.save_dir {
        config.save_dir = dir;
    }

    match opts.command {
        Command::Fetch {
            season,
            year,
            min_members,
            no_save,
        } => fetch(&config, season, year, min_members, no_save).await,
        Command::List => list(&config),
        Command::Show { file, sort } => show(&config, &file, sort),
        Command::Edit {
            file,
            index,
            title,
            fansubber,
            rss,
            reset_rss,
        } => edit(&config, &file, index, title, fansubber, rss, reset_rss),
        Command::Validate { file } => validate(&config, &file).await,
        Command::Push { file, season, year } => push(&config, &file, season, year).await,
        Command::Status => status(&config).await,
    }
}

async fn fetch(
    config: &AppConfig,
    season: Option<Season>,
    year: Option<i32>,
    min_members: Option<u64>,
    no_save: bool,
) -> Result<()> {
    let mut fetcher_config = config.fetcher_config();
    if let Some(min_members) = min_members {
        fetcher_config.min_members = min_members;
    }

    let (season, year) =
        scraper::fetcher::resolve_season(season, year, Local::now().date_naive());

    let fetcher = SeasonalFetcher::new(JikanClient::new(&config.jikan_base_url), fetcher_config);
    tracing::info!(
        "Fetching anime for Season: {} | Year: {} | Min Members: {}",
        season,
        year,
        fetcher.config().min_members
    );
    let mut report = |current: u32, total: u32| {
        println!("Fetching page {} of {}", current, total);
    };
    let anime_list = fetcher
        .fetch_seasonal_anime(Some(season), Some(year), Some(&mut report))
        .await;

    if anime_list.is_empty() {
        tracing::warn!("No anime found for {} {}", season, year);
        return Ok(());
    }

    println!("### {} {} Anime", season.capitalized(), year);
    println!("Found {} anime.", anime_list.len());
    print_list(&anime_list);

    if !no_save {
        let filename = store::save_anime_list(&config.save_dir, &anime_list, season, year)?;
        println!("Successfully saved to {}", filename);
    }

    Ok(())
}

fn list(config: &AppConfig) -> Result<()> {
    let files = store::list_saved_files(&config.save_dir)?;
    if files.is_empty() {
        println!("No saved lists found");
        return Ok(());
    }

    for file in files {
        println!("{:<50} {}", file, store::display_name(&file));
    }
    Ok(())
}

fn show(config: &AppConfig, file: &str, sort: SortOrder) -> Result<()> {
    let anime_list = store::load_anime_list(&config.save_dir, file)?;

    let duplicates = store::duplicate_titles(&anime_list);
    if !duplicates.is_empty() {
        tracing::warn!("Duplicate titles detected: {}", duplicates.join(", "));
    }

    print_list(&store::sort_anime_list(anime_list, sort));
    Ok(())
}

fn edit(
    config: &AppConfig,
    file: &str,
    index: usize,
    title: Option<String>,
    fansubber: Option<String>,
    rss_url: Option<String>,
    reset_rss: bool,
) -> Result<()> {
    let anime_list = store::load_anime_list(&config.save_dir, file)?;
    if index >= anime_list.len() {
        bail!(
            "Entry {} does not exist; {} has {} entries",
            index,
            file,
            anime_list.len()
        );
    }

    let mut session = EditSession::for_list(&anime_list);
    if let Some(title) = title {
        session.set_title(index, &title);
    }
    if let Some(fansubber) = fansubber {
        session.set_fansubber(index, &fansubber);
    }
    if reset_rss {
        session.reset_rss_url(index);
    }
    if let Some(rss_url) = rss_url {
        if !rss::is_rss_url(&rss_url) {
            tracing::warn!("'{}' does not look like an RSS URL", rss_url);
        }
        session.set_rss_url(index, &rss_url);
    }

    let updated = session.apply(&anime_list);
    store::write_anime_list(&config.save_dir.join(file), &updated)?;

    let title = session.title(index).unwrap_or_default();
    let fansubber = session.fansubber(index).unwrap_or_default();
    println!("{}", title);
    println!("  fansubber: {}", fansubber);
    println!(
        "  rss:       {}{}",
        session.rss_url(index).unwrap_or_default(),
        if session.is_manual_rss(index) { " (manual)" } else { "" }
    );
    println!("  search:    {}", rss::format_search_url(title, fansubber));
    Ok(())
}

async fn validate(config: &AppConfig, file: &str) -> Result<()> {
    let anime_list = store::load_anime_list(&config.save_dir, file)?;
    let urls: Vec<String> = anime_list.iter().map(|a| a.rss_url.clone()).collect();

    let mut report = |done: usize, total: usize| {
        tracing::debug!("Validated {}/{} feeds", done, total);
    };
    let results = rss::validate_rss_feeds(
        &urls,
        std::time::Duration::from_millis(500),
        Some(&mut report),
    )
    .await;

    for (anime, result) in anime_list.iter().zip(&results) {
        match result.episodes {
            Some(count) => println!("OK    {:<50} {} episode(s)", anime.title, count),
            None => println!("EMPTY {:<50} {}", anime.title, result.url),
        }
    }
    let valid = results.iter().filter(|r| r.is_valid()).count();
    println!("{}/{} feeds have releases", valid, results.len());
    Ok(())
}

async fn push(
    config: &AppConfig,
    file: &str,
    season: Option<Season>,
    year: Option<i32>,
) -> Result<()> {
    let anime_list = store::load_anime_list(&config.save_dir, file)?;
    if anime_list.is_empty() {
        bail!("{} is empty", file);
    }

    let (default_season, default_year) = store::parse_filename(file)
        .unwrap_or_else(|| season::current_season(&Local::now().date_naive()));
    let season = season.unwrap_or(default_season);
    let year = year.unwrap_or(default_year);

    let client = QBittorrentClient::new(&config.qb_base_url, &config.qb_user, &config.qb_password)?;
    client
        .login()
        .await
        .context("Please check the qBittorrent connection settings")?;

    let mut report = |current: usize, total: usize, title: &str| {
        println!("[{}/{}] Processing: {}", current, total, title);
    };
    let results = qbittorrent::push_anime_list(
        &client,
        &anime_list,
        season,
        year,
        &config.push_settings(),
        Some(&mut report),
    )
    .await;

    if !results.successful.is_empty() {
        println!("Successfully added {} anime", results.successful.len());
    }
    for title in &results.failed {
        println!("Failed to add rule: {}", title);
    }
    for title in &results.unavailable {
        println!("Unavailable RSS feed: {}", title);
    }
    Ok(())
}

async fn status(config: &AppConfig) -> Result<()> {
    let client = QBittorrentClient::new(&config.qb_base_url, &config.qb_user, &config.qb_password)?;
    client.login().await?;

    let status = qbittorrent::client_status(&client).await?;
    println!("qBittorrent {}", status.version);
    println!("RSS feeds: {}", status.feeds);
    println!("RSS rules: {}", status.rules);
    Ok(())
}

fn print_list(anime_list: &[AnimeRecord]) {
    for (index, anime) in anime_list.iter().enumerate() {
        println!(
            "{:>3}. {} [{}] {} members, {} eps, {}",
            index,
            anime.title,
            anime.kind,
            anime.members,
            anime.episodes,
            anime.date
        );
        if !anime.genres.is_empty() {
            println!("     {}", anime.genres.join(", "));
        }
        println!("     {}", anime.rss_url);
    }
}
