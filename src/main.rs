use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use launchfeed::api::NewsApiClient;
use launchfeed::config::Config;
use launchfeed::error::ArticleError;
use launchfeed::paging::{ArticlePager, LoadState};
use launchfeed::repository::ArticleRepository;
use launchfeed::storage::{Article, Database, DatabaseError};
use launchfeed::util::{relative_time, single_line, truncate_to_width};

/// Width used when `COLUMNS` is unset or invalid
const DEFAULT_COLUMNS: usize = 100;

/// Get the config directory path (~/.config/launchfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("launchfeed"))
}

fn terminal_columns() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .filter(|&c: &usize| c > 0)
        .unwrap_or(DEFAULT_COLUMNS)
}

#[derive(Parser, Debug)]
#[command(name = "launchfeed", about = "Spaceflight news reader with an offline cache")]
struct Args {
    /// Config file (defaults to ~/.config/launchfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reset the article cache (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List articles, newest first
    List {
        /// Only articles whose title or summary contains this text
        #[arg(short, long)]
        query: Option<String>,

        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Read only from the cache
        #[arg(long)]
        offline: bool,
    },
    /// Show a single article
    Show {
        /// Article ID
        id: i64,
    },
}

fn remove_database(db_path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        let path = PathBuf::from(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
    }
    Ok(())
}

fn print_rows(rows: &[Article], columns: usize) {
    let now = Utc::now();
    for article in rows {
        let age = relative_time(&article.published_at, now);
        let prefix = format!("{:>7}  {:<16} ", article.id, age);
        let title = single_line(&article.title);
        let site = single_line(&article.news_site);
        let line = if site.is_empty() {
            title.into_owned()
        } else {
            format!("{title} ({site})")
        };
        let budget = columns.saturating_sub(prefix.len());
        println!("{prefix}{}", truncate_to_width(&line, budget));
    }
}

async fn list(mut pager: ArticlePager, pages: usize, columns: usize) -> Result<()> {
    if let LoadState::Error(e) = pager.refresh().await {
        eprintln!("Warning: could not refresh ({e}); showing cached articles");
    }
    if pager.is_empty() {
        println!("No articles.");
        return Ok(());
    }
    print_rows(&pager.items().cloned().collect::<Vec<_>>(), columns);

    for _ in 1..pages {
        let before = pager.len();
        match pager.append().await {
            LoadState::Error(e) => {
                eprintln!("Warning: could not load more articles ({e})");
                break;
            }
            LoadState::NotLoading {
                end_of_pagination_reached,
            } => {
                let added: Vec<Article> = pager.items().skip(before).cloned().collect();
                print_rows(&added, columns);
                if added.is_empty() || end_of_pagination_reached {
                    break;
                }
            }
        }
    }

    tracing::debug!(scope = %pager.scope(), loaded = pager.len(), "Listing done");
    Ok(())
}

async fn show(repo: &ArticleRepository, id: i64) -> Result<()> {
    let article = match repo.article(id).await {
        Ok(article) => article,
        Err(err @ ArticleError::NotFound { .. }) => {
            match err.cause() {
                Some(cause) if cause.is_transient() => {
                    eprintln!("Error: {err} (not cached, and the news service is unreachable: {cause})")
                }
                _ => eprintln!("Error: {err}"),
            }
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", single_line(&article.title));
    if !article.news_site.is_empty() {
        println!("{}", single_line(&article.news_site));
    }
    println!(
        "Published {} ({})",
        relative_time(&article.published_at, Utc::now()),
        article.published_at
    );
    println!("{}", article.url);
    if !article.image_url.is_empty() {
        println!("Image: {}", article.image_url);
    }
    if !article.summary.is_empty() {
        println!();
        println!("{}", single_line(&article.summary));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = config.database_path_in(&config_dir);
    if args.reset_db {
        remove_database(&db_path)?;
        eprintln!("Article cache reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: The article cache is locked by another process. Please try again.");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let client = NewsApiClient::new(&config.api_base_url, config.request_timeout())
        .context("Failed to create news API client")?;
    let repo = ArticleRepository::new(
        db,
        Arc::new(client),
        config.paging(),
        config.mediator_capacity(),
    );

    match args.command {
        Command::List {
            query,
            pages,
            offline,
        } => {
            let mut pager = repo.articles(query.as_deref());
            if offline {
                pager = pager.offline();
            }
            list(pager, pages.max(1), terminal_columns()).await
        }
        Command::Show { id } => show(&repo, id).await,
    }
}
