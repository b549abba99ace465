//! In-process `ArticleSource` used by the paging and repository tests.
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{ApiError, ArticlePage, ArticleSource, RemoteArticle};

#[derive(Debug, Clone, Copy)]
pub(crate) enum FakeFailure {
    Status(u16),
    Timeout,
}

impl FakeFailure {
    fn to_error(self) -> ApiError {
        match self {
            FakeFailure::Status(status) => ApiError::Status(status),
            FakeFailure::Timeout => ApiError::Timeout,
        }
    }
}

/// Remote article `index` in feed order; lower indexes are newer.
pub(crate) fn remote_article(index: usize) -> RemoteArticle {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let published = base - ChronoDuration::minutes(index as i64);
    RemoteArticle {
        id: index as i64 + 1,
        title: format!("Article {}", index + 1),
        url: format!("https://news.example.com/{}", index + 1),
        image_url: None,
        news_site: Some("Fake Wire".to_string()),
        summary: Some(format!("Summary of article {}", index + 1)),
        published_at: published.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

pub(crate) struct FakeSource {
    articles: Vec<RemoteArticle>,
    failure: Mutex<Option<FakeFailure>>,
    delay: Duration,
    ignore_case: bool,
    offsets: Mutex<Vec<usize>>,
    searches: Mutex<Vec<Option<String>>>,
    article_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn with_articles(count: usize) -> Self {
        Self::from_articles((0..count).map(remote_article).collect())
    }

    pub(crate) fn from_articles(articles: Vec<RemoteArticle>) -> Self {
        Self {
            articles,
            failure: Mutex::new(None),
            delay: Duration::ZERO,
            ignore_case: false,
            offsets: Mutex::new(Vec::new()),
            searches: Mutex::new(Vec::new()),
            article_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Match search terms regardless of ASCII case, as the live service does.
    pub(crate) fn with_case_insensitive_search(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub(crate) fn fail_with(&self, failure: Option<FakeFailure>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub(crate) fn offsets(&self) -> Vec<usize> {
        self.offsets.lock().unwrap().clone()
    }

    pub(crate) fn searches(&self) -> Vec<Option<String>> {
        self.searches.lock().unwrap().clone()
    }

    pub(crate) fn page_calls(&self) -> usize {
        self.offsets.lock().unwrap().len()
    }

    pub(crate) fn article_calls(&self) -> usize {
        self.article_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl FakeSource {
    fn title_matches(&self, title: &str, query: &str) -> bool {
        if self.ignore_case {
            title.to_ascii_lowercase().contains(&query.to_ascii_lowercase())
        } else {
            title.contains(query)
        }
    }
}

#[async_trait]
impl ArticleSource for FakeSource {
    async fn fetch_page(
        &self,
        limit: usize,
        offset: usize,
        search: Option<&str>,
    ) -> Result<ArticlePage, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.offsets.lock().unwrap().push(offset);
        self.searches.lock().unwrap().push(search.map(str::to_string));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(failure) = *self.failure.lock().unwrap() {
            return Err(failure.to_error());
        }

        let matching: Vec<&RemoteArticle> = self
            .articles
            .iter()
            .filter(|a| search.map_or(true, |q| self.title_matches(&a.title, q)))
            .collect();
        let items = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|a| (*a).clone())
            .collect();

        Ok(ArticlePage {
            items,
            total_count: matching.len() as i64,
        })
    }

    async fn fetch_article(&self, id: i64) -> Result<RemoteArticle, ApiError> {
        self.article_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = *self.failure.lock().unwrap() {
            return Err(failure.to_error());
        }
        self.articles
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(ApiError::Status(404))
    }
}
