use serde::Deserialize;

use crate::storage::Article;

/// One article as served by the news API.
///
/// Unknown fields are ignored. `image_url`, `news_site` and `summary` may be
/// missing or null; they become empty strings when converted to [`Article`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteArticle {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub news_site: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub published_at: String,
}

impl RemoteArticle {
    pub fn into_article(self) -> Article {
        Article {
            id: self.id,
            title: self.title,
            url: self.url,
            image_url: self.image_url.unwrap_or_default(),
            news_site: self.news_site.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            published_at: self.published_at,
        }
    }
}

/// Envelope of `GET /articles/`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleListResponse {
    pub count: i64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<RemoteArticle>,
}

/// One page of remote results plus the size of the full result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePage {
    pub items: Vec<RemoteArticle>,
    pub total_count: i64,
}

impl From<ArticleListResponse> for ArticlePage {
    fn from(response: ArticleListResponse) -> Self {
        Self {
            items: response.results,
            total_count: response.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_optional_fields_default_to_empty() {
        let json = r#"{
            "id": 7,
            "title": "Starship",
            "url": "https://example.com/7",
            "published_at": "2024-03-14T12:00:00Z"
        }"#;
        let article = serde_json::from_str::<RemoteArticle>(json)
            .unwrap()
            .into_article();

        assert_eq!(article.image_url, "");
        assert_eq!(article.news_site, "");
        assert_eq!(article.summary, "");
    }

    #[test]
    fn test_null_optional_fields_default_to_empty() {
        let json = r#"{
            "id": 7,
            "title": "Starship",
            "url": "https://example.com/7",
            "image_url": null,
            "news_site": "SpaceNews",
            "summary": null,
            "published_at": "2024-03-14T12:00:00Z"
        }"#;
        let article = serde_json::from_str::<RemoteArticle>(json)
            .unwrap()
            .into_article();

        assert_eq!(article.image_url, "");
        assert_eq!(article.news_site, "SpaceNews");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": 1,
                "title": "t",
                "url": "u",
                "published_at": "p",
                "featured": true,
                "launches": [{"id": "abc", "provider": "SpaceX"}],
                "updated_at": "2024-01-01T00:00:00Z"
            }]
        }"#;
        let page: ArticlePage = serde_json::from_str::<ArticleListResponse>(json)
            .unwrap()
            .into();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 1);
    }

    #[test]
    fn test_missing_required_field_is_error() {
        let json = r#"{"id": 1, "url": "u", "published_at": "p"}"#;
        assert!(serde_json::from_str::<RemoteArticle>(json).is_err());
    }
}
