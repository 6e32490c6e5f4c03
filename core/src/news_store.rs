//! News store: CMS articles.
//!
//! Publish latch: `publishedAt` is stamped the first time an article is
//! published and never moves again. Unpublishing keeps it; republishing
//! does not restamp it.

use crate::{
    clock::SharedClock,
    collection::Collection,
    config::StorageKeys,
    error::{LumaError, LumaResult},
    kv::SharedKv,
    rng::{record_id, StoreRng},
    types::{contains_ci, EntityId, Timestamp},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Product,
    Company,
    Security,
    Regulatory,
    Partnership,
    Engineering,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    pub category: NewsCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub author_id: EntityId,
    pub author_name: String,
    pub is_published: bool,
    #[serde(default)]
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub view_count: u64,
}

impl NewsArticle {
    /// The instant the article is listed under.
    pub fn listed_at(&self) -> Timestamp {
        self.published_at.unwrap_or(self.created_at)
    }

    fn set_published(&mut self, published: bool, now: Timestamp) {
        if published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.is_published = published;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    pub category: NewsCategory,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub is_published: bool,
}

/// Partial article edit. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<NewsCategory>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<Option<String>>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
    pub published: Option<bool>,
    pub category: Option<NewsCategory>,
    pub author_id: Option<EntityId>,
    pub search: Option<String>,
}

impl ArticleFilter {
    pub fn published_only() -> Self {
        Self {
            published: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, a: &NewsArticle) -> bool {
        if self.published.is_some_and(|p| p != a.is_published) {
            return false;
        }
        if self.category.is_some_and(|c| c != a.category) {
            return false;
        }
        if let Some(ref author) = self.author_id {
            if &a.author_id != author {
                return false;
            }
        }
        match self.search {
            Some(ref q) => {
                let q = q.to_lowercase();
                contains_ci(&a.title, &q)
                    || contains_ci(&a.excerpt, &q)
                    || contains_ci(&a.content, &q)
                    || a.tags.iter().any(|t| contains_ci(t, &q))
            }
            None => true,
        }
    }
}

pub struct NewsStore {
    articles: Collection<NewsArticle>,
    clock: SharedClock,
    rng: StoreRng,
}

impl NewsStore {
    pub fn open(kv: SharedKv, keys: &StorageKeys, clock: SharedClock, rng: StoreRng) -> Self {
        let mut articles = Collection::load(kv, &keys.news_articles);
        let now = clock.now();
        articles.seed_if_empty(|| seed_articles(now));
        Self {
            articles,
            clock,
            rng,
        }
    }

    pub fn create_article(
        &mut self,
        new: NewArticle,
        author_id: &str,
        author_name: &str,
    ) -> NewsArticle {
        let now = self.clock.now();
        let mut article = NewsArticle {
            id: record_id("news", now.timestamp_millis(), &mut self.rng),
            title: new.title,
            excerpt: new.excerpt,
            content: new.content,
            category: new.category,
            tags: new.tags,
            image_url: new.image_url,
            author_id: author_id.to_string(),
            author_name: author_name.to_string(),
            is_published: false,
            published_at: None,
            created_at: now,
            updated_at: now,
            view_count: 0,
        };
        article.set_published(new.is_published, now);
        log::info!("Article {} created (published: {})", article.id, article.is_published);
        self.articles.prepend(article.clone());
        article
    }

    pub fn update_article(&mut self, id: &str, update: ArticleUpdate) -> LumaResult<NewsArticle> {
        let now = self.clock.now();
        self.articles
            .update_where(
                |a| a.id == id,
                |a| {
                    if let Some(title) = update.title {
                        a.title = title;
                    }
                    if let Some(excerpt) = update.excerpt {
                        a.excerpt = excerpt;
                    }
                    if let Some(content) = update.content {
                        a.content = content;
                    }
                    if let Some(category) = update.category {
                        a.category = category;
                    }
                    if let Some(tags) = update.tags {
                        a.tags = tags;
                    }
                    if let Some(image_url) = update.image_url {
                        a.image_url = image_url;
                    }
                    if let Some(published) = update.is_published {
                        a.set_published(published, now);
                    }
                    a.updated_at = now;
                    a.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Article", id))
    }

    pub fn set_published(&mut self, id: &str, published: bool) -> LumaResult<NewsArticle> {
        self.update_article(
            id,
            ArticleUpdate {
                is_published: Some(published),
                ..ArticleUpdate::default()
            },
        )
    }

    pub fn delete_article(&mut self, id: &str) -> LumaResult<NewsArticle> {
        let removed = self
            .articles
            .remove_where(|a| a.id == id)
            .ok_or_else(|| LumaError::not_found("Article", id))?;
        log::info!("Article {id} deleted");
        Ok(removed)
    }

    pub fn get_article(&self, id: &str) -> LumaResult<NewsArticle> {
        self.articles
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| LumaError::not_found("Article", id))
    }

    pub fn record_view(&mut self, id: &str) -> LumaResult<NewsArticle> {
        self.articles
            .update_where(
                |a| a.id == id,
                |a| {
                    a.view_count += 1;
                    a.clone()
                },
            )
            .ok_or_else(|| LumaError::not_found("Article", id))
    }

    /// Matching articles, newest listing first.
    pub fn get_articles(&self, filter: &ArticleFilter) -> Vec<NewsArticle> {
        let mut rows: Vec<NewsArticle> = self
            .articles
            .items()
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.listed_at().cmp(&a.listed_at()));
        rows
    }
}

// ── Demo data ──────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn demo_article(
    id: &str,
    title: &str,
    excerpt: &str,
    content: &str,
    category: NewsCategory,
    tags: &[&str],
    published: bool,
    at: Timestamp,
) -> NewsArticle {
    NewsArticle {
        id: id.to_string(),
        title: title.to_string(),
        excerpt: excerpt.to_string(),
        content: content.to_string(),
        category,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image_url: None,
        author_id: "admin_001".to_string(),
        author_name: "CipherLuma Team".to_string(),
        is_published: published,
        published_at: published.then_some(at),
        created_at: at,
        updated_at: at,
        view_count: 0,
    }
}

fn seed_articles(now: Timestamp) -> Vec<NewsArticle> {
    vec![
        demo_article(
            "news_seed_001",
            "Instant EUR payouts are live",
            "SEPA Instant is now available on every business plan.",
            "Business customers can now settle EUR payouts in seconds over SEPA Instant.",
            NewsCategory::Product,
            &["payouts", "sepa"],
            true,
            now - Duration::days(1),
        ),
        demo_article(
            "news_seed_002",
            "Our 2024 security audit results",
            "An independent audit found no critical issues.",
            "We commissioned a full third-party review of our platform. Here is what it covered.",
            NewsCategory::Security,
            &["audit", "security"],
            true,
            now - Duration::days(14),
        ),
        demo_article(
            "news_seed_003",
            "Partnering with Kora Microfinance",
            "Bringing low-cost remittances to East Africa.",
            "Draft announcement pending legal review.",
            NewsCategory::Partnership,
            &["partners", "kenya"],
            false,
            now - Duration::days(3),
        ),
    ]
}
