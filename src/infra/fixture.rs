//! In-process content store backed by a JSON dataset file.
//!
//! The dataset holds `categories` and `posts` documents in the content
//! store's own shape. Posts reference categories by `_id`, either as a bare
//! string or as `{ "_ref": "<id>" }`. Queries are answered with the same
//! projections the hosted store returns, so the blog service cannot tell the
//! two apart.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::application::queries::{ContentQuery, QueryKind, RELATED_LIMIT};
use crate::application::repos::{ContentStore, StoreError};
use crate::domain::entities::PostSummary;
use crate::domain::posts::newest_first;

use super::error::InfraError;

#[derive(Debug, Default, Deserialize)]
struct Dataset {
    #[serde(default)]
    categories: Vec<Map<String, Value>>,
    #[serde(default)]
    posts: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone)]
struct FixtureCategory {
    id: String,
    title: String,
    projected: Value,
}

#[derive(Debug, Clone)]
struct FixturePost {
    summary: PostSummary,
    category_ids: Vec<String>,
    projected: Value,
    body: Value,
}

#[derive(Debug, Clone)]
pub struct FixtureStore {
    categories: Vec<FixtureCategory>,
    /// Newest first, undated posts last.
    posts: Vec<FixturePost>,
}

impl FixtureStore {
    /// Read and index a dataset file.
    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let bytes = tokio::fs::read(path).await?;
        let dataset: Value = serde_json::from_slice(&bytes).map_err(|err| {
            InfraError::configuration(format!(
                "fixture dataset `{}` is not valid JSON: {err}",
                path.display()
            ))
        })?;
        let store = Self::from_value(dataset)?;
        info!(
            target = "infra::fixture",
            path = %path.display(),
            posts = store.posts.len(),
            categories = store.categories.len(),
            "Loaded fixture dataset"
        );
        Ok(store)
    }

    pub fn from_value(dataset: Value) -> Result<Self, InfraError> {
        let dataset: Dataset = serde_json::from_value(dataset).map_err(|err| {
            InfraError::configuration(format!("malformed fixture dataset: {err}"))
        })?;

        let categories: Vec<FixtureCategory> = dataset
            .categories
            .iter()
            .filter_map(|document| {
                let id = document.get("_id")?.as_str()?.to_string();
                let title = document
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let projected = json!({
                    "_id": id,
                    "title": title,
                    "slug": field(document, "slug"),
                });
                Some(FixtureCategory {
                    id,
                    title,
                    projected,
                })
            })
            .collect();

        let by_id: HashMap<&str, &FixtureCategory> = categories
            .iter()
            .map(|category| (category.id.as_str(), category))
            .collect();

        let mut posts = Vec::with_capacity(dataset.posts.len());
        for document in &dataset.posts {
            let category_ids = reference_ids(document.get("categories"));
            let resolved: Vec<Value> = category_ids
                .iter()
                .filter_map(|id| by_id.get(id.as_str()))
                .map(|category| category.projected.clone())
                .collect();

            let projected = json!({
                "_id": field(document, "_id"),
                "title": field(document, "title"),
                "slug": field(document, "slug"),
                "publishedAt": field(document, "publishedAt"),
                "tags": field(document, "tags"),
                "categories": resolved,
                "mainImageUrl": field(document, "mainImageUrl"),
            });
            let summary: PostSummary =
                serde_json::from_value(projected.clone()).map_err(|err| {
                    InfraError::configuration(format!(
                        "fixture post {} is malformed: {err}",
                        field(document, "_id")
                    ))
                })?;
            if summary.slug.is_empty() {
                continue;
            }

            posts.push(FixturePost {
                summary,
                category_ids,
                projected,
                body: field(document, "body"),
            });
        }
        posts.sort_by(|left, right| newest_first(&left.summary, &right.summary));

        Ok(Self { categories, posts })
    }

    fn evaluate(&self, kind: &QueryKind) -> Value {
        match kind {
            QueryKind::Categories => self.categories_with_counts(),
            QueryKind::PostList {
                category,
                start,
                end,
            } => {
                let skip = usize::try_from(*start).unwrap_or(usize::MAX);
                let take = usize::try_from(end.saturating_sub(*start)).unwrap_or(usize::MAX);
                Value::Array(
                    self.in_category(category.as_deref())
                        .skip(skip)
                        .take(take)
                        .map(|post| post.projected.clone())
                        .collect(),
                )
            }
            QueryKind::PostCount { category } => json!(self.in_category(category.as_deref()).count()),
            QueryKind::PostDetail { slug } => self
                .posts
                .iter()
                .find(|post| post.summary.slug == *slug)
                .map(|post| {
                    let mut detail = post.projected.clone();
                    if let Value::Object(fields) = &mut detail {
                        fields.insert("body".into(), post.body.clone());
                    }
                    detail
                })
                .unwrap_or(Value::Null),
            QueryKind::RelatedPosts {
                slug,
                category_slugs,
                tags,
            } => Value::Array(
                self.others(slug)
                    .filter(|post| {
                        post.summary
                            .category_slugs()
                            .iter()
                            .any(|candidate| category_slugs.contains(candidate))
                            || post.summary.tags.iter().any(|tag| tags.contains(tag))
                    })
                    .take(RELATED_LIMIT)
                    .map(|post| post.projected.clone())
                    .collect(),
            ),
            QueryKind::LatestExcept { slug } => Value::Array(
                self.others(slug)
                    .take(RELATED_LIMIT)
                    .map(|post| post.projected.clone())
                    .collect(),
            ),
        }
    }

    fn categories_with_counts(&self) -> Value {
        let mut counted: Vec<(&FixtureCategory, usize)> = self
            .categories
            .iter()
            .map(|category| {
                let count = self
                    .posts
                    .iter()
                    .filter(|post| post.category_ids.contains(&category.id))
                    .count();
                (category, count)
            })
            .collect();
        counted.sort_by(|(left, left_count), (right, right_count)| {
            right_count
                .cmp(left_count)
                .then_with(|| left.title.cmp(&right.title))
        });

        Value::Array(
            counted
                .into_iter()
                .map(|(category, count)| {
                    let mut projected = category.projected.clone();
                    if let Value::Object(fields) = &mut projected {
                        fields.insert("count".into(), json!(count));
                    }
                    projected
                })
                .collect(),
        )
    }

    fn in_category<'a>(&'a self, category: Option<&'a str>) -> impl Iterator<Item = &'a FixturePost> {
        self.posts.iter().filter(move |post| match category {
            Some(slug) => post
                .summary
                .categories
                .iter()
                .any(|candidate| candidate.slug.as_deref() == Some(slug)),
            None => true,
        })
    }

    fn others<'a>(&'a self, slug: &'a str) -> impl Iterator<Item = &'a FixturePost> {
        self.posts.iter().filter(move |post| post.summary.slug != slug)
    }
}

#[async_trait]
impl ContentStore for FixtureStore {
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, StoreError> {
        Ok(self.evaluate(query.kind()))
    }
}

fn field(document: &Map<String, Value>, key: &str) -> Value {
    document.get(key).cloned().unwrap_or(Value::Null)
}

fn reference_ids(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(id) => Some(id.clone()),
            Value::Object(reference) => reference
                .get("_ref")
                .or_else(|| reference.get("_id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::application::pagination::PageWindow;
    use crate::domain::entities::{CategoryWithCount, PostDetail};

    use super::*;

    fn dataset() -> Value {
        json!({
            "categories": [
                { "_id": "c-money", "title": "Money", "slug": { "current": "money" } },
                { "_id": "c-love", "title": "Love", "slug": { "current": "love" } },
                { "_id": "c-empty", "title": "Empty", "slug": { "current": "empty" } }
            ],
            "posts": [
                {
                    "_id": "p1", "title": "Oldest", "slug": { "current": "oldest" },
                    "publishedAt": "2023-01-01T00:00:00Z", "tags": ["tax"],
                    "categories": ["c-money"]
                },
                {
                    "_id": "p2", "title": "Newest", "slug": { "current": "newest" },
                    "publishedAt": "2024-06-01T00:00:00Z", "tags": ["dating"],
                    "categories": [{ "_ref": "c-love" }],
                    "body": [{ "_type": "block", "children": [] }]
                },
                {
                    "_id": "p3", "title": "Middle", "slug": { "current": "middle" },
                    "publishedAt": "2024-01-01T00:00:00Z", "tags": ["tax"],
                    "categories": ["c-money", "missing"]
                },
                { "_id": "draft", "title": "Draft", "slug": { "current": "draft" } },
                { "_id": "noslug", "title": "No slug" }
            ]
        })
    }

    fn store() -> FixtureStore {
        FixtureStore::from_value(dataset()).expect("valid dataset")
    }

    async fn fetch<T: serde::de::DeserializeOwned>(query: ContentQuery) -> T {
        let value = store().fetch(&query).await.expect("fixture fetch");
        serde_json::from_value(value).expect("decode")
    }

    fn slugs(posts: &[PostSummary]) -> Vec<&str> {
        posts.iter().map(|post| post.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn lists_newest_first_with_drafts_last() {
        let posts: Vec<PostSummary> =
            fetch(ContentQuery::post_list(None, PageWindow::new(1, 10))).await;
        assert_eq!(slugs(&posts), vec!["newest", "middle", "oldest", "draft"]);
    }

    #[tokio::test]
    async fn list_and_count_share_category_filter() {
        let posts: Vec<PostSummary> =
            fetch(ContentQuery::post_list(Some("money"), PageWindow::new(1, 10))).await;
        assert_eq!(slugs(&posts), vec!["middle", "oldest"]);
        let count: u64 = fetch(ContentQuery::post_count(Some("money"))).await;
        assert_eq!(count, 2);
        let count: u64 = fetch(ContentQuery::post_count(Some("unknown"))).await;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn list_slices_by_window() {
        let posts: Vec<PostSummary> =
            fetch(ContentQuery::post_list(None, PageWindow::new(2, 3))).await;
        assert_eq!(slugs(&posts), vec!["draft"]);
    }

    #[tokio::test]
    async fn categories_carry_counts_in_store_order() {
        let categories: Vec<CategoryWithCount> = fetch(ContentQuery::categories()).await;
        let summary: Vec<(&str, u64)> = categories
            .iter()
            .map(|category| (category.title(), category.count))
            .collect();
        assert_eq!(summary, vec![("Money", 2), ("Love", 1), ("Empty", 0)]);
    }

    #[tokio::test]
    async fn detail_includes_body_and_resolved_categories() {
        let detail: Option<PostDetail> = fetch(ContentQuery::post_detail("newest")).await;
        let detail = detail.expect("post exists");
        assert_eq!(detail.summary.category_slugs(), vec!["love".to_string()]);
        assert!(detail.body.is_array());

        let missing: Option<PostDetail> = fetch(ContentQuery::post_detail("nope")).await;
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn related_matches_category_or_tag_and_excludes_self() {
        let related: Vec<PostSummary> = fetch(ContentQuery::related_posts(
            "middle",
            vec!["money".into()],
            Vec::new(),
        ))
        .await;
        assert_eq!(slugs(&related), vec!["oldest"]);

        let related: Vec<PostSummary> = fetch(ContentQuery::related_posts(
            "oldest",
            Vec::new(),
            vec!["tax".into()],
        ))
        .await;
        assert_eq!(slugs(&related), vec!["middle"]);
    }

    #[tokio::test]
    async fn latest_except_skips_current_post() {
        let latest: Vec<PostSummary> = fetch(ContentQuery::latest_except("newest")).await;
        assert_eq!(slugs(&latest), vec!["middle", "oldest", "draft"]);
    }

    #[test]
    fn rejects_malformed_documents() {
        let err = FixtureStore::from_value(json!({ "posts": [{ "_id": "x", "tags": "nope" }] }))
            .expect_err("tags must be a list");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }
}
