//! Public blog reads: the paginated listing and the post detail page.
//!
//! Each content fetch degrades on its own. A failed read is logged, counted
//! and replaced by an empty result, except the primary post read of a detail
//! page, whose failure means the page does not exist.

use std::sync::Arc;

use chrono_tz::Tz;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, warn};

use crate::application::pagination::{
    ListingParams, PAGE_SIZE, PageWindow, PaginationView, category_href, resolve_category,
};
use crate::application::queries::ContentQuery;
use crate::application::repos::{ContentStore, StoreError, fetch_as};
use crate::domain::categories::CategoryOrdering;
use crate::domain::entities::{CategoryRef, CategoryWithCount, PostDetail, PostSummary};
use crate::domain::posts::published_label;

pub(crate) const METRIC_CONTENT_FETCH_ERROR: &str = "blogfront_content_fetch_error_total";

const LISTING_HREF: &str = "/blog";

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("post `{slug}` not found")]
    NotFound { slug: String },
}

/// Listing sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryLink {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    pub count: u64,
    pub href: String,
    pub selected: bool,
}

/// A post as shown in listings and related strips.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub href: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub published_label: String,
    pub tags: Vec<String>,
    pub categories: Vec<CategoryRef>,
    pub main_image_url: Option<String>,
}

impl PostCard {
    fn new(summary: PostSummary, timezone: Tz) -> Self {
        Self {
            href: format!("{LISTING_HREF}/{}", summary.slug),
            published_label: published_label(summary.published_at, timezone),
            id: summary.id,
            title: summary.title,
            slug: summary.slug,
            published_at: summary.published_at,
            tags: summary.tags,
            categories: summary.categories,
            main_image_url: summary.main_image_url,
        }
    }
}

/// View model for `GET /blog`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    /// The requested filter, known or not.
    pub category: Option<String>,
    /// The requested filter when it names a known category.
    pub selected_category: Option<CategoryLink>,
    pub all_href: &'static str,
    pub categories: Vec<CategoryLink>,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

/// View model for `GET /blog/{slug}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPage {
    pub post: PostCard,
    pub body: Value,
    pub related: Vec<PostCard>,
    pub back_href: &'static str,
}

#[derive(Clone)]
pub struct BlogService {
    store: Arc<dyn ContentStore>,
    ordering: Arc<CategoryOrdering>,
    timezone: Tz,
}

impl BlogService {
    pub fn new(store: Arc<dyn ContentStore>, ordering: CategoryOrdering, timezone: Tz) -> Self {
        Self {
            store,
            ordering: Arc::new(ordering),
            timezone,
        }
    }

    /// Build the listing page for normalized parameters.
    ///
    /// A page past the end is clamped to the last page, and the slice is read
    /// again so the posts always belong to the page reported.
    pub async fn listing(&self, params: &ListingParams) -> ListingPage {
        let category = params.category.as_deref();
        let window = PageWindow::new(params.page, PAGE_SIZE);

        let categories_query = ContentQuery::categories();
        let list_query = ContentQuery::post_list(category, window);
        let count_query = ContentQuery::post_count(category);
        let (mut categories, posts, total_count) = tokio::join!(
            self.load_or_default::<Vec<CategoryWithCount>>(&categories_query),
            self.load_or_default::<Vec<PostSummary>>(&list_query),
            self.load_or_default::<u64>(&count_query),
        );

        let clamped = window.clamp_to(total_count);
        let posts = if clamped == window {
            posts
        } else {
            self.load_or_default(&ContentQuery::post_list(category, clamped))
                .await
        };

        self.ordering.sort(&mut categories);
        let selected_slug = resolve_category(category, &categories)
            .and_then(CategoryWithCount::slug)
            .map(str::to_string);
        let categories: Vec<CategoryLink> = categories
            .into_iter()
            .map(|entry| CategoryLink {
                href: category_href(entry.slug()),
                selected: selected_slug.is_some() && entry.slug() == selected_slug.as_deref(),
                count: entry.count,
                id: entry.category.id,
                title: entry.category.title,
                slug: entry.category.slug,
            })
            .collect();
        let selected_category = categories.iter().find(|link| link.selected).cloned();

        ListingPage {
            category: params.category.clone(),
            selected_category,
            all_href: LISTING_HREF,
            categories,
            posts: posts
                .into_iter()
                .map(|post| PostCard::new(post, self.timezone))
                .collect(),
            pagination: PaginationView::build(category, clamped, total_count),
        }
    }

    /// Build the detail page for a slug.
    pub async fn post_page(&self, slug: &str) -> Result<PostPage, BlogError> {
        let query = ContentQuery::post_detail(slug);
        let detail = match fetch_as::<Option<PostDetail>>(self.store.as_ref(), &query).await {
            Ok(detail) => detail,
            Err(err) => {
                record_fetch_error(&query, &err);
                None
            }
        };
        let Some(PostDetail { summary, body }) = detail else {
            return Err(BlogError::NotFound {
                slug: slug.to_string(),
            });
        };

        let related = self
            .related_posts(slug, &summary)
            .await
            .into_iter()
            .map(|post| PostCard::new(post, self.timezone))
            .collect();

        Ok(PostPage {
            post: PostCard::new(summary, self.timezone),
            body,
            related,
            back_href: LISTING_HREF,
        })
    }

    /// Posts sharing a category or tag with `post`, falling back to the
    /// newest other posts when there is no overlap.
    pub async fn related_posts(&self, slug: &str, post: &PostSummary) -> Vec<PostSummary> {
        let category_slugs = post.category_slugs();
        if !category_slugs.is_empty() || !post.tags.is_empty() {
            let query = ContentQuery::related_posts(slug, category_slugs, post.tags.clone());
            match fetch_as::<Vec<PostSummary>>(self.store.as_ref(), &query).await {
                Ok(related) if !related.is_empty() => return related,
                Ok(_) => {}
                Err(err) => {
                    record_fetch_error(&query, &err);
                    warn!(
                        target = "application::blog::related_posts",
                        slug,
                        "Falling back to latest posts after related-posts failure"
                    );
                }
            }
        }
        self.load_or_default(&ContentQuery::latest_except(slug))
            .await
    }

    async fn load_or_default<T>(&self, query: &ContentQuery) -> T
    where
        T: DeserializeOwned + Default,
    {
        match fetch_as::<T>(self.store.as_ref(), query).await {
            Ok(value) => value,
            Err(err) => {
                record_fetch_error(query, &err);
                T::default()
            }
        }
    }
}

fn record_fetch_error(query: &ContentQuery, err: &StoreError) {
    counter!(METRIC_CONTENT_FETCH_ERROR, "query" => query.name()).increment(1);
    let params = Value::Object(query.params());
    error!(
        target = "application::blog",
        query = query.name(),
        params = %params,
        error = %err,
        "Content fetch failed"
    );
}
