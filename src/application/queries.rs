//! Parameterized content store queries.
//!
//! Every read the blog performs is planned here as a [`ContentQuery`]: a typed
//! description of what to read, the GROQ text that reads it, the parameters
//! bound to that text, and the cache tags the result is filed under.

use serde_json::{Map, Value, json};

use crate::application::pagination::PageWindow;
use crate::cache::CacheTag;

/// Maximum number of posts in a related-posts strip.
pub const RELATED_LIMIT: usize = 6;

const CATEGORIES_QUERY: &str = r#"*[_type == "category"]{
  _id,
  title,
  slug,
  "count": count(*[_type == "post" && defined(slug.current) && references(^._id)])
} | order(count desc, title asc)"#;

const POST_LIST_QUERY: &str = r#"*[
  _type == "post"
  && defined(slug.current)
  && (!defined($category) || $category in categories[]->slug.current)
]|order(publishedAt desc)[$start...$end]{
  _id,
  title,
  slug,
  publishedAt,
  tags,
  categories[]->{ _id, title, slug },
  "mainImageUrl": mainImage.asset->url
}"#;

const POST_COUNT_QUERY: &str = r#"count(*[
  _type == "post"
  && defined(slug.current)
  && (!defined($category) || $category in categories[]->slug.current)
])"#;

const POST_DETAIL_QUERY: &str = r#"*[_type == "post" && slug.current == $slug][0]{
  _id,
  title,
  slug,
  publishedAt,
  tags,
  categories[]->{ _id, title, slug },
  "mainImageUrl": mainImage.asset->url,
  body
}"#;

const RELATED_POSTS_QUERY: &str = r#"*[
  _type == "post" && defined(slug.current) && slug.current != $slug && (
    count((categories[]->slug.current)[@ in $categorySlugs]) > 0 ||
    count(tags[@ in $tags]) > 0
  )
]|order(publishedAt desc)[0...6]{
  _id,
  title,
  slug,
  publishedAt,
  tags,
  categories[]->{ _id, title, slug },
  "mainImageUrl": mainImage.asset->url
}"#;

const LATEST_EXCEPT_QUERY: &str = r#"*[_type == "post" && defined(slug.current) && slug.current != $slug]
  |order(publishedAt desc)[0...6]{
    _id,
    title,
    slug,
    publishedAt,
    tags,
    categories[]->{ _id, title, slug },
    "mainImageUrl": mainImage.asset->url
  }"#;

/// What a query reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// All categories with the number of published posts referencing each.
    Categories,
    /// Newest-first slice `[start, end)` of posts, optionally in one category.
    PostList {
        category: Option<String>,
        start: u64,
        end: u64,
    },
    /// Number of posts matching the same filter as `PostList`.
    PostCount { category: Option<String> },
    /// First post with this slug, body included.
    PostDetail { slug: String },
    /// Other posts sharing a category slug or a tag.
    RelatedPosts {
        slug: String,
        category_slugs: Vec<String>,
        tags: Vec<String>,
    },
    /// The newest other posts.
    LatestExcept { slug: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    kind: QueryKind,
    tags: Vec<CacheTag>,
}

impl ContentQuery {
    fn new(kind: QueryKind, tags: Vec<CacheTag>) -> Self {
        Self { kind, tags }
    }

    pub fn categories() -> Self {
        Self::new(
            QueryKind::Categories,
            vec![CacheTag::Posts, CacheTag::Categories],
        )
    }

    pub fn post_list(category: Option<&str>, window: PageWindow) -> Self {
        Self::new(
            QueryKind::PostList {
                category: category.map(str::to_string),
                start: window.start(),
                end: window.end(),
            },
            vec![CacheTag::Posts, CacheTag::Categories],
        )
    }

    pub fn post_count(category: Option<&str>) -> Self {
        Self::new(
            QueryKind::PostCount {
                category: category.map(str::to_string),
            },
            vec![CacheTag::Posts, CacheTag::Categories],
        )
    }

    pub fn post_detail(slug: &str) -> Self {
        Self::new(
            QueryKind::PostDetail {
                slug: slug.to_string(),
            },
            vec![CacheTag::post(slug), CacheTag::Posts],
        )
    }

    pub fn related_posts(slug: &str, category_slugs: Vec<String>, tags: Vec<String>) -> Self {
        Self::new(
            QueryKind::RelatedPosts {
                slug: slug.to_string(),
                category_slugs,
                tags,
            },
            vec![CacheTag::Posts],
        )
    }

    pub fn latest_except(slug: &str) -> Self {
        Self::new(
            QueryKind::LatestExcept {
                slug: slug.to_string(),
            },
            vec![CacheTag::Posts],
        )
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }

    pub fn tags(&self) -> &[CacheTag] {
        &self.tags
    }

    /// Short label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self.kind {
            QueryKind::Categories => "categories",
            QueryKind::PostList { .. } => "post_list",
            QueryKind::PostCount { .. } => "post_count",
            QueryKind::PostDetail { .. } => "post_detail",
            QueryKind::RelatedPosts { .. } => "related_posts",
            QueryKind::LatestExcept { .. } => "latest_except",
        }
    }

    pub fn groq(&self) -> &'static str {
        match self.kind {
            QueryKind::Categories => CATEGORIES_QUERY,
            QueryKind::PostList { .. } => POST_LIST_QUERY,
            QueryKind::PostCount { .. } => POST_COUNT_QUERY,
            QueryKind::PostDetail { .. } => POST_DETAIL_QUERY,
            QueryKind::RelatedPosts { .. } => RELATED_POSTS_QUERY,
            QueryKind::LatestExcept { .. } => LATEST_EXCEPT_QUERY,
        }
    }

    /// Parameters bound to the GROQ text, keyed without the `$` sigil.
    pub fn params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        match &self.kind {
            QueryKind::Categories => {}
            QueryKind::PostList {
                category,
                start,
                end,
            } => {
                params.insert("category".into(), json!(category));
                params.insert("start".into(), json!(start));
                params.insert("end".into(), json!(end));
            }
            QueryKind::PostCount { category } => {
                params.insert("category".into(), json!(category));
            }
            QueryKind::PostDetail { slug } | QueryKind::LatestExcept { slug } => {
                params.insert("slug".into(), json!(slug));
            }
            QueryKind::RelatedPosts {
                slug,
                category_slugs,
                tags,
            } => {
                params.insert("slug".into(), json!(slug));
                params.insert("categorySlugs".into(), json!(category_slugs));
                params.insert("tags".into(), json!(tags));
            }
        }
        params
    }
}
