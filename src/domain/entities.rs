//! Content records as returned by the content store.
//!
//! Records deserialize from the store's projection shape (`_id`, `slug.current`,
//! camelCase fields) and serialize into the snake_case shape handed to the
//! rendering layer.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "slug_current")]
    pub slug: Option<String>,
}

/// A category with the number of posts referencing it, computed per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: CategoryRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

impl CategoryWithCount {
    pub fn slug(&self) -> Option<&str> {
        self.category.slug.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.category.title
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(rename(deserialize = "_id"))]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "required_slug")]
    pub slug: String,
    #[serde(
        rename(deserialize = "publishedAt"),
        default,
        with = "published_at"
    )]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<CategoryRef>,
    #[serde(rename(deserialize = "mainImageUrl"), default)]
    pub main_image_url: Option<String>,
}

impl PostSummary {
    /// Slugs of the referenced categories that actually carry one.
    pub fn category_slugs(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter_map(|category| category.slug.clone())
            .filter(|slug| !slug.is_empty())
            .collect()
    }
}

/// A single post with its rich-text body kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub summary: PostSummary,
    #[serde(default)]
    pub body: serde_json::Value,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SlugField {
    Plain(String),
    Ref {
        #[serde(default)]
        current: Option<String>,
    },
}

fn slug_current<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<SlugField>::deserialize(deserializer)?;
    Ok(match field {
        Some(SlugField::Plain(value)) => Some(value),
        Some(SlugField::Ref { current }) => current,
        None => None,
    })
}

fn required_slug<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(slug_current(deserializer)?.unwrap_or_default())
}

/// Publication timestamps: RFC 3339 or a bare calendar date on input,
/// RFC 3339 on output. Unparseable input decodes as absent.
mod published_at {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{Date, OffsetDateTime};

    pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match (*value).and_then(|at| at.format(&Rfc3339).ok()) {
            Some(formatted) => serializer.serialize_some(&formatted),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub(crate) fn parse(raw: &str) -> Option<OffsetDateTime> {
        let raw = raw.trim();
        if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(at);
        }
        Date::parse(raw, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(|date| date.midnight().assume_utc())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn decodes_store_projection_shape() {
        let value = json!({
            "_id": "post-1",
            "title": "Hello",
            "slug": { "current": "hello" },
            "publishedAt": "2024-03-01T09:30:00Z",
            "tags": ["rust", "web"],
            "categories": [{ "_id": "c1", "title": "一章", "slug": { "current": "ch1" } }],
            "mainImageUrl": "https://cdn.sanity.io/images/x.png"
        });

        let post: PostSummary = serde_json::from_value(value).expect("decode post");
        assert_eq!(post.id, "post-1");
        assert_eq!(post.slug, "hello");
        assert_eq!(post.published_at, Some(datetime!(2024-03-01 09:30 UTC)));
        assert_eq!(post.category_slugs(), vec!["ch1".to_string()]);
        assert_eq!(
            post.main_image_url.as_deref(),
            Some("https://cdn.sanity.io/images/x.png")
        );
    }

    #[test]
    fn tolerates_nulls_and_missing_fields() {
        let value = json!({
            "_id": "draft",
            "title": null,
            "slug": { "current": "draft" },
            "publishedAt": null,
            "tags": null,
            "categories": null
        });

        let post: PostSummary = serde_json::from_value(value).expect("decode draft");
        assert_eq!(post.title, "");
        assert!(post.published_at.is_none());
        assert!(post.tags.is_empty());
        assert!(post.categories.is_empty());
        assert!(post.main_image_url.is_none());
    }

    #[test]
    fn unparseable_timestamp_decodes_as_absent() {
        let value = json!({ "_id": "p", "slug": "p", "publishedAt": "yesterday" });
        let post: PostSummary = serde_json::from_value(value).expect("decode");
        assert!(post.published_at.is_none());
    }

    #[test]
    fn bare_date_is_accepted() {
        assert_eq!(
            published_at::parse("2017-05-04"),
            Some(datetime!(2017-05-04 00:00 UTC))
        );
    }

    #[test]
    fn category_count_flattens_reference() {
        let value = json!({ "_id": "c1", "title": "税金", "slug": { "current": "tax" }, "count": 4 });
        let category: CategoryWithCount = serde_json::from_value(value).expect("decode category");
        assert_eq!(category.slug(), Some("tax"));
        assert_eq!(category.count, 4);

        let out = serde_json::to_value(&category).expect("encode category");
        assert_eq!(out["id"], "c1");
        assert_eq!(out["slug"], "tax");
        assert_eq!(out["count"], 4);
    }

    #[test]
    fn detail_keeps_body_opaque() {
        let value = json!({
            "_id": "p",
            "title": "T",
            "slug": { "current": "p" },
            "body": [{ "_type": "block", "children": [] }]
        });
        let detail: PostDetail = serde_json::from_value(value).expect("decode detail");
        assert_eq!(detail.summary.slug, "p");
        assert!(detail.body.is_array());
    }
}
