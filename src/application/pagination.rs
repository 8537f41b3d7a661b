//! Page-number pagination for the public listing.
//!
//! Covers the compressed page marker sequence, normalization of the raw
//! `category`/`page` query parameters, and the page window arithmetic that
//! maps a page number onto a store slice.

use serde::{Serialize, Serializer};
use url::form_urlencoded;

use crate::domain::entities::CategoryWithCount;

/// Posts per listing page.
pub const PAGE_SIZE: u32 = 10;
/// Page numbers shown on each side of the current page.
pub const SIBLING_COUNT: u32 = 1;

const LISTING_PATH: &str = "/blog";

/// One entry of a pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(u32),
    Ellipsis,
}

impl PageMarker {
    pub fn page(self) -> Option<u32> {
        match self {
            PageMarker::Page(page) => Some(page),
            PageMarker::Ellipsis => None,
        }
    }
}

impl Serialize for PageMarker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PageMarker::Page(page) => serializer.serialize_u32(*page),
            PageMarker::Ellipsis => serializer.serialize_str("ellipsis"),
        }
    }
}

/// Ellipsis-compressed page sequence for `total` pages.
///
/// `current` is clamped into `[1, total]`. The result always starts with page
/// 1, ends with `total`, contains `current`, and never holds more than
/// `sibling_count * 2 + 5` entries.
pub fn paginate(current: u32, total: u32, sibling_count: u32) -> Vec<PageMarker> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let budget = sibling_count.saturating_mul(2).saturating_add(5);
    if total <= budget {
        return (1..=total).map(PageMarker::Page).collect();
    }

    let left = current.saturating_sub(sibling_count).max(2);
    let right = current.saturating_add(sibling_count).min(total - 1);

    let mut markers = Vec::with_capacity(budget as usize);
    markers.push(PageMarker::Page(1));
    if left > 2 {
        markers.push(PageMarker::Ellipsis);
    } else {
        markers.extend((2..left).map(PageMarker::Page));
    }
    markers.extend((left..=right).map(PageMarker::Page));
    if right < total - 1 {
        markers.push(PageMarker::Ellipsis);
    } else {
        markers.extend((right + 1..total).map(PageMarker::Page));
    }
    markers.push(PageMarker::Page(total));
    markers
}

/// Parse a raw `page` parameter into a page number of at least 1.
///
/// Leading whitespace and trailing garbage are tolerated (`" 3abc"` is 3);
/// anything without leading digits, or below 1, is page 1.
pub fn normalize_page(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return 1;
    };
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = {
        let end = digits
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(digits.len());
        &digits[..end]
    };
    if digits.is_empty() || negative {
        return 1;
    }
    let value = digits.bytes().fold(0u32, |acc, digit| {
        acc.saturating_mul(10)
            .saturating_add(u32::from(digit - b'0'))
    });
    value.max(1)
}

/// Pass a non-empty category slug through; anything else means no filter.
pub fn normalize_category(raw: Option<&str>) -> Option<String> {
    raw.filter(|slug| !slug.is_empty()).map(str::to_string)
}

/// Look a requested slug up among the fetched categories.
///
/// Purely advisory: an unknown slug resolves to `None` but the filter still
/// applies and matches nothing.
pub fn resolve_category<'a>(
    slug: Option<&str>,
    known: &'a [CategoryWithCount],
) -> Option<&'a CategoryWithCount> {
    let slug = slug?;
    known.iter().find(|category| category.slug() == Some(slug))
}

/// Normalized listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingParams {
    pub category: Option<String>,
    pub page: u32,
}

impl ListingParams {
    /// Parse a raw query string. Repeated keys keep their first value.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut category: Option<String> = None;
        let mut page: Option<String> = None;
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "category" if category.is_none() => category = Some(value.into_owned()),
                "page" if page.is_none() => page = Some(value.into_owned()),
                _ => {}
            }
        }
        Self {
            category: normalize_category(category.as_deref()),
            page: normalize_page(page.as_deref()),
        }
    }
}

/// Window arithmetic for one listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
}

impl PageWindow {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Inclusive start offset of the slice.
    pub fn start(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Exclusive end offset of the slice.
    pub fn end(&self) -> u64 {
        self.start().saturating_add(u64::from(self.page_size))
    }

    /// Number of pages for `total_count` items; at least 1.
    pub fn total_pages(&self, total_count: u64) -> u32 {
        let pages = total_count.div_ceil(u64::from(self.page_size)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// The same window moved onto the last page when it lies past the end.
    pub fn clamp_to(&self, total_count: u64) -> Self {
        Self::new(self.page.min(self.total_pages(total_count)), self.page_size)
    }
}

/// Listing URL for `page`, keeping the category filter.
pub fn page_href(category: Option<&str>, page: u32) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if let Some(category) = category {
        serializer.append_pair("category", category);
    }
    serializer.append_pair("page", &page.to_string());
    format!("{LISTING_PATH}?{}", serializer.finish())
}

/// Listing URL for a category filter, starting at page 1.
pub fn category_href(category: Option<&str>) -> String {
    match category {
        Some(slug) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("category", slug)
                .finish();
            format!("{LISTING_PATH}?{query}")
        }
        None => LISTING_PATH.to_string(),
    }
}

/// Pagination control state handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationView {
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub items: Vec<PageLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub marker: PageMarker,
    pub href: Option<String>,
    pub current: bool,
}

impl PaginationView {
    pub fn build(category: Option<&str>, window: PageWindow, total_count: u64) -> Self {
        let total_pages = window.total_pages(total_count);
        let page = window.page.min(total_pages);
        let has_prev = page > 1;
        let has_next = page < total_pages;
        let items = paginate(page, total_pages, SIBLING_COUNT)
            .into_iter()
            .map(|marker| PageLink {
                marker,
                href: marker.page().map(|n| page_href(category, n)),
                current: marker.page() == Some(page),
            })
            .collect();

        Self {
            page,
            total_pages,
            total_count,
            has_prev,
            has_next,
            prev_href: has_prev.then(|| page_href(category, page - 1)),
            next_href: has_next.then(|| page_href(category, page + 1)),
            items,
        }
    }
}
