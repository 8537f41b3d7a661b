//! Presentation helpers for post records.

use std::cmp::Ordering;

use chrono_tz::Tz;
use time::OffsetDateTime;

use super::entities::PostSummary;
use crate::util::timezone;

/// Publication date formatted as `YYYY年M月D日` in the site time zone.
///
/// Missing timestamps produce an empty label.
pub fn published_label(published_at: Option<OffsetDateTime>, tz: Tz) -> String {
    published_at
        .and_then(|at| timezone::localized_date(at, tz))
        .map(|date| format!("{}年{}月{}日", date.year(), u8::from(date.month()), date.day()))
        .unwrap_or_default()
}

/// Newest first; posts without a publication date sort last.
pub fn newest_first(left: &PostSummary, right: &PostSummary) -> Ordering {
    match (left.published_at, right.published_at) {
        (Some(l), Some(r)) => r.cmp(&l),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
