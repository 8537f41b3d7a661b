//! Category ordering for the listing sidebar.
//!
//! Categories are ordered by a chain of comparators, each consulted only when
//! every earlier one reports a tie:
//!
//! 1. an explicit, curated list of full titles;
//! 2. a chapter ordinal parsed from the title after whitespace and one leading
//!    chapter marker are stripped;
//! 3. code-point title order after lowercasing, then raw code-point order.
//!
//! Titles matched by neither side of a tier compare equal in that tier; a
//! matched title sorts before an unmatched one.

use std::cmp::Ordering;

use super::entities::CategoryWithCount;

const DEFAULT_EXPLICIT_TITLES: [&str; 7] = [
    "一章【これからのカネの話】勤め人卒業へ",
    "二章【これからの女の話】オナ禁でモテる法",
    "三章【これからのカネの話】カネの話",
    "四章【これからの女の話】恋愛エッセイ",
    "五章【これからのカネの話】資本家になろう",
    "六章【これからの女の話】全てはモテるため",
    "七章【これからのカネの話】税金とか会計",
];
const DEFAULT_CHAPTER_ORDINALS: [&str; 7] =
    ["一章", "二章", "三章", "四章", "五章", "六章", "七章"];
const DEFAULT_CHAPTER_MARKER: &str = "第";

/// Inputs for the category comparator chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOrdering {
    pub explicit_titles: Vec<String>,
    pub chapter_ordinals: Vec<String>,
    pub chapter_marker: String,
}

impl Default for CategoryOrdering {
    fn default() -> Self {
        Self {
            explicit_titles: DEFAULT_EXPLICIT_TITLES.map(String::from).to_vec(),
            chapter_ordinals: DEFAULT_CHAPTER_ORDINALS.map(String::from).to_vec(),
            chapter_marker: DEFAULT_CHAPTER_MARKER.to_string(),
        }
    }
}

type TitleComparator = fn(&CategoryOrdering, &str, &str) -> Ordering;

const COMPARATOR_CHAIN: [TitleComparator; 3] = [by_explicit_title, by_chapter, by_title];

impl CategoryOrdering {
    /// Compare two titles by walking the comparator chain.
    pub fn compare_titles(&self, left: &str, right: &str) -> Ordering {
        COMPARATOR_CHAIN
            .iter()
            .map(|comparator| comparator(self, left, right))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Stable in-place sort; ties keep the order the store returned.
    pub fn sort(&self, categories: &mut [CategoryWithCount]) {
        categories.sort_by(|left, right| self.compare_titles(left.title(), right.title()));
    }

    fn explicit_index(&self, title: &str) -> Option<usize> {
        self.explicit_titles
            .iter()
            .position(|candidate| candidate == title)
    }

    fn chapter_index(&self, title: &str) -> Option<usize> {
        let compact: String = title.chars().filter(|ch| !ch.is_whitespace()).collect();
        let normalized = if self.chapter_marker.is_empty() {
            compact.as_str()
        } else {
            compact
                .strip_prefix(self.chapter_marker.as_str())
                .unwrap_or(compact.as_str())
        };
        self.chapter_ordinals
            .iter()
            .position(|ordinal| ordinal == normalized)
    }
}

fn by_explicit_title(ordering: &CategoryOrdering, left: &str, right: &str) -> Ordering {
    rank_matched(
        ordering.explicit_index(left),
        ordering.explicit_index(right),
    )
}

fn by_chapter(ordering: &CategoryOrdering, left: &str, right: &str) -> Ordering {
    rank_matched(ordering.chapter_index(left), ordering.chapter_index(right))
}

/// Code-point order of the lowercased titles; ties fall back to the raw titles.
/// No locale collation is applied.
fn by_title(_: &CategoryOrdering, left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

fn rank_matched(left: Option<usize>, right: Option<usize>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (left, right) => left
            .unwrap_or(usize::MAX)
            .cmp(&right.unwrap_or(usize::MAX)),
    }
}
