//! Catalog search and infinite-scroll windowing.
//!
//! The catalog page shows the first [`INITIAL_WINDOW`] matching products and
//! reveals [`LOAD_MORE_STEP`] more each time the visitor scrolls to the end.
//! Changing the search query starts again from the first window.

use core::ops::Range;

/// Products shown on first render of the catalog.
pub const INITIAL_WINDOW: usize = 8;

/// Products appended per infinite-scroll step.
pub const LOAD_MORE_STEP: usize = 4;

/// Anything that can be matched by the catalog search box.
pub trait Searchable {
    /// The text the search query is matched against.
    fn search_text(&self) -> &str;
}

/// Keep items whose search text contains `query`, ignoring case.
///
/// A blank query matches everything. Order is preserved.
pub fn filter_by_query<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| item.search_text().to_lowercase().contains(&needle))
        .collect()
}

/// A slice of the filtered catalog to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Index range into the filtered list.
    pub range: Range<usize>,
    /// Total number of filtered items.
    pub total: usize,
}

impl Window {
    /// The first window of a freshly filtered list.
    #[must_use]
    pub fn initial(total: usize) -> Self {
        Self {
            range: 0..INITIAL_WINDOW.min(total),
            total,
        }
    }

    /// Everything up to `visible` items, for a page that re-renders a
    /// catalog already scrolled that far. Never smaller than the initial
    /// window.
    #[must_use]
    pub fn first(visible: usize, total: usize) -> Self {
        Self {
            range: 0..visible.max(INITIAL_WINDOW).min(total),
            total,
        }
    }

    /// The window following `already_visible` rendered items.
    ///
    /// An offset of zero yields the initial window. Offsets past the end
    /// yield an empty window.
    #[must_use]
    pub fn after(already_visible: usize, total: usize) -> Self {
        if already_visible == 0 {
            return Self::initial(total);
        }
        let start = already_visible.min(total);
        let end = already_visible.saturating_add(LOAD_MORE_STEP).min(total);
        Self {
            range: start..end,
            total,
        }
    }

    /// Number of items visible once this window is rendered.
    #[must_use]
    pub const fn visible(&self) -> usize {
        self.range.end
    }

    /// Whether another window can follow this one.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.range.end < self.total
    }

    /// Select this window's items out of the filtered list.
    #[must_use]
    pub fn apply<'a, T>(&self, filtered: &[&'a T]) -> Vec<&'a T> {
        filtered
            .get(self.range.clone())
            .map(|items| items.to_vec())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str);

    impl Searchable for Item {
        fn search_text(&self) -> &str {
            self.0
        }
    }

    fn catalog() -> Vec<Item> {
        [
            "PainAway",
            "AllergyClear",
            "CoughCalm",
            "SleepWell",
            "DigestEase",
            "FlexiJoint",
            "VitaBoost",
            "ColdSnap",
            "FocusMax",
            "DermaHeal",
            "HeartGuard",
            "ImmunoShield",
        ]
        .into_iter()
        .map(Item)
        .collect()
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let items = catalog();
        let names: Vec<&str> = filter_by_query(&items, "  co ")
            .into_iter()
            .map(|i| i.0)
            .collect();
        assert_eq!(names, vec!["CoughCalm", "ColdSnap"]);
    }

    #[test]
    fn test_blank_query_matches_all() {
        let items = catalog();
        assert_eq!(filter_by_query(&items, "").len(), 12);
        assert!(filter_by_query(&items, "zzz").is_empty());
    }

    #[test]
    fn test_initial_window_then_steps() {
        let first = Window::initial(12);
        assert_eq!(first.range, 0..8);
        assert!(first.has_more());

        let second = Window::after(first.visible(), 12);
        assert_eq!(second.range, 8..12);
        assert!(!second.has_more());

        let past_end = Window::after(12, 12);
        assert!(past_end.range.is_empty());
    }

    #[test]
    fn test_step_never_exceeds_total() {
        let window = Window::after(8, 10);
        assert_eq!(window.range, 8..10);
        assert_eq!(Window::initial(3).range, 0..3);
    }

    #[test]
    fn test_first_restores_scrolled_window() {
        assert_eq!(Window::first(12, 20).range, 0..12);
        assert_eq!(Window::first(2, 20).range, 0..8);
        assert_eq!(Window::first(40, 20).range, 0..20);
    }

    #[test]
    fn test_apply_selects_items() {
        let items = catalog();
        let filtered = filter_by_query(&items, "");
        let page = Window::after(8, filtered.len()).apply(&filtered);
        let names: Vec<&str> = page.into_iter().map(|i| i.0).collect();
        assert_eq!(names, vec!["FocusMax", "DermaHeal", "HeartGuard", "ImmunoShield"]);
    }
}
