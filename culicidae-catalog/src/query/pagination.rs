/// Limit/offset pagination with clamped inputs
use culicidae_core::config::QueryConfig;
use serde::{Deserialize, Serialize};

/// Where a neighbouring page starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    /// Clamp caller input: a missing limit takes the configured default, any
    /// limit is forced into `[1, max_limit]` and negative offsets become 0.
    pub fn new(limit: Option<i64>, offset: Option<i64>, config: &QueryConfig) -> Self {
        let max_limit = config.max_limit.max(1);
        let limit = match limit {
            None => config.default_limit.clamp(1, max_limit),
            Some(l) => l.clamp(1, max_limit as i64) as usize,
        };
        let offset = offset.unwrap_or(0).max(0) as usize;
        Self { limit, offset }
    }

    /// Slice an already ordered result list
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let count = items.len();
        let results: Vec<T> = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        Page {
            count,
            results,
            next: self.next(count),
            previous: self.previous(),
        }
    }

    fn next(&self, count: usize) -> Option<PageCursor> {
        let end = self.offset.saturating_add(self.limit);
        (end < count).then_some(PageCursor {
            offset: end,
            limit: self.limit,
        })
    }

    fn previous(&self) -> Option<PageCursor> {
        (self.offset > 0).then_some(PageCursor {
            offset: self.offset.saturating_sub(self.limit),
            limit: self.limit,
        })
    }
}

/// One page of an ordered result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total matches before pagination
    pub count: usize,
    pub results: Vec<T>,
    pub next: Option<PageCursor>,
    pub previous: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn empty(pagination: Pagination) -> Self {
        pagination.apply(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn config() -> QueryConfig {
        QueryConfig::default()
    }

    #[test]
    fn test_clamping() {
        let c = config();
        assert_eq!(Pagination::new(None, None, &c), Pagination { limit: 50, offset: 0 });
        assert_eq!(Pagination::new(Some(0), Some(-5), &c), Pagination { limit: 1, offset: 0 });
        assert_eq!(Pagination::new(Some(-3), None, &c).limit, 1);
        assert_eq!(Pagination::new(Some(10_000), Some(7), &c), Pagination { limit: 200, offset: 7 });
    }

    #[test]
    fn test_cursors() {
        let items: Vec<u32> = (0..25).collect();
        let page = Pagination { limit: 10, offset: 10 }.apply(items.clone());
        assert_eq!(page.count, 25);
        assert_eq!(page.results, (10..20).collect::<Vec<_>>());
        assert_eq!(page.next, Some(PageCursor { offset: 20, limit: 10 }));
        assert_eq!(page.previous, Some(PageCursor { offset: 0, limit: 10 }));

        let last = Pagination { limit: 10, offset: 20 }.apply(items.clone());
        assert_eq!(last.results.len(), 5);
        assert_eq!(last.next, None);

        let beyond = Pagination { limit: 10, offset: 100 }.apply(items);
        assert!(beyond.is_empty());
        assert_eq!(beyond.count, 25);
        assert_eq!(beyond.next, None);
    }

    #[test]
    fn test_empty_page() {
        let page: Page<String> = Page::empty(Pagination { limit: 5, offset: 0 });
        assert_eq!(page.count, 0);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }

    proptest! {
        #[test]
        fn prop_following_next_visits_every_item_once(len in 0usize..300, limit in 1i64..60) {
            let items: Vec<usize> = (0..len).collect();
            let mut pagination = Pagination::new(Some(limit), None, &config());
            let mut seen = Vec::new();
            loop {
                let page = pagination.apply(items.clone());
                prop_assert_eq!(page.count, len);
                seen.extend(page.results);
                match page.next {
                    Some(cursor) => {
                        pagination = Pagination::new(
                            Some(cursor.limit as i64),
                            Some(cursor.offset as i64),
                            &config(),
                        )
                    }
                    None => break,
                }
            }
            prop_assert_eq!(seen, items);
        }

        #[test]
        fn prop_clamped_values_in_range(limit in any::<i64>(), offset in any::<i64>()) {
            let p = Pagination::new(Some(limit), Some(offset), &config());
            prop_assert!(p.limit >= 1 && p.limit <= 200);
            prop_assert!(offset < 0 || p.offset == offset as usize);
        }
    }
}
