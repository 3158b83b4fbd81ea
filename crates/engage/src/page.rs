//! Paging for list operations.

use serde::{Deserialize, Serialize};

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn first(size: u32) -> Self {
        Self { page: 1, size }
    }

    /// Clamp into `1..=max_size`, substituting `default_size` for zero.
    pub fn normalized(self, default_size: u32, max_size: u32) -> Self {
        let size = if self.size == 0 { default_size } else { self.size };
        Self {
            page: self.page.max(1),
            size: size.clamp(1, max_size.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, size: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: request.page,
            size: request.size,
        }
    }

    /// Slice an already-ordered collection.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        Self {
            items,
            total,
            page: request.page,
            size: request.size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_zero_and_oversized_requests() {
        assert_eq!(PageRequest::new(0, 0).normalized(20, 100), PageRequest::new(1, 20));
        assert_eq!(PageRequest::new(3, 500).normalized(20, 100), PageRequest::new(3, 100));
    }

    #[test]
    fn slices_sorted_items() {
        let page = Page::from_sorted((1..=7).collect::<Vec<_>>(), PageRequest::new(2, 3));
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);

        let past_end = Page::from_sorted((1..=7).collect::<Vec<_>>(), PageRequest::new(4, 3));
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 7);
    }
}
