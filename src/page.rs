// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Pagination over an enumerated collection.
//!
//! Pure slice arithmetic: a page is a borrowed window of the full
//! enumeration, derived on demand and never stored. Out-of-range requests
//! yield an empty slice, not an error.

/// The items of 1-based page `page_index` with `page_size` items per page,
/// clamped to the collection bounds.
pub fn paginate<T>(items: &[T], page_index: usize, page_size: usize) -> &[T] {
    if page_size == 0 {
        return &items[..0];
    }
    let start = page_index.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &items[..0];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Number of pages needed for `len` items at `page_size` per page.
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate_middle_page() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(paginate(&items, 2, 10), (11..=20).collect::<Vec<u32>>());
    }

    #[test]
    fn test_paginate_short_last_page() {
        let items: Vec<u32> = (1..=25).collect();
        assert_eq!(paginate(&items, 3, 10), (21..=25).collect::<Vec<u32>>());
    }

    #[test]
    fn test_paginate_past_the_end_is_empty() {
        let items: Vec<u32> = (1..=25).collect();
        assert!(paginate(&items, 4, 10).is_empty());
        assert!(paginate(&items, usize::MAX, 10).is_empty());
    }

    #[test]
    fn test_paginate_page_zero_acts_like_page_one() {
        let items = [1, 2, 3];
        assert_eq!(paginate(&items, 0, 2), &[1, 2]);
    }

    #[test]
    fn test_paginate_empty_collection() {
        let items: [u32; 0] = [];
        assert!(paginate(&items, 1, 10).is_empty());
    }

    #[test]
    fn test_paginate_length_law() {
        let items: Vec<u32> = (0..37).collect();
        for page_size in 1..6 {
            for page_index in 1..12 {
                let expected = page_size.min(
                    items
                        .len()
                        .saturating_sub((page_index - 1) * page_size),
                );
                assert_eq!(
                    paginate(&items, page_index, page_size).len(),
                    expected,
                    "page {page_index} size {page_size}"
                );
            }
        }
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }
}
