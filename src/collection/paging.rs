//! 1-based page arithmetic.

use crate::error::{CollectionError, Result};

/// Largest addressable item index.
pub const MAX_ITEM_INDEX: u64 = i32::MAX as u64;

/// Inclusive, 1-based item range of one page.
///
/// Both ends are `0` when the collection is empty. A page past the end has
/// `first > last` and is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u64,
    pub last: u64,
}

impl PageRange {
    pub fn compute(page_index: u64, page_size: usize, total: u64) -> Result<Self> {
        if page_size == 0 {
            return Err(CollectionError::InvalidPageSize(page_size));
        }
        if page_index == 0 {
            return Err(CollectionError::InvalidPageIndex(0));
        }
        if total == 0 {
            return Ok(PageRange { first: 0, last: 0 });
        }
        let size = page_size as u64;
        let first = (page_index - 1)
            .checked_mul(size)
            .and_then(|offset| offset.checked_add(1))
            .unwrap_or(u64::MAX);
        if first > total {
            return Ok(PageRange { first, last: total });
        }
        let last = first.saturating_add(size - 1).min(total);
        if last > MAX_ITEM_INDEX {
            return Err(CollectionError::CapacityExceeded {
                last_index: last,
                bound: MAX_ITEM_INDEX,
            });
        }
        Ok(PageRange { first, last })
    }

    pub fn is_empty(&self) -> bool {
        self.first == 0 || self.first > self.last
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.last - self.first + 1) as usize
        }
    }

    /// Zero-based half-open offsets, for slicing.
    pub fn offsets(&self) -> std::ops::Range<usize> {
        if self.is_empty() {
            0..0
        } else {
            (self.first - 1) as usize..self.last as usize
        }
    }
}

/// Number of pages needed for `total` items; an empty collection has one
/// (empty) page.
pub fn page_count(total: u64, page_size: usize) -> u64 {
    if page_size == 0 || total == 0 {
        return 1;
    }
    total.div_ceil(page_size as u64)
}

/// Nearest valid page index.
pub fn clamp_page_index(page_index: u64, total: u64, page_size: usize) -> u64 {
    page_index.clamp(1, page_count(total, page_size))
}
