//! Page requests and paged results for listings.

use serde::Serialize;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub number: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(number: u32, per_page: u32) -> Result<Self> {
        if number == 0 {
            return Err(AppError::invalid("page numbers start at 1"));
        }
        if per_page == 0 {
            return Err(AppError::invalid("page size must be positive"));
        }
        Ok(Self { number, per_page })
    }

    /// The first `n` items.
    pub fn first(n: u32) -> Self {
        Self { number: 1, per_page: n.max(1) }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub per_page: u32,
    /// Total matching items across all pages
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            number: request.number,
            per_page: request.per_page,
            total,
        }
    }

    /// At least one, so an empty listing still has a page 1.
    pub fn num_pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.per_page.max(1)));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages()
    }

    pub fn is_out_of_range(&self) -> bool {
        self.number > self.num_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total: self.total,
        }
    }
}
