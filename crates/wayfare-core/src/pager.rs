//! Infinite-scroll list state.
//!
//! The pager hands out [`PageRequest`]s and accepts their results. Each
//! request is stamped with the generation current when it was issued; a
//! filter change bumps the generation, so results for old criteria are
//! dropped instead of being mixed into the new list.

use std::fmt::Display;
use std::future::Future;

use crate::api::Page;

/// A page fetch issued by the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub generation: u64,
}

/// What happened to a page result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Page 1 replaced the list.
    Replaced,
    /// A later page was appended.
    Appended,
    /// Result belongs to an older generation.
    Stale,
    /// Page was already loaded.
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct Pager<T> {
    page_size: u32,
    filter_key: Option<String>,
    generation: u64,
    items: Vec<T>,
    page: u32,
    last_loaded_page: Option<u32>,
    total: u64,
    has_more: bool,
    initial_loading: bool,
    loading_more: bool,
    error: Option<String>,
}

impl<T> Pager<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            filter_key: None,
            generation: 0,
            items: Vec::new(),
            page: 0,
            last_loaded_page: None,
            total: 0,
            has_more: true,
            initial_loading: false,
            loading_more: false,
            error: None,
        }
    }

    /// Drops all state and requests page 1 for `filter_key`.
    pub fn reset(&mut self, filter_key: impl Into<String>) -> PageRequest {
        self.generation += 1;
        self.filter_key = Some(filter_key.into());
        self.items.clear();
        self.page = 0;
        self.last_loaded_page = None;
        self.total = 0;
        self.has_more = true;
        self.loading_more = false;
        self.error = None;
        self.initial_loading = true;
        tracing::debug!(generation = self.generation, "pager reset");
        PageRequest {
            page: 1,
            generation: self.generation,
        }
    }

    /// Resets only when the criteria actually changed.
    pub fn set_filter(&mut self, filter_key: &str) -> Option<PageRequest> {
        if self.filter_key.as_deref() == Some(filter_key) {
            return None;
        }
        Some(self.reset(filter_key))
    }

    /// Requests the next page, unless a fetch is in flight or nothing is left.
    pub fn request_more(&mut self) -> Option<PageRequest> {
        if self.is_loading() || !self.has_more || self.filter_key.is_none() {
            return None;
        }
        let next = self.last_loaded_page.map_or(1, |p| p + 1);
        self.loading_more = true;
        Some(PageRequest {
            page: next,
            generation: self.generation,
        })
    }

    /// Records a fetched page.
    pub fn apply(&mut self, request: PageRequest, page: Page<T>) -> Applied {
        if request.generation != self.generation {
            tracing::debug!(page = request.page, "dropping stale page");
            return Applied::Stale;
        }
        self.initial_loading = false;
        self.loading_more = false;

        if self
            .last_loaded_page
            .is_some_and(|loaded| request.page <= loaded)
        {
            tracing::debug!(page = request.page, "page already loaded");
            return Applied::Duplicate;
        }

        self.error = None;
        self.total = page.total;
        let received = page.items.len();
        let applied = if request.page <= 1 {
            self.items = page.items;
            Applied::Replaced
        } else {
            self.items.extend(page.items);
            Applied::Appended
        };
        self.page = request.page;
        self.last_loaded_page = Some(request.page);
        self.has_more = received > 0
            && u64::from(request.page) < Page::<T>::page_count(self.total, self.page_size);
        applied
    }

    /// Records a failed fetch. `has_more` is left alone so it can be retried.
    pub fn fail(&mut self, request: PageRequest, message: impl Into<String>) {
        if request.generation != self.generation {
            return;
        }
        self.initial_loading = false;
        self.loading_more = false;
        self.error = Some(message.into());
    }

    /// Runs `fetch` for `request` and records the outcome.
    pub async fn load<F, Fut, E>(&mut self, request: PageRequest, fetch: F) -> Option<Applied>
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
        E: Display,
    {
        match fetch(request.page).await {
            Ok(page) => Some(self.apply(request, page)),
            Err(err) => {
                self.fail(request, err.to_string());
                None
            }
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_initial_loading(&self) -> bool {
        self.initial_loading
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn is_loading(&self) -> bool {
        self.initial_loading || self.loading_more
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filter_key(&self) -> Option<&str> {
        self.filter_key.as_deref()
    }
}
