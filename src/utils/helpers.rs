// utils/helpers.rs
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Paramètres de pagination (`?page=&page_size=`)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Découpe une liste déjà triée et calcule les métadonnées associées
    pub fn paginate<T>(&self, items: Vec<T>) -> (Vec<T>, PaginationMeta) {
        let page = self.page();
        let page_size = self.page_size();
        let total_items = items.len() as u64;
        let skip = ((page - 1) as usize).saturating_mul(page_size as usize);

        let slice = items
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect();

        (slice, PaginationMeta::new(page, page_size, total_items))
    }
}

/// Métadonnées de pagination renvoyées dans `meta`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: u32, page_size: u32, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + page_size as u64 - 1) / page_size as u64
        };

        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_next: (page as u64) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(2, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        let empty = PaginationMeta::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn test_paginate_clamps_parameters() {
        let params = PaginationParams { page: Some(0), page_size: Some(1000) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);

        let params = PaginationParams { page: Some(3), page_size: Some(2) };
        let (items, meta) = params.paginate((1..=5).collect::<Vec<_>>());
        assert_eq!(items, vec![5]);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_default_params_return_first_page() {
        let params = PaginationParams::default();
        let (items, meta) = params.paginate((1..=25).collect::<Vec<_>>());
        assert_eq!(items.len(), DEFAULT_PAGE_SIZE as usize);
        assert_eq!(meta.page, 1);
        assert!(meta.has_next);
    }
}
