use genproto::common::PaginationMeta;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Default, ToSchema, PartialEq, Eq)]
pub struct Pagination {
    pub page: i32,
    pub page_size: i32,
    pub total_items: i32,
    pub total_pages: i32,
}

impl Pagination {
    pub fn new(page: i32, page_size: i32, total_items: i64) -> Self {
        let page_size = page_size.max(1);
        let total_items = i32::try_from(total_items).unwrap_or(i32::MAX);
        let total_pages = (total_items + page_size - 1) / page_size;

        Self {
            page,
            page_size,
            total_items,
            total_pages,
        }
    }
}

impl From<PaginationMeta> for Pagination {
    fn from(meta: PaginationMeta) -> Self {
        Pagination {
            page: meta.current_page,
            page_size: meta.page_size,
            total_items: meta.total_records,
            total_pages: meta.total_pages,
        }
    }
}

impl From<Pagination> for PaginationMeta {
    fn from(value: Pagination) -> Self {
        PaginationMeta {
            current_page: value.page,
            page_size: value.page_size,
            total_records: value.total_items,
            total_pages: value.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(2, 10, 11).total_pages, 2);
    }
}
