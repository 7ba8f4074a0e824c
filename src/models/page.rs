//! Pagination request and response types

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{author::Author, book::Book, book_instance::BookInstance};
use crate::{
    config::PaginationConfig,
    error::{AppError, AppResult},
};

/// `?page=&per_page=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Page number, starting at 1 (default: 1)
    pub page: Option<i64>,
    /// Items per page (default from configuration)
    pub per_page: Option<i64>,
}

/// Validated page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(query: PageQuery, config: &PaginationConfig) -> AppResult<Self> {
        let page = query.page.unwrap_or(1);
        let per_page = query.per_page.unwrap_or(config.default_per_page);

        if page < 1 {
            return Err(AppError::Validation(format!("Invalid page number: {}", page)));
        }
        if per_page < 1 || per_page > config.max_per_page {
            return Err(AppError::Validation(format!(
                "per_page must be between 1 and {}",
                config.max_per_page
            )));
        }
        Ok(Self { page, per_page })
    }

    /// Saturates so that absurdly large pages land past the end
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookPage = PaginatedResponse<Book>,
    AuthorPage = PaginatedResponse<Author>,
    InstancePage = PaginatedResponse<BookInstance>
)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_per_page: 10,
            max_per_page: 50,
        }
    }

    #[test]
    fn test_defaults_and_offset() {
        let request = PageRequest::new(PageQuery::default(), &config()).unwrap();
        assert_eq!(request, PageRequest { page: 1, per_page: 10 });
        assert_eq!(request.offset(), 0);

        let third = PageRequest::new(
            PageQuery {
                page: Some(3),
                per_page: Some(5),
            },
            &config(),
        )
        .unwrap();
        assert_eq!(third.offset(), 10);
        assert_eq!(third.limit(), 5);
    }

    #[test]
    fn test_huge_page_offset_saturates() {
        let request = PageRequest::new(
            PageQuery {
                page: Some(i64::MAX),
                per_page: Some(50),
            },
            &config(),
        )
        .unwrap();
        assert_eq!(request.offset(), i64::MAX);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for (page, per_page) in [(Some(0), None), (None, Some(0)), (None, Some(51))] {
            let result = PageRequest::new(PageQuery { page, per_page }, &config());
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }
}
