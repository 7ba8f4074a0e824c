//! Book (catalog entry) model and related types.
//!
//! A book is the bibliographic record; the physical copies that circulate
//! are [`BookInstance`](super::book_instance::BookInstance)s.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book_instance::BookInstance;
use super::genre::Genre;

/// ISBN-13: exactly thirteen digits, no separators
pub static ISBN13_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{13}$").unwrap());

/// Number of genres shown in `display_genre`
const DISPLAY_GENRE_LIMIT: usize = 3;

/// Book row, with the author's display name when joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub isbn: String,
    #[sqlx(default)]
    #[serde(default)]
    pub author_name: Option<String>,
}

impl Book {
    /// Detail page path for this book
    pub fn url(&self) -> String {
        format!("/book/{}", self.id)
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Book with its genres and copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub url: String,
    pub display_genre: String,
    pub genres: Vec<Genre>,
    pub instances: Vec<BookInstance>,
}

/// Comma-separated names of the first few genres
pub fn display_genre(genres: &[Genre]) -> String {
    genres
        .iter()
        .take(DISPLAY_GENRE_LIMIT)
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Create / update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookForm {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    pub author_id: Option<i32>,
    /// 13 digit ISBN, unique across the catalog
    #[validate(regex(path = *ISBN13_RE, message = "ISBN must be exactly 13 digits"))]
    pub isbn: String,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(id: i32, name: &str) -> Genre {
        Genre {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_display_genre_keeps_first_three() {
        let genres = vec![
            genre(1, "Fantasy"),
            genre(2, "Horror"),
            genre(3, "Science Fiction"),
            genre(4, "Western"),
        ];
        assert_eq!(display_genre(&genres), "Fantasy, Horror, Science Fiction");
        assert_eq!(display_genre(&[]), "");
    }

    #[test]
    fn test_isbn_must_be_thirteen_digits() {
        let mut form = BookForm {
            title: "The Dispossessed".to_string(),
            author_id: None,
            isbn: "9780060512750".to_string(),
            genre_ids: vec![],
        };
        assert!(form.validate().is_ok());

        form.isbn = "978-0060512750".to_string();
        assert!(form.validate().is_err());

        form.isbn = "978006051275".to_string();
        assert!(form.validate().is_err());
    }
}
