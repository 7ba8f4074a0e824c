//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;
pub mod page;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetails, AuthorForm};
pub use book::{Book, BookDetails, BookForm};
pub use book_instance::{BookInstance, BookInstanceForm, InstanceQuery, LoanStatus};
pub use genre::{Genre, GenreForm};
pub use page::{PageQuery, PageRequest, PaginatedResponse};
pub use user::{Capability, CreateUser, NewUser, User, UserClaims};
