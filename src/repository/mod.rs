//! Repository layer for catalog persistence.
//!
//! Each entity has an async trait; [`Repository`] bundles one implementation
//! of each. Two backends exist: Postgres (`Pg*Repository`) and the in-process
//! [`memory::MemoryStore`]. Both enforce the referential rules:
//!
//! * deleting an author clears `books.author_id`,
//! * deleting a book with instances fails with `ReferentialIntegrity`,
//! * deleting a user clears `book_instances.borrower_id`,
//! * deleting a genre or a book drops their `book_genres` links.

pub mod authors;
pub mod books;
pub mod genres;
pub mod instances;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Author, AuthorForm, Book, BookForm, BookInstance, BookInstanceForm, Genre, GenreForm,
        LoanStatus, NewUser, User,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenresRepository: Send + Sync {
    /// All genres ordered by name
    async fn list(&self) -> AppResult<Vec<Genre>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Genre>;
    async fn create(&self, form: &GenreForm) -> AppResult<Genre>;
    async fn update(&self, id: i32, form: &GenreForm) -> AppResult<Genre>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    /// Genres whose name contains `term`, ignoring case
    async fn count_by_name(&self, term: &str) -> AppResult<i64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorsRepository: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    /// Page of authors ordered by last name, first name, id; plus the total
    async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<Author>, i64)>;
    async fn get_by_id(&self, id: i32) -> AppResult<Author>;
    async fn create(&self, form: &AuthorForm) -> AppResult<Author>;
    async fn update(&self, id: i32, form: &AuthorForm) -> AppResult<Author>;
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksRepository: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    /// Books whose title contains `term`, ignoring case
    async fn count_by_title(&self, term: &str) -> AppResult<i64>;
    /// Page of books ordered by title, id; plus the total
    async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<Book>, i64)>;
    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;
    /// Genres of a book ordered by name
    async fn genres(&self, book_id: i32) -> AppResult<Vec<Genre>>;
    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool>;
    async fn create(&self, form: &BookForm) -> AppResult<Book>;
    async fn update(&self, id: i32, form: &BookForm) -> AppResult<Book>;
    /// Fails with `ReferentialIntegrity` while instances reference the book
    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstancesRepository: Send + Sync {
    async fn count(&self) -> AppResult<i64>;
    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64>;
    /// Page of instances in due-back order (nulls first), optionally by status
    async fn list(
        &self,
        status: Option<LoanStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<BookInstance>, i64)>;
    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>>;
    /// Instances on loan, optionally restricted to one borrower, in due-back order
    async fn list_on_loan(
        &self,
        borrower_id: Option<i32>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<BookInstance>, i64)>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance>;
    async fn create(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance>;
    async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    /// Single-row write of the due date; status is left untouched
    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<User>;
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn create(&self, user: &NewUser) -> AppResult<User>;
    /// Deletes the account and clears it as borrower on any instance
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// Main repository struct holding one implementation per entity
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub genres: Arc<dyn GenresRepository>,
    pub authors: Arc<dyn AuthorsRepository>,
    pub books: Arc<dyn BooksRepository>,
    pub instances: Arc<dyn InstancesRepository>,
    pub users: Arc<dyn UsersRepository>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            genres: Arc::new(genres::PgGenresRepository::new(pool.clone())),
            authors: Arc::new(authors::PgAuthorsRepository::new(pool.clone())),
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            instances: Arc::new(instances::PgInstancesRepository::new(pool.clone())),
            users: Arc::new(users::PgUsersRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::from_memory(memory::MemoryStore::new())
    }

    pub fn from_memory(store: memory::MemoryStore) -> Self {
        Self {
            pool: None,
            genres: Arc::new(store.clone()),
            authors: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            instances: Arc::new(store.clone()),
            users: Arc::new(store),
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
