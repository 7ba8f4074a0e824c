//! Catalog maintenance: create, update and delete genres, authors, books
//! and copies. Every operation requires `manage-catalog`.

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorForm, Book, BookForm, BookInstance, BookInstanceForm, Capability, Genre,
        GenreForm, UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
}

impl InventoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn create_genre(&self, actor: &UserClaims, form: GenreForm) -> AppResult<Genre> {
        actor.require(Capability::ManageCatalog)?;
        form.validate()?;

        let genre = self.repository.genres.create(&form).await?;
        tracing::info!("Genre {} created by {}", genre.id, actor.sub);
        Ok(genre)
    }

    pub async fn update_genre(
        &self,
        actor: &UserClaims,
        id: i32,
        form: GenreForm,
    ) -> AppResult<Genre> {
        actor.require(Capability::ManageCatalog)?;
        form.validate()?;
        self.repository.genres.update(id, &form).await
    }

    pub async fn delete_genre(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        actor.require(Capability::ManageCatalog)?;
        self.repository.genres.delete(id).await?;
        tracing::info!("Genre {} deleted by {}", id, actor.sub);
        Ok(())
    }

    pub async fn create_author(&self, actor: &UserClaims, form: AuthorForm) -> AppResult<Author> {
        actor.require(Capability::ManageCatalog)?;
        form.check()?;

        let author = self.repository.authors.create(&form).await?;
        tracing::info!("Author {} ({}) created by {}", author.id, author, actor.sub);
        Ok(author)
    }

    pub async fn update_author(
        &self,
        actor: &UserClaims,
        id: i32,
        form: AuthorForm,
    ) -> AppResult<Author> {
        actor.require(Capability::ManageCatalog)?;
        form.check()?;
        self.repository.authors.update(id, &form).await
    }

    /// Books by the author are kept with no author
    pub async fn delete_author(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        actor.require(Capability::ManageCatalog)?;
        self.repository.authors.delete(id).await?;
        tracing::info!("Author {} deleted by {}", id, actor.sub);
        Ok(())
    }

    pub async fn create_book(&self, actor: &UserClaims, form: BookForm) -> AppResult<Book> {
        actor.require(Capability::ManageCatalog)?;
        self.check_book(&form, None).await?;

        let book = self.repository.books.create(&form).await?;
        tracing::info!("Book {} ({}) created by {}", book.id, book.title, actor.sub);
        Ok(book)
    }

    pub async fn update_book(&self, actor: &UserClaims, id: i32, form: BookForm) -> AppResult<Book> {
        actor.require(Capability::ManageCatalog)?;
        self.repository.books.get_by_id(id).await?;
        self.check_book(&form, Some(id)).await?;
        self.repository.books.update(id, &form).await
    }

    /// Refused while copies of the book exist
    pub async fn delete_book(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        actor.require(Capability::ManageCatalog)?;
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted by {}", id, actor.sub);
        Ok(())
    }

    async fn check_book(&self, form: &BookForm, id: Option<i32>) -> AppResult<()> {
        form.validate()?;

        if let Some(author_id) = form.author_id {
            referenced(self.repository.authors.get_by_id(author_id).await, "author", author_id)?;
        }
        for genre_id in &form.genre_ids {
            referenced(self.repository.genres.get_by_id(*genre_id).await, "genre", genre_id)?;
        }
        if self.repository.books.isbn_exists(&form.isbn, id).await? {
            return Err(AppError::Validation(format!(
                "ISBN {} is already in the catalog",
                form.isbn
            )));
        }
        Ok(())
    }

    /// A fresh id is generated when the form carries none
    pub async fn create_instance(
        &self,
        actor: &UserClaims,
        form: BookInstanceForm,
    ) -> AppResult<BookInstance> {
        actor.require(Capability::ManageCatalog)?;
        self.check_instance(&form).await?;

        let id = form.id.unwrap_or_else(Uuid::new_v4);
        let instance = self.repository.instances.create(id, &form).await?;
        tracing::info!("Copy {} created by {}", instance, actor.sub);
        Ok(instance)
    }

    pub async fn update_instance(
        &self,
        actor: &UserClaims,
        id: Uuid,
        form: BookInstanceForm,
    ) -> AppResult<BookInstance> {
        actor.require(Capability::ManageCatalog)?;
        self.repository.instances.get_by_id(id).await?;
        self.check_instance(&form).await?;
        self.repository.instances.update(id, &form).await
    }

    pub async fn delete_instance(&self, actor: &UserClaims, id: Uuid) -> AppResult<()> {
        actor.require(Capability::ManageCatalog)?;
        self.repository.instances.delete(id).await?;
        tracing::info!("Copy {} deleted by {}", id, actor.sub);
        Ok(())
    }

    async fn check_instance(&self, form: &BookInstanceForm) -> AppResult<()> {
        form.validate()?;

        referenced(self.repository.books.get_by_id(form.book_id).await, "book", form.book_id)?;
        if let Some(borrower_id) = form.borrower_id {
            referenced(self.repository.users.get_by_id(borrower_id).await, "borrower", borrower_id)?;
        }
        Ok(())
    }
}

/// A missing referenced row is a form error; any other failure is passed on
fn referenced<T>(lookup: AppResult<T>, what: &str, id: impl std::fmt::Display) -> AppResult<()> {
    match lookup {
        Ok(_) => Ok(()),
        Err(AppError::NotFound(_)) => Err(AppError::Validation(format!("Unknown {} {}", what, id))),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::{
        models::LoanStatus,
        repository::{MockAuthorsRepository, MockBooksRepository},
    };

    fn curator() -> UserClaims {
        UserClaims {
            sub: "curator".to_string(),
            user_id: 1,
            capabilities: vec![Capability::ManageCatalog],
            exp: i64::MAX,
            iat: 0,
        }
    }

    fn book_form(isbn: &str, author_id: Option<i32>) -> BookForm {
        BookForm {
            title: "Dune".to_string(),
            author_id,
            isbn: isbn.to_string(),
            genre_ids: vec![],
        }
    }

    fn copy_form(book_id: i32) -> BookInstanceForm {
        BookInstanceForm {
            id: None,
            book_id,
            imprint: "Ace, 1990".to_string(),
            due_back: None,
            borrower_id: None,
            status: LoanStatus::Available,
        }
    }

    fn author_form() -> AuthorForm {
        AuthorForm {
            first_name: "Frank".to_string(),
            last_name: "Herbert".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1920, 10, 8),
            date_of_death: NaiveDate::from_ymd_opt(1986, 2, 11),
        }
    }

    #[tokio::test]
    async fn test_book_with_copies_cannot_be_deleted() {
        let repository = Repository::in_memory();
        let inventory = InventoryService::new(repository.clone());
        let book = inventory
            .create_book(&curator(), book_form("9780441013593", None))
            .await
            .unwrap();
        let copy = inventory
            .create_instance(&curator(), copy_form(book.id))
            .await
            .unwrap();

        let result = inventory.delete_book(&curator(), book.id).await;
        assert!(matches!(result, Err(AppError::ReferentialIntegrity(_))));
        assert_eq!(repository.instances.get_by_id(copy.id).await.unwrap(), copy);
        assert_eq!(repository.books.get_by_id(book.id).await.unwrap().title, "Dune");

        inventory.delete_instance(&curator(), copy.id).await.unwrap();
        inventory.delete_book(&curator(), book.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_book_count_follows_create_and_delete() {
        let repository = Repository::in_memory();
        let inventory = InventoryService::new(repository.clone());
        inventory
            .create_book(&curator(), book_form("9780441013593", None))
            .await
            .unwrap();
        let before = repository.books.count().await.unwrap();

        let book = inventory
            .create_book(&curator(), book_form("9780143111580", None))
            .await
            .unwrap();
        assert_eq!(repository.books.count().await.unwrap(), before + 1);

        inventory.delete_book(&curator(), book.id).await.unwrap();
        assert_eq!(repository.books.count().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_deleting_author_keeps_their_books() {
        let repository = Repository::in_memory();
        let inventory = InventoryService::new(repository.clone());
        let author = inventory.create_author(&curator(), author_form()).await.unwrap();
        let book = inventory
            .create_book(&curator(), book_form("9780441013593", Some(author.id)))
            .await
            .unwrap();
        assert_eq!(book.author_name.as_deref(), Some("Herbert, Frank"));

        inventory.delete_author(&curator(), author.id).await.unwrap();

        let kept = repository.books.get_by_id(book.id).await.unwrap();
        assert_eq!(kept.author_id, None);
    }

    #[tokio::test]
    async fn test_invalid_book_forms_are_rejected() {
        let inventory = InventoryService::new(Repository::in_memory());
        inventory
            .create_book(&curator(), book_form("9780441013593", None))
            .await
            .unwrap();

        for form in [
            book_form("12345", None),
            book_form("9780441013593", None),
            book_form("9780143111580", Some(42)),
        ] {
            let result = inventory.create_book(&curator(), form).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_author_death_before_birth_is_rejected() {
        let inventory = InventoryService::new(Repository::in_memory());
        let mut form = author_form();
        form.date_of_death = NaiveDate::from_ymd_opt(1900, 1, 1);

        let result = inventory.create_author(&curator(), form).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_copy_gets_generated_id_and_requires_known_book() {
        let inventory = InventoryService::new(Repository::in_memory());
        let result = inventory.create_instance(&curator(), copy_form(99)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let book = inventory
            .create_book(&curator(), book_form("9780441013593", None))
            .await
            .unwrap();
        let a = inventory.create_instance(&curator(), copy_form(book.id)).await.unwrap();
        let b = inventory.create_instance(&curator(), copy_form(book.id)).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.book_title.as_deref(), Some("Dune"));
    }

    #[tokio::test]
    async fn test_writes_require_manage_catalog() {
        let mut books = MockBooksRepository::new();
        books.expect_create().never();
        books.expect_delete().never();
        let mut repository = Repository::in_memory();
        repository.books = Arc::new(books);
        let inventory = InventoryService::new(repository);

        let mut reader = curator();
        reader.capabilities = vec![Capability::MarkReturned];

        let created = inventory
            .create_book(&reader, book_form("9780441013593", None))
            .await;
        assert!(matches!(created, Err(AppError::Authorization(_))));
        let deleted = inventory.delete_book(&reader, 1).await;
        assert!(matches!(deleted, Err(AppError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_lookup_failures_are_not_mistaken_for_unknown_references() {
        let mut authors = MockAuthorsRepository::new();
        authors
            .expect_get_by_id()
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));
        let mut books = MockBooksRepository::new();
        books.expect_create().never();
        let mut repository = Repository::in_memory();
        repository.authors = Arc::new(authors);
        repository.books = Arc::new(books);
        let inventory = InventoryService::new(repository);

        let result = inventory
            .create_book(&curator(), book_form("9780441013593", Some(7)))
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
