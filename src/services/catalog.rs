//! Catalog query service: counts, listings and detail views

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::{DashboardConfig, PaginationConfig},
    error::AppResult,
    models::{
        book::display_genre,
        book_instance::today,
        Author, AuthorDetails, Book, BookDetails, BookInstance, Capability, Genre, InstanceQuery,
        LoanStatus, PageQuery, PageRequest, PaginatedResponse, UserClaims,
    },
    repository::Repository,
};

/// Home page counters
#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    /// Term matched against book titles
    pub title_term: String,
    pub num_books_matching_title: i64,
    /// Term matched against genre names
    pub genre_term: String,
    pub num_genres_matching: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    pagination: PaginationConfig,
    dashboard: DashboardConfig,
}

impl CatalogService {
    pub fn new(
        repository: Repository,
        pagination: PaginationConfig,
        dashboard: DashboardConfig,
    ) -> Self {
        Self {
            repository,
            pagination,
            dashboard,
        }
    }

    pub fn page_request(&self, query: PageQuery) -> AppResult<PageRequest> {
        PageRequest::new(query, &self.pagination)
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }

    pub async fn count_books(&self) -> AppResult<i64> {
        self.repository.books.count().await
    }

    pub async fn count_instances(&self) -> AppResult<i64> {
        self.repository.instances.count().await
    }

    pub async fn count_available_instances(&self) -> AppResult<i64> {
        self.repository
            .instances
            .count_by_status(LoanStatus::Available)
            .await
    }

    pub async fn count_authors(&self) -> AppResult<i64> {
        self.repository.authors.count().await
    }

    pub async fn count_books_by_title(&self, term: &str) -> AppResult<i64> {
        self.repository.books.count_by_title(term).await
    }

    pub async fn count_genres_by_name(&self, term: &str) -> AppResult<i64> {
        self.repository.genres.count_by_name(term).await
    }

    /// All home page counters in one call
    pub async fn dashboard(&self) -> AppResult<Dashboard> {
        Ok(Dashboard {
            num_books: self.count_books().await?,
            num_instances: self.count_instances().await?,
            num_instances_available: self.count_available_instances().await?,
            num_authors: self.count_authors().await?,
            title_term: self.dashboard.title_term.clone(),
            num_books_matching_title: self.count_books_by_title(&self.dashboard.title_term).await?,
            genre_term: self.dashboard.genre_term.clone(),
            num_genres_matching: self.count_genres_by_name(&self.dashboard.genre_term).await?,
        })
    }

    pub async fn list_books(&self, query: PageQuery) -> AppResult<PaginatedResponse<Book>> {
        let request = self.page_request(query)?;
        let (books, total) = self
            .repository
            .books
            .list(request.offset(), request.limit())
            .await?;
        Ok(PaginatedResponse::new(books, total, request))
    }

    pub async fn list_authors(&self, query: PageQuery) -> AppResult<PaginatedResponse<Author>> {
        let request = self.page_request(query)?;
        let (authors, total) = self
            .repository
            .authors
            .list(request.offset(), request.limit())
            .await?;
        Ok(PaginatedResponse::new(authors, total, request))
    }

    /// Book with genres and copies
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;
        let genres = self.repository.books.genres(id).await?;
        let today = today();
        let instances = self
            .repository
            .instances
            .list_for_book(id)
            .await?
            .into_iter()
            .map(|i| i.with_overdue(today))
            .collect();

        Ok(BookDetails {
            url: book.url(),
            display_genre: display_genre(&genres),
            book,
            genres,
            instances,
        })
    }

    /// Author with the books attributed to them
    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetails> {
        let author = self.repository.authors.get_by_id(id).await?;
        let books = self.repository.books.list_by_author(id).await?;

        Ok(AuthorDetails {
            display_name: author.to_string(),
            url: author.url(),
            author,
            books,
        })
    }

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    /// Admin list of copies, optionally filtered by status
    pub async fn list_instances(
        &self,
        actor: &UserClaims,
        query: &InstanceQuery,
    ) -> AppResult<PaginatedResponse<BookInstance>> {
        actor.require(Capability::ManageCatalog)?;

        let request = self.page_request(PageQuery {
            page: query.page,
            per_page: query.per_page,
        })?;
        let (instances, total) = self
            .repository
            .instances
            .list(query.status, request.offset(), request.limit())
            .await?;
        Ok(PaginatedResponse::new(with_overdue(instances), total, request))
    }

    pub async fn get_instance(&self, actor: &UserClaims, id: Uuid) -> AppResult<BookInstance> {
        actor.require(Capability::ManageCatalog)?;

        let instance = self.repository.instances.get_by_id(id).await?;
        Ok(instance.with_overdue(today()))
    }

    /// Copies currently on loan to `user`, soonest due first
    pub async fn list_loans_for_user(
        &self,
        user: &UserClaims,
        query: PageQuery,
    ) -> AppResult<PaginatedResponse<BookInstance>> {
        let request = self.page_request(query)?;
        let (instances, total) = self
            .repository
            .instances
            .list_on_loan(Some(user.user_id), request.offset(), request.limit())
            .await?;
        Ok(PaginatedResponse::new(with_overdue(instances), total, request))
    }

    /// Every copy on loan, soonest due first
    pub async fn list_all_active_loans(
        &self,
        actor: &UserClaims,
        query: PageQuery,
    ) -> AppResult<PaginatedResponse<BookInstance>> {
        actor.require(Capability::MarkReturned)?;

        let request = self.page_request(query)?;
        let (instances, total) = self
            .repository
            .instances
            .list_on_loan(None, request.offset(), request.limit())
            .await?;
        Ok(PaginatedResponse::new(with_overdue(instances), total, request))
    }
}

fn with_overdue(instances: Vec<BookInstance>) -> Vec<BookInstance> {
    let today = today();
    instances.into_iter().map(|i| i.with_overdue(today)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::{
        error::AppError,
        models::{AuthorForm, BookForm, BookInstanceForm, GenreForm, NewUser},
        repository::{MockInstancesRepository, Repository},
    };

    fn service(repository: Repository) -> CatalogService {
        CatalogService::new(
            repository,
            PaginationConfig {
                default_per_page: 2,
                max_per_page: 10,
            },
            DashboardConfig {
                title_term: "SKUL".to_string(),
                genre_term: "fiction".to_string(),
            },
        )
    }

    fn claims(user_id: i32, capabilities: Vec<Capability>) -> UserClaims {
        UserClaims {
            sub: format!("user{}", user_id),
            user_id,
            capabilities,
            exp: i64::MAX,
            iat: 0,
        }
    }

    async fn add_user(repository: &Repository, username: &str) -> i32 {
        repository
            .users
            .create(&NewUser {
                username: username.to_string(),
                password_hash: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                permissions: vec![],
            })
            .await
            .unwrap()
            .id
    }

    async fn add_book(repository: &Repository, title: &str, isbn: &str) -> Book {
        repository
            .books
            .create(&BookForm {
                title: title.to_string(),
                author_id: None,
                isbn: isbn.to_string(),
                genre_ids: vec![],
            })
            .await
            .unwrap()
    }

    async fn add_copy(
        repository: &Repository,
        book_id: i32,
        status: LoanStatus,
        borrower_id: Option<i32>,
        due_back: Option<NaiveDate>,
    ) -> BookInstance {
        repository
            .instances
            .create(
                Uuid::new_v4(),
                &BookInstanceForm {
                    id: None,
                    book_id,
                    imprint: "Reprint".to_string(),
                    due_back,
                    borrower_id,
                    status,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let repository = Repository::in_memory();
        let book = add_book(&repository, "The Skull Throne", "9780345524164").await;
        add_book(&repository, "Dune", "9780441013593").await;
        add_copy(&repository, book.id, LoanStatus::Available, None, None).await;
        add_copy(&repository, book.id, LoanStatus::Maintenance, None, None).await;
        for name in ["Science Fiction", "Fantasy", "Historical fiction"] {
            repository
                .genres
                .create(&GenreForm {
                    name: name.to_string(),
                })
                .await
                .unwrap();
        }

        let dashboard = service(repository).dashboard().await.unwrap();
        assert_eq!(dashboard.num_books, 2);
        assert_eq!(dashboard.num_instances, 2);
        assert_eq!(dashboard.num_instances_available, 1);
        assert_eq!(dashboard.num_authors, 0);
        assert_eq!(dashboard.num_books_matching_title, 1);
        assert_eq!(dashboard.num_genres_matching, 2);
    }

    #[tokio::test]
    async fn test_book_pages_match_global_offsets() {
        let repository = Repository::in_memory();
        for (i, title) in ["E", "A", "D", "B", "C"].iter().enumerate() {
            add_book(&repository, title, &format!("978000000000{}", i)).await;
        }
        let catalog = service(repository);

        let mut seen = Vec::new();
        for page in 1..=3 {
            let result = catalog
                .list_books(PageQuery {
                    page: Some(page),
                    per_page: None,
                })
                .await
                .unwrap();
            assert_eq!(result.total, 5);
            seen.extend(result.items.into_iter().map(|b| b.title));
        }
        assert_eq!(seen, vec!["A", "B", "C", "D", "E"]);

        let past_end = catalog
            .list_books(PageQuery {
                page: Some(9),
                per_page: None,
            })
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn test_authors_ordered_by_last_then_first_name() {
        let repository = Repository::in_memory();
        for (first, last) in [("Zadie", "Smith"), ("Ali", "Smith"), ("Iain", "Banks")] {
            repository
                .authors
                .create(&AuthorForm {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    date_of_birth: None,
                    date_of_death: None,
                })
                .await
                .unwrap();
        }

        let page = service(repository)
            .list_authors(PageQuery {
                page: Some(1),
                per_page: Some(10),
            })
            .await
            .unwrap();
        let names: Vec<String> = page.items.iter().map(|a| a.to_string()).collect();
        assert_eq!(names, vec!["Banks, Iain", "Smith, Ali", "Smith, Zadie"]);
    }

    #[tokio::test]
    async fn test_loans_for_user_only_returns_their_copies_on_loan() {
        let repository = Repository::in_memory();
        let alice = add_user(&repository, "alice").await;
        let bob = add_user(&repository, "bob").await;
        let book = add_book(&repository, "Dune", "9780441013593").await;
        let today = today();

        let late = add_copy(&repository, book.id, LoanStatus::OnLoan, Some(alice), Some(today + Duration::days(9))).await;
        let soon = add_copy(&repository, book.id, LoanStatus::OnLoan, Some(alice), Some(today - Duration::days(1))).await;
        add_copy(&repository, book.id, LoanStatus::Reserved, Some(alice), None).await;
        add_copy(&repository, book.id, LoanStatus::OnLoan, Some(bob), Some(today)).await;

        let page = service(repository)
            .list_loans_for_user(&claims(alice, vec![]), PageQuery { page: Some(1), per_page: Some(10) })
            .await
            .unwrap();

        let ids: Vec<Uuid> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![soon.id, late.id]);
        assert!(page
            .items
            .iter()
            .all(|i| i.borrower_id == Some(alice) && i.status == LoanStatus::OnLoan));
        assert!(page.items[0].is_overdue);
        assert!(!page.items[1].is_overdue);
    }

    #[tokio::test]
    async fn test_all_active_loans_requires_capability_before_querying() {
        let mut instances = MockInstancesRepository::new();
        instances.expect_list_on_loan().never();
        let mut repository = Repository::in_memory();
        repository.instances = Arc::new(instances);

        let result = service(repository)
            .list_all_active_loans(&claims(1, vec![]), PageQuery::default())
            .await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }

    #[tokio::test]
    async fn test_book_details_include_genres_and_copies() {
        let repository = Repository::in_memory();
        let genre = repository
            .genres
            .create(&GenreForm {
                name: "Science Fiction".to_string(),
            })
            .await
            .unwrap();
        let book = repository
            .books
            .create(&BookForm {
                title: "Dune".to_string(),
                author_id: None,
                isbn: "9780441013593".to_string(),
                genre_ids: vec![genre.id],
            })
            .await
            .unwrap();
        add_copy(&repository, book.id, LoanStatus::Available, None, None).await;

        let details = service(repository).get_book(book.id).await.unwrap();
        assert_eq!(details.url, format!("/book/{}", book.id));
        assert_eq!(details.display_genre, "Science Fiction");
        assert_eq!(details.instances.len(), 1);
    }
}
