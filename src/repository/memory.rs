//! In-memory catalog store.
//!
//! Implements every repository trait over one shared state so that the
//! cross-table rules (set-null and restrict on delete) hold exactly as they
//! do in the Postgres schema. Used by the test suite and when
//! `database.url = "memory"`.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::{
    AuthorsRepository, BooksRepository, GenresRepository, InstancesRepository, UsersRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorForm, Book, BookForm, BookInstance, BookInstanceForm, Genre, GenreForm,
        LoanStatus, NewUser, User,
    },
};

#[derive(Default)]
struct MemoryState {
    genres: BTreeMap<i32, Genre>,
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    /// (book_id, genre_id)
    book_genres: BTreeSet<(i32, i32)>,
    instances: HashMap<Uuid, BookInstance>,
    users: BTreeMap<i32, User>,
    genre_seq: i32,
    author_seq: i32,
    book_seq: i32,
    user_seq: i32,
}

fn next_id(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(items: Vec<T>, offset: i64, limit: i64) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(if offset < 0 { 0 } else { usize::MAX }))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect();
    (page, total)
}

impl MemoryState {
    fn book_view(&self, book: &Book) -> Book {
        let mut book = book.clone();
        book.author_name = book
            .author_id
            .and_then(|id| self.authors.get(&id))
            .map(|a| a.to_string());
        book
    }

    fn instance_view(&self, instance: &BookInstance) -> BookInstance {
        let mut instance = instance.clone();
        instance.book_title = self.books.get(&instance.book_id).map(|b| b.title.clone());
        instance
    }

    /// Instances matching `filter`, in due-back order with nulls first
    fn sorted_instances<F>(&self, filter: F) -> Vec<BookInstance>
    where
        F: Fn(&BookInstance) -> bool,
    {
        let mut instances: Vec<BookInstance> = self
            .instances
            .values()
            .filter(|i| filter(i))
            .map(|i| self.instance_view(i))
            .collect();
        instances.sort_by_key(|i| (i.due_back, i.id));
        instances
    }

    fn sorted_books<F>(&self, filter: F) -> Vec<Book>
    where
        F: Fn(&Book) -> bool,
    {
        let mut books: Vec<Book> = self
            .books
            .values()
            .filter(|b| filter(b))
            .map(|b| self.book_view(b))
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        books
    }

    fn check_book_references(&self, form: &BookForm, exclude_id: Option<i32>) -> AppResult<()> {
        if let Some(author_id) = form.author_id {
            if !self.authors.contains_key(&author_id) {
                return Err(AppError::ReferentialIntegrity(format!(
                    "Author {} does not exist",
                    author_id
                )));
            }
        }
        if let Some(genre_id) = form.genre_ids.iter().find(|id| !self.genres.contains_key(id)) {
            return Err(AppError::ReferentialIntegrity(format!(
                "Genre {} does not exist",
                genre_id
            )));
        }
        let duplicate = self
            .books
            .values()
            .any(|b| b.isbn == form.isbn && Some(b.id) != exclude_id);
        if duplicate {
            return Err(AppError::Validation(format!(
                "ISBN {} conflicts with an existing record",
                form.isbn
            )));
        }
        Ok(())
    }

    fn check_instance_references(&self, form: &BookInstanceForm) -> AppResult<()> {
        if !self.books.contains_key(&form.book_id) {
            return Err(AppError::ReferentialIntegrity(format!(
                "Book {} does not exist",
                form.book_id
            )));
        }
        if let Some(borrower_id) = form.borrower_id {
            if !self.users.contains_key(&borrower_id) {
                return Err(AppError::ReferentialIntegrity(format!(
                    "User {} does not exist",
                    borrower_id
                )));
            }
        }
        Ok(())
    }

    fn set_genres(&mut self, book_id: i32, genre_ids: &[i32]) {
        self.book_genres.retain(|(b, _)| *b != book_id);
        for genre_id in genre_ids {
            self.book_genres.insert((book_id, *genre_id));
        }
    }
}

/// Thread-safe in-memory store implementing all repository traits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, MemoryState>> {
        self.inner
            .read()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, MemoryState>> {
        self.inner
            .write()
            .map_err(|_| AppError::Internal("Memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl GenresRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Genre>> {
        let state = self.read()?;
        let mut genres: Vec<Genre> = state.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(genres)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Genre> {
        self.read()?
            .genres
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn create(&self, form: &GenreForm) -> AppResult<Genre> {
        let mut state = self.write()?;
        let id = next_id(&mut state.genre_seq);
        let genre = Genre {
            id,
            name: form.name.clone(),
        };
        state.genres.insert(id, genre.clone());
        Ok(genre)
    }

    async fn update(&self, id: i32, form: &GenreForm) -> AppResult<Genre> {
        let mut state = self.write()?;
        let genre = state
            .genres
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))?;
        genre.name = form.name.clone();
        Ok(genre.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.write()?;
        if state.genres.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        state.book_genres.retain(|(_, g)| *g != id);
        Ok(())
    }

    async fn count_by_name(&self, term: &str) -> AppResult<i64> {
        let state = self.read()?;
        Ok(state
            .genres
            .values()
            .filter(|g| contains_ignore_case(&g.name, term))
            .count() as i64)
    }
}

#[async_trait]
impl AuthorsRepository for MemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.read()?.authors.len() as i64)
    }

    async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<Author>, i64)> {
        let state = self.read()?;
        let mut authors: Vec<Author> = state.authors.values().cloned().collect();
        authors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then(a.first_name.cmp(&b.first_name))
                .then(a.id.cmp(&b.id))
        });
        Ok(paginate(authors, offset, limit))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        self.read()?
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn create(&self, form: &AuthorForm) -> AppResult<Author> {
        let mut state = self.write()?;
        let id = next_id(&mut state.author_seq);
        let author = Author {
            id,
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            date_of_birth: form.date_of_birth,
            date_of_death: form.date_of_death,
        };
        state.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn update(&self, id: i32, form: &AuthorForm) -> AppResult<Author> {
        let mut state = self.write()?;
        let author = state
            .authors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        author.first_name = form.first_name.clone();
        author.last_name = form.last_name.clone();
        author.date_of_birth = form.date_of_birth;
        author.date_of_death = form.date_of_death;
        Ok(author.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.write()?;
        if state.authors.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        for book in state.books.values_mut() {
            if book.author_id == Some(id) {
                book.author_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BooksRepository for MemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.read()?.books.len() as i64)
    }

    async fn count_by_title(&self, term: &str) -> AppResult<i64> {
        let state = self.read()?;
        Ok(state
            .books
            .values()
            .filter(|b| contains_ignore_case(&b.title, term))
            .count() as i64)
    }

    async fn list(&self, offset: i64, limit: i64) -> AppResult<(Vec<Book>, i64)> {
        let state = self.read()?;
        Ok(paginate(state.sorted_books(|_| true), offset, limit))
    }

    async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let state = self.read()?;
        Ok(state.sorted_books(|b| b.author_id == Some(author_id)))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let state = self.read()?;
        state
            .books
            .get(&id)
            .map(|b| state.book_view(b))
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn genres(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        let state = self.read()?;
        let mut genres: Vec<Genre> = state
            .book_genres
            .iter()
            .filter(|(b, _)| *b == book_id)
            .filter_map(|(_, g)| state.genres.get(g).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(genres)
    }

    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let state = self.read()?;
        Ok(state
            .books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude_id))
    }

    async fn create(&self, form: &BookForm) -> AppResult<Book> {
        let mut state = self.write()?;
        state.check_book_references(form, None)?;

        let id = next_id(&mut state.book_seq);
        let book = Book {
            id,
            title: form.title.clone(),
            author_id: form.author_id,
            isbn: form.isbn.clone(),
            author_name: None,
        };
        state.books.insert(id, book.clone());
        state.set_genres(id, &form.genre_ids);
        Ok(state.book_view(&book))
    }

    async fn update(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        let mut state = self.write()?;
        if !state.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        state.check_book_references(form, Some(id))?;

        let book = Book {
            id,
            title: form.title.clone(),
            author_id: form.author_id,
            isbn: form.isbn.clone(),
            author_name: None,
        };
        state.books.insert(id, book.clone());
        state.set_genres(id, &form.genre_ids);
        Ok(state.book_view(&book))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.write()?;
        if !state.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let instances = state.instances.values().filter(|i| i.book_id == id).count();
        if instances > 0 {
            return Err(AppError::ReferentialIntegrity(format!(
                "Book {} still has {} instance(s)",
                id, instances
            )));
        }

        state.books.remove(&id);
        state.book_genres.retain(|(b, _)| *b != id);
        Ok(())
    }
}

#[async_trait]
impl InstancesRepository for MemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.read()?.instances.len() as i64)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let state = self.read()?;
        Ok(state.instances.values().filter(|i| i.status == status).count() as i64)
    }

    async fn list(
        &self,
        status: Option<LoanStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        let state = self.read()?;
        let instances = state.sorted_instances(|i| status.map_or(true, |s| i.status == s));
        Ok(paginate(instances, offset, limit))
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let state = self.read()?;
        Ok(state.sorted_instances(|i| i.book_id == book_id))
    }

    async fn list_on_loan(
        &self,
        borrower_id: Option<i32>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        let state = self.read()?;
        let instances = state.sorted_instances(|i| {
            i.status == LoanStatus::OnLoan
                && borrower_id.map_or(true, |id| i.borrower_id == Some(id))
        });
        Ok(paginate(instances, offset, limit))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        let state = self.read()?;
        state
            .instances
            .get(&id)
            .map(|i| state.instance_view(i))
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn create(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let mut state = self.write()?;
        if state.instances.contains_key(&id) {
            return Err(AppError::Validation(format!(
                "Book instance {} conflicts with an existing record",
                id
            )));
        }
        state.check_instance_references(form)?;

        let instance = BookInstance {
            id,
            book_id: form.book_id,
            imprint: form.imprint.clone(),
            due_back: form.due_back,
            borrower_id: form.borrower_id,
            status: form.status,
            book_title: None,
            is_overdue: false,
        };
        state.instances.insert(id, instance.clone());
        Ok(state.instance_view(&instance))
    }

    async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let mut state = self.write()?;
        if !state.instances.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        state.check_instance_references(form)?;

        let instance = BookInstance {
            id,
            book_id: form.book_id,
            imprint: form.imprint.clone(),
            due_back: form.due_back,
            borrower_id: form.borrower_id,
            status: form.status,
            book_title: None,
            is_overdue: false,
        };
        state.instances.insert(id, instance.clone());
        Ok(state.instance_view(&instance))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.write()?;
        state
            .instances
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let mut state = self.write()?;
        let instance = state
            .instances
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))?;
        instance.due_back = Some(due_back);
        let updated = instance.clone();
        Ok(state.instance_view(&updated))
    }
}

#[async_trait]
impl UsersRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.read()?;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Validation(format!(
                "Username {} conflicts with an existing record",
                user.username
            )));
        }

        let id = next_id(&mut state.user_seq);
        let created = User {
            id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            permissions: user.permissions.clone(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        for instance in state.instances.values_mut() {
            if instance.borrower_id == Some(id) {
                instance.borrower_id = None;
            }
        }
        Ok(())
    }
}
