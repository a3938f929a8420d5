//! PostgreSQL repositories.
//!
//! Author/book links live in the `author_book` join table. Saving either side
//! replaces that side's rows, so callers must keep both collections in step.
//! `Publisher::books` is never written; it is read back from `books.publisher_id`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Author, AuthorId, Book, BookId, Publisher, PublisherId};
use crate::repository::{Repositories, Repository};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        info!("Connected to database");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn repositories(&self) -> Repositories {
        Repositories::new(
            Arc::new(PgAuthorRepository::new(self.pool.clone())),
            Arc::new(PgBookRepository::new(self.pool.clone())),
            Arc::new(PgPublisherRepository::new(self.pool.clone())),
        )
    }

    /// Returns a reference to the pool for advanced usage.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct AuthorRow {
    id: AuthorId,
    firstname: String,
    lastname: String,
}

#[derive(Debug, FromRow)]
struct BookRow {
    id: BookId,
    title: String,
    isbn: String,
    publisher_id: Option<PublisherId>,
}

#[derive(Debug, FromRow)]
struct PublisherRow {
    id: PublisherId,
    publisher_name: String,
    address: String,
    city: String,
    state: String,
    zip: String,
}

#[derive(Debug, FromRow)]
struct AuthorBookRow {
    author_id: AuthorId,
    book_id: BookId,
}

async fn author_book_links(pool: &PgPool) -> AppResult<Vec<AuthorBookRow>> {
    let links = sqlx::query_as("SELECT author_id, book_id FROM author_book ORDER BY author_id, book_id")
        .fetch_all(pool)
        .await?;
    Ok(links)
}

pub struct PgAuthorRepository {
    pool: PgPool,
}

impl PgAuthorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_author(row: AuthorRow, books: BTreeSet<BookId>) -> Author {
        Author {
            id: Some(row.id),
            firstname: row.firstname,
            lastname: row.lastname,
            books,
        }
    }
}

#[async_trait]
impl Repository<Author> for PgAuthorRepository {
    async fn save(&self, mut author: Author) -> AppResult<Author> {
        let mut tx = self.pool.begin().await?;

        let id = match author.id {
            Some(id) => {
                let result =
                    sqlx::query("UPDATE authors SET firstname = $2, lastname = $3 WHERE id = $1")
                        .bind(id)
                        .bind(&author.firstname)
                        .bind(&author.lastname)
                        .execute(&mut *tx)
                        .await?;
                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound);
                }
                id
            }
            None => {
                sqlx::query_scalar(
                    "INSERT INTO authors (firstname, lastname) VALUES ($1, $2) RETURNING id",
                )
                .bind(&author.firstname)
                .bind(&author.lastname)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        sqlx::query("DELETE FROM author_book WHERE author_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for book_id in &author.books {
            sqlx::query("INSERT INTO author_book (author_id, book_id) VALUES ($1, $2)")
                .bind(id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Saved author {id}");

        author.id = Some(id);
        Ok(author)
    }

    async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_by_id(&self, id: AuthorId) -> AppResult<Option<Author>> {
        let row: Option<AuthorRow> =
            sqlx::query_as("SELECT id, firstname, lastname FROM authors WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let books: Vec<BookId> =
            sqlx::query_scalar("SELECT book_id FROM author_book WHERE author_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(Self::into_author(row, books.into_iter().collect())))
    }

    async fn find_all(&self) -> AppResult<Vec<Author>> {
        let rows: Vec<AuthorRow> =
            sqlx::query_as("SELECT id, firstname, lastname FROM authors ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let mut books: BTreeMap<AuthorId, BTreeSet<BookId>> = BTreeMap::new();
        for link in author_book_links(&self.pool).await? {
            books.entry(link.author_id).or_default().insert(link.book_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let linked = books.remove(&row.id).unwrap_or_default();
                Self::into_author(row, linked)
            })
            .collect())
    }
}

pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_book(row: BookRow, authors: BTreeSet<AuthorId>) -> Book {
        Book {
            id: Some(row.id),
            title: row.title,
            isbn: row.isbn,
            authors,
            publisher: row.publisher_id,
        }
    }
}

#[async_trait]
impl Repository<Book> for PgBookRepository {
    async fn save(&self, mut book: Book) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id = match book.id {
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE books SET title = $2, isbn = $3, publisher_id = $4 WHERE id = $1",
                )
                .bind(id)
                .bind(&book.title)
                .bind(&book.isbn)
                .bind(book.publisher)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound);
                }
                id
            }
            None => {
                sqlx::query_scalar(
                    "INSERT INTO books (title, isbn, publisher_id) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(&book.title)
                .bind(&book.isbn)
                .bind(book.publisher)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        sqlx::query("DELETE FROM author_book WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for author_id in &book.authors {
            sqlx::query("INSERT INTO author_book (author_id, book_id) VALUES ($1, $2)")
                .bind(author_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Saved book {id}");

        book.id = Some(id);
        Ok(book)
    }

    async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_by_id(&self, id: BookId) -> AppResult<Option<Book>> {
        let row: Option<BookRow> =
            sqlx::query_as("SELECT id, title, isbn, publisher_id FROM books WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let authors: Vec<AuthorId> =
            sqlx::query_scalar("SELECT author_id FROM author_book WHERE book_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(Self::into_book(row, authors.into_iter().collect())))
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        let rows: Vec<BookRow> =
            sqlx::query_as("SELECT id, title, isbn, publisher_id FROM books ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let mut authors: BTreeMap<BookId, BTreeSet<AuthorId>> = BTreeMap::new();
        for link in author_book_links(&self.pool).await? {
            authors.entry(link.book_id).or_default().insert(link.author_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let linked = authors.remove(&row.id).unwrap_or_default();
                Self::into_book(row, linked)
            })
            .collect())
    }
}

pub struct PgPublisherRepository {
    pool: PgPool,
}

impl PgPublisherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn into_publisher(row: PublisherRow, books: BTreeSet<BookId>) -> Publisher {
        Publisher {
            id: Some(row.id),
            publisher_name: row.publisher_name,
            address: row.address,
            city: row.city,
            state: row.state,
            zip: row.zip,
            books,
        }
    }
}

#[async_trait]
impl Repository<Publisher> for PgPublisherRepository {
    async fn save(&self, mut publisher: Publisher) -> AppResult<Publisher> {
        let id = match publisher.id {
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE publishers
                    SET publisher_name = $2, address = $3, city = $4, state = $5, zip = $6
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(&publisher.publisher_name)
                .bind(&publisher.address)
                .bind(&publisher.city)
                .bind(&publisher.state)
                .bind(&publisher.zip)
                .execute(&self.pool)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound);
                }
                id
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO publishers (publisher_name, address, city, state, zip)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(&publisher.publisher_name)
                .bind(&publisher.address)
                .bind(&publisher.city)
                .bind(&publisher.state)
                .bind(&publisher.zip)
                .fetch_one(&self.pool)
                .await?
            }
        };

        debug!("Saved publisher {id}");

        publisher.id = Some(id);
        Ok(publisher)
    }

    async fn count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM publishers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_by_id(&self, id: PublisherId) -> AppResult<Option<Publisher>> {
        let row: Option<PublisherRow> = sqlx::query_as(
            "SELECT id, publisher_name, address, city, state, zip FROM publishers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let books: Vec<BookId> =
            sqlx::query_scalar("SELECT id FROM books WHERE publisher_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(Self::into_publisher(row, books.into_iter().collect())))
    }

    async fn find_all(&self) -> AppResult<Vec<Publisher>> {
        let rows: Vec<PublisherRow> = sqlx::query_as(
            "SELECT id, publisher_name, address, city, state, zip FROM publishers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let published: Vec<(BookId, PublisherId)> = sqlx::query_as(
            "SELECT id, publisher_id FROM books WHERE publisher_id IS NOT NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut books: BTreeMap<PublisherId, BTreeSet<BookId>> = BTreeMap::new();
        for (book_id, publisher_id) in published {
            books.entry(publisher_id).or_default().insert(book_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let linked = books.remove(&row.id).unwrap_or_default();
                Self::into_publisher(row, linked)
            })
            .collect())
    }
}
