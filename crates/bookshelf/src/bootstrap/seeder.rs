//! Bootstrap seeding routine.

use std::io::Write;

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppResult;
use crate::models::{Author, Book, Publisher, assign_publisher, link_author_book};
use crate::repository::{Entity, Repositories};

/// Saved entities and final row counts from one bootstrap run.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub authors: Vec<Author>,
    pub books: Vec<Book>,
    pub publishers: Vec<Publisher>,
    pub author_count: i64,
    pub book_count: i64,
    pub publisher_count: i64,
}

/// Seeds the initial catalog.
///
/// Runs are not idempotent: nothing checks for existing rows, so each call
/// inserts another full set of records.
pub struct BootstrapData {
    repositories: Repositories,
}

impl BootstrapData {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// Seeds the catalog and prints the count summary to stdout.
    pub async fn run(&self) -> AppResult<SeedReport> {
        let mut stdout = std::io::stdout();
        self.run_with_output(&mut stdout).await
    }

    /// Seeds the catalog and writes the count summary to `out`.
    ///
    /// Any repository or write failure is returned as is; rows saved before the
    /// failure stay in the store.
    pub async fn run_with_output<W: Write>(&self, out: &mut W) -> AppResult<SeedReport> {
        let authors = &self.repositories.authors;
        let books = &self.repositories.books;
        let publishers = &self.repositories.publishers;

        info!("Seeding 2 authors and 2 books...");

        let mut eric = authors.save(Author::new("Eric", "Evans")).await?;
        let mut ddd = books
            .save(Book::new("Domain Driven Design", "123456"))
            .await?;

        let mut rod = authors.save(Author::new("Rod", "Johnson")).await?;
        let mut no_ejb = books
            .save(Book::new("J2EE Development without EJB", "54757585"))
            .await?;

        link_author_book(&mut eric, &mut ddd)?;
        link_author_book(&mut rod, &mut no_ejb)?;
        debug!("Linked {} and {} to their books", eric.full_name(), rod.full_name());

        info!("Seeding 1 publisher...");

        let mut penguin = publishers
            .save(Publisher {
                publisher_name: "Penguin".to_string(),
                address: "Main Street 5".to_string(),
                city: "North Pole".to_string(),
                state: "Fishing".to_string(),
                zip: "176F".to_string(),
                ..Default::default()
            })
            .await?;

        assign_publisher(&mut ddd, &mut penguin)?;
        assign_publisher(&mut no_ejb, &mut penguin)?;

        // The first saves captured the unlinked state.
        let eric = authors.save(eric).await?;
        let rod = authors.save(rod).await?;
        let ddd = books.save(ddd).await?;
        let no_ejb = books.save(no_ejb).await?;
        let penguin = publishers.save(penguin).await?;

        let author_count = authors.count().await?;
        let book_count = books.count().await?;
        let publisher_count = publishers.count().await?;

        writeln!(out, "In Bootstrap")?;
        writeln!(out, "{} Count: {}", Author::NAME, author_count)?;
        writeln!(out, "{} Count: {}", Book::NAME, book_count)?;
        writeln!(out, "{} Count: {}", Publisher::NAME, publisher_count)?;
        out.flush()?;

        let report = SeedReport {
            authors: vec![eric, rod],
            books: vec![ddd, no_ejb],
            publishers: vec![penguin],
            author_count,
            book_count,
            publisher_count,
        };

        info!(
            "Bootstrap complete: {} authors, {} books, {} publishers",
            author_count, book_count, publisher_count
        );
        match serde_json::to_string(&report) {
            Ok(json) => debug!("Seed report: {json}"),
            Err(e) => debug!("Seed report not serializable: {e}"),
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::errors::AppError;
    use crate::memory::MemoryRepository;
    use crate::models::PublisherId;
    use crate::repository::Repository;

    async fn seed(repositories: &Repositories) -> (SeedReport, String) {
        let mut out = Vec::new();
        let report = BootstrapData::new(repositories.clone())
            .run_with_output(&mut out)
            .await
            .unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_counts_after_single_run() {
        let repositories = Repositories::in_memory();
        let (report, _) = seed(&repositories).await;

        assert_eq!(repositories.authors.count().await.unwrap(), 2);
        assert_eq!(repositories.books.count().await.unwrap(), 2);
        assert_eq!(repositories.publishers.count().await.unwrap(), 1);
        assert_eq!(
            (report.author_count, report.book_count, report.publisher_count),
            (2, 2, 1)
        );
    }

    #[tokio::test]
    async fn test_console_summary() {
        let repositories = Repositories::in_memory();
        let (_, output) = seed(&repositories).await;

        assert_eq!(
            output,
            "In Bootstrap\nAuthor Count: 2\nBook Count: 2\nPublisher Count: 1\n"
        );
    }

    #[tokio::test]
    async fn test_authors_and_books_linked_both_ways() {
        let repositories = Repositories::in_memory();
        seed(&repositories).await;

        let authors = repositories.authors.find_all().await.unwrap();
        let books = repositories.books.find_all().await.unwrap();

        for (name, title) in [
            ("Eric Evans", "Domain Driven Design"),
            ("Rod Johnson", "J2EE Development without EJB"),
        ] {
            let author = authors.iter().find(|a| a.full_name() == name).unwrap();
            let book = books.iter().find(|b| b.title == title).unwrap();

            assert_eq!(author.books.len(), 1);
            assert!(author.books.contains(&book.id.unwrap()));
            assert_eq!(book.authors.len(), 1);
            assert!(book.authors.contains(&author.id.unwrap()));
        }
    }

    #[tokio::test]
    async fn test_books_share_single_publisher() {
        let repositories = Repositories::in_memory();
        seed(&repositories).await;

        let publishers = repositories.publishers.find_all().await.unwrap();
        assert_eq!(publishers.len(), 1);
        let penguin = &publishers[0];
        assert_eq!(penguin.publisher_name, "Penguin");
        assert_eq!(penguin.zip, "176F");

        let books = repositories.books.find_all().await.unwrap();
        for book in &books {
            assert_eq!(book.publisher, penguin.id);
            assert!(penguin.books.contains(&book.id.unwrap()));
        }
        assert_eq!(penguin.books.len(), 2);
    }

    #[tokio::test]
    async fn test_isbn_round_trips() {
        let repositories = Repositories::in_memory();
        let (report, _) = seed(&repositories).await;

        let mut isbns = Vec::new();
        for book in &report.books {
            let reloaded = repositories
                .books
                .find_by_id(book.id.unwrap())
                .await
                .unwrap()
                .unwrap();
            isbns.push(reloaded.isbn);
        }
        assert_eq!(isbns, vec!["123456", "54757585"]);
    }

    #[tokio::test]
    async fn test_second_run_duplicates_records() {
        let repositories = Repositories::in_memory();
        seed(&repositories).await;
        let (report, output) = seed(&repositories).await;

        assert_eq!(
            (report.author_count, report.book_count, report.publisher_count),
            (4, 4, 2)
        );
        assert!(output.contains("Author Count: 4"));

        let authors = repositories.authors.find_all().await.unwrap();
        let erics = authors
            .iter()
            .filter(|a| a.full_name() == "Eric Evans")
            .count();
        assert_eq!(erics, 2);
    }

    #[tokio::test]
    async fn test_report_serializes_to_json() {
        let repositories = Repositories::in_memory();
        let (report, _) = seed(&repositories).await;

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["author_count"], 2);
        assert_eq!(json["publishers"][0]["publisher_name"], "Penguin");
        assert_eq!(json["books"][1]["isbn"], "54757585");
    }

    struct UnreachableRepository;

    #[async_trait]
    impl Repository<Publisher> for UnreachableRepository {
        async fn save(&self, _publisher: Publisher) -> AppResult<Publisher> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn count(&self) -> AppResult<i64> {
            Err(AppError::Database(sqlx::Error::PoolClosed))
        }

        async fn find_by_id(&self, _id: PublisherId) -> AppResult<Option<Publisher>> {
            Ok(None)
        }

        async fn find_all(&self) -> AppResult<Vec<Publisher>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts_run() {
        let repositories = Repositories::new(
            Arc::new(MemoryRepository::<Author>::new()),
            Arc::new(MemoryRepository::<Book>::new()),
            Arc::new(UnreachableRepository),
        );

        let mut out = Vec::new();
        let err = BootstrapData::new(repositories.clone())
            .run_with_output(&mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(sqlx::Error::PoolClosed)));
        assert!(out.is_empty());
        // Rows written before the failure are not rolled back.
        assert_eq!(repositories.authors.count().await.unwrap(), 2);
        let books = repositories.books.find_all().await.unwrap();
        assert!(books.iter().all(|b| b.authors.is_empty()));
    }
}
