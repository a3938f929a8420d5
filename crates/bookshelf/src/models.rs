use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::repository::Entity;

macro_rules! entity_id {
    ($($name:ident),* $(,)?) => {
        $(
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        )*
    };
}

entity_id!(AuthorId, BookId, PublisherId);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<AuthorId>,
    pub firstname: String,
    pub lastname: String,
    pub books: BTreeSet<BookId>,
}

impl Author {
    pub fn new(firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        Self {
            firstname: firstname.into(),
            lastname: lastname.into(),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<BookId>,
    pub title: String,
    pub isbn: String,
    pub authors: BTreeSet<AuthorId>,
    pub publisher: Option<PublisherId>,
}

impl Book {
    pub fn new(title: impl Into<String>, isbn: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            isbn: isbn.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub id: Option<PublisherId>,
    pub publisher_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// Inverse side of `Book::publisher`, kept in step by [`assign_publisher`].
    ///
    /// The database backend never writes this field and rebuilds it from
    /// `books.publisher_id` on load. The memory backend stores it exactly as
    /// saved, so a book whose `publisher` was set directly shows up here only
    /// with PostgreSQL.
    pub books: BTreeSet<BookId>,
}

impl Entity for Author {
    type Id = AuthorId;
    const NAME: &'static str = "Author";

    fn id(&self) -> Option<AuthorId> {
        self.id
    }

    fn set_id(&mut self, id: AuthorId) {
        self.id = Some(id);
    }
}

impl Entity for Book {
    type Id = BookId;
    const NAME: &'static str = "Book";

    fn id(&self) -> Option<BookId> {
        self.id
    }

    fn set_id(&mut self, id: BookId) {
        self.id = Some(id);
    }
}

impl Entity for Publisher {
    type Id = PublisherId;
    const NAME: &'static str = "Publisher";

    fn id(&self) -> Option<PublisherId> {
        self.id
    }

    fn set_id(&mut self, id: PublisherId) {
        self.id = Some(id);
    }
}

/// Records the author on the book and the book on the author.
///
/// Both entities must already carry an identity. Nothing is persisted here;
/// callers save both sides afterwards.
pub fn link_author_book(author: &mut Author, book: &mut Book) -> AppResult<()> {
    let author_id = author.id.ok_or(AppError::Transient(Author::NAME))?;
    let book_id = book.id.ok_or(AppError::Transient(Book::NAME))?;

    author.books.insert(book_id);
    book.authors.insert(author_id);
    Ok(())
}

/// Sets the book's publisher and adds the book to the publisher's inverse collection.
pub fn assign_publisher(book: &mut Book, publisher: &mut Publisher) -> AppResult<()> {
    let book_id = book.id.ok_or(AppError::Transient(Book::NAME))?;
    let publisher_id = publisher.id.ok_or(AppError::Transient(Publisher::NAME))?;

    book.publisher = Some(publisher_id);
    publisher.books.insert(book_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_is_symmetric() {
        let mut author = Author::new("Eric", "Evans");
        author.set_id(AuthorId(7));
        let mut book = Book::new("Domain Driven Design", "123456");
        book.set_id(BookId(3));

        link_author_book(&mut author, &mut book).unwrap();

        assert_eq!(author.books, BTreeSet::from([BookId(3)]));
        assert_eq!(book.authors, BTreeSet::from([AuthorId(7)]));
    }

    #[test]
    fn test_link_twice_keeps_single_entry() {
        let mut author = Author::new("Rod", "Johnson");
        author.set_id(AuthorId(1));
        let mut book = Book::new("J2EE Development without EJB", "54757585");
        book.set_id(BookId(1));

        link_author_book(&mut author, &mut book).unwrap();
        link_author_book(&mut author, &mut book).unwrap();

        assert_eq!(author.books.len(), 1);
        assert_eq!(book.authors.len(), 1);
    }

    #[test]
    fn test_link_requires_identity() {
        let mut author = Author::new("Eric", "Evans");
        let mut book = Book::new("Domain Driven Design", "123456");
        book.set_id(BookId(1));

        let err = link_author_book(&mut author, &mut book).unwrap_err();
        assert!(matches!(err, AppError::Transient("Author")));
        assert!(book.authors.is_empty());
    }

    #[test]
    fn test_assign_publisher() {
        let mut book = Book::new("Domain Driven Design", "123456");
        book.set_id(BookId(2));
        let mut publisher = Publisher {
            publisher_name: "Penguin".to_string(),
            ..Default::default()
        };

        let err = assign_publisher(&mut book, &mut publisher).unwrap_err();
        assert!(matches!(err, AppError::Transient("Publisher")));
        assert_eq!(book.publisher, None);

        publisher.set_id(PublisherId(9));
        assign_publisher(&mut book, &mut publisher).unwrap();

        assert_eq!(book.publisher, Some(PublisherId(9)));
        assert!(publisher.books.contains(&BookId(2)));
    }

    #[test]
    fn test_full_name() {
        assert_eq!(Author::new("Eric", "Evans").full_name(), "Eric Evans");
    }
}
