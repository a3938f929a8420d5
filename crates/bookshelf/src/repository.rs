//! Persistence seams for the catalog entities.
//!
//! Each entity type gets one [`Repository`] handle. The handles are bundled in
//! [`Repositories`] and passed explicitly to whatever needs them.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::memory::MemoryRepository;
use crate::models::{Author, Book, Publisher};

/// A record type whose identity is assigned by the persistence layer.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    type Id: Copy + Ord + Debug + Send + Sync + From<i64>;

    /// Display name used in logs and count summaries.
    const NAME: &'static str;

    fn id(&self) -> Option<Self::Id>;
    fn set_id(&mut self, id: Self::Id);
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Inserts the entity when it has no identity, otherwise overwrites the
    /// stored row. Returns the managed instance with its identity populated.
    async fn save(&self, entity: E) -> AppResult<E>;

    async fn count(&self) -> AppResult<i64>;

    async fn find_by_id(&self, id: E::Id) -> AppResult<Option<E>>;

    /// All rows ordered by identity.
    async fn find_all(&self) -> AppResult<Vec<E>>;
}

pub type RepositoryArc<E> = Arc<dyn Repository<E>>;

/// The three repository collaborators the bootstrap needs.
#[derive(Clone)]
pub struct Repositories {
    pub authors: RepositoryArc<Author>,
    pub books: RepositoryArc<Book>,
    pub publishers: RepositoryArc<Publisher>,
}

impl Repositories {
    pub fn new(
        authors: RepositoryArc<Author>,
        books: RepositoryArc<Book>,
        publishers: RepositoryArc<Publisher>,
    ) -> Self {
        Self {
            authors,
            books,
            publishers,
        }
    }

    /// Fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self {
            authors: Arc::new(MemoryRepository::<Author>::new()),
            books: Arc::new(MemoryRepository::<Book>::new()),
            publishers: Arc::new(MemoryRepository::<Publisher>::new()),
        }
    }
}
