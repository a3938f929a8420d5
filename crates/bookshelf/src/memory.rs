use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::repository::{Entity, Repository};

/// In-memory implementation of [`Repository`].
///
/// Identities come from a per-repository sequence starting at 1, so two
/// repositories of the same entity type never share rows or ids.
#[derive(Debug)]
pub struct MemoryRepository<E: Entity> {
    rows: Arc<RwLock<BTreeMap<E::Id, E>>>,
    sequence: AtomicI64,
}

impl<E: Entity> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRepository<E> {
    /// Creates a new empty memory repository.
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            sequence: AtomicI64::new(0),
        }
    }

    fn next_id(&self) -> E::Id {
        <E::Id as From<i64>>::from(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn save(&self, mut entity: E) -> AppResult<E> {
        let mut rows = self.rows.write().await;

        match entity.id() {
            Some(id) => {
                let row = rows.get_mut(&id).ok_or(AppError::NotFound)?;
                *row = entity.clone();
                debug!("Updated {} {:?}", E::NAME, id);
            }
            None => {
                let id = self.next_id();
                entity.set_id(id);
                rows.insert(id, entity.clone());
                debug!("Inserted {} {:?}", E::NAME, id);
            }
        }

        Ok(entity)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.rows.read().await.len() as i64)
    }

    async fn find_by_id(&self, id: E::Id) -> AppResult<Option<E>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> AppResult<Vec<E>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}
