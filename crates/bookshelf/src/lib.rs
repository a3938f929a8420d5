pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod memory;
pub mod models;
pub mod repository;

use tracing::info;

use crate::{
    bootstrap::{BootstrapData, SeedReport},
    config::AppConfig,
    database::Database,
    errors::AppResult,
    repository::Repositories,
};

/// Builds the configured repositories, running migrations when backed by PostgreSQL.
pub async fn build_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    match &config.database {
        Some(database) => {
            let db = Database::connect(database).await?;
            db.migrate().await?;
            Ok(db.repositories())
        }
        None => {
            info!("DATABASE_URL not set, using in-memory repositories");
            Ok(Repositories::in_memory())
        }
    }
}

/// Seeds the catalog unless `BOOTSTRAP_ENABLED` turned it off.
pub async fn seed_if_enabled(
    config: &AppConfig,
    repositories: Repositories,
) -> AppResult<Option<SeedReport>> {
    if !config.bootstrap_enabled {
        info!("Bootstrap disabled, skipping seed data");
        return Ok(None);
    }

    BootstrapData::new(repositories).run().await.map(Some)
}

/// Application startup: wires the repositories and seeds the catalog.
pub async fn run_app(config: AppConfig) -> anyhow::Result<()> {
    let repositories = build_repositories(&config).await?;
    seed_if_enabled(&config, repositories).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config(bootstrap_enabled: bool) -> AppConfig {
        AppConfig {
            database: None,
            bootstrap_enabled,
        }
    }

    async fn counts(repositories: &Repositories) -> (i64, i64, i64) {
        (
            repositories.authors.count().await.unwrap(),
            repositories.books.count().await.unwrap(),
            repositories.publishers.count().await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_disabled_bootstrap_leaves_store_empty() {
        let repositories = Repositories::in_memory();

        let report = seed_if_enabled(&memory_config(false), repositories.clone())
            .await
            .unwrap();

        assert!(report.is_none());
        assert_eq!(counts(&repositories).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_enabled_bootstrap_seeds_catalog() {
        let repositories = Repositories::in_memory();

        let report = seed_if_enabled(&memory_config(true), repositories.clone())
            .await
            .unwrap()
            .expect("bootstrap should have run");

        assert_eq!(
            (report.author_count, report.book_count, report.publisher_count),
            (2, 2, 1)
        );
        assert_eq!(counts(&repositories).await, (2, 2, 1));
    }

    #[tokio::test]
    async fn test_build_repositories_without_database_is_empty_memory() {
        let repositories = build_repositories(&memory_config(true)).await.unwrap();

        assert_eq!(counts(&repositories).await, (0, 0, 0));
    }
}
