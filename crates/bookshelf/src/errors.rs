use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An association was requested on an entity that has not been saved yet.
    #[error("{0} has no identity; save it before linking")]
    Transient(&'static str),

    #[error("Not found")]
    NotFound,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type AppResult<T> = Result<T, AppError>;
