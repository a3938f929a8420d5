//! Startup seeding of the catalog.
//!
//! [`BootstrapData`] writes a fixed set of authors, books and a publisher
//! through the repositories it is given and prints the resulting counts.

mod seeder;

pub use seeder::{BootstrapData, SeedReport};
