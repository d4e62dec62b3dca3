//! SQLite persistence via diesel.

mod models;
mod repository;
mod schema;

pub use repository::SqliteStore;
