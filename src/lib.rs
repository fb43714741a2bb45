//! DJ Database server library.
//!
//! Exposes the internal modules for integration tests and reuse.

pub mod config;
pub mod crates;
pub mod library;
pub mod retry;
pub mod reviews;
pub mod search;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use library::{LibraryStore, SqliteLibraryStore};
pub use search::{Fts5SearchVault, NoopSearchVault, SearchVault};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
pub use user::{SqliteUserStore, UserRole, UserStore};
