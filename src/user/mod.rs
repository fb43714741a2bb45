//! Users, credentials, roles and tokens.

mod auth;
mod models;
mod permissions;
mod sqlite_user_store;
mod user_store;

pub use auth::{AuthTokenValue, DjdbHasher};
pub use models::User;
pub use permissions::{Permission, UserRole};
pub use sqlite_user_store::{SqliteUserStore, USER_DB_SCHEMAS};
pub use user_store::UserStore;
