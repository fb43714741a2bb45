use super::auth::AuthTokenValue;
use super::models::User;
use super::permissions::UserRole;
use anyhow::Result;

pub trait UserStore: Send + Sync {
    fn create_user(&self, handle: &str, password: &str, roles: &[UserRole]) -> Result<User>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>>;

    /// Returns the user when handle and password match, None otherwise.
    fn verify_password(&self, handle: &str, password: &str) -> Result<Option<User>>;

    fn create_auth_token(&self, user_id: &str) -> Result<AuthTokenValue>;
    /// Resolves a bearer token, stamping its last-used time.
    fn get_user_by_token(&self, token: &str) -> Result<Option<User>>;
    fn delete_auth_token(&self, token: &str) -> Result<bool>;
}
