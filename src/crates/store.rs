use super::Crate;
use anyhow::Result;

/// Persistence seam for crates, implemented by the user store.
pub trait CrateStore: Send + Sync {
    /// Returns the user's single crate, creating an empty one if absent.
    fn get_or_create_crate(&self, user_id: &str) -> Result<Crate>;

    /// Persists items and order wholesale.
    fn save_crate(&self, crate_value: &Crate) -> Result<()>;
}
