use crate::library::LibraryStore;
use anyhow::Result;
use std::sync::Arc;

/// Handle over the library db's key/value config table. Constructed once at
/// startup and passed through the server state, never a global.
#[derive(Clone)]
pub struct DbConfig {
    store: Arc<dyn LibraryStore>,
}

impl DbConfig {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.config_get(key)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.config_set(key, value)
    }

    /// Seeds the table with a placeholder row on first access. Returns true
    /// when seeding happened.
    pub fn init(&self) -> Result<bool> {
        self.store.config_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SqliteLibraryStore;

    #[test]
    fn init_then_get_set() {
        let store = Arc::new(SqliteLibraryStore::open_in_memory().unwrap());
        let config = DbConfig::new(store);

        assert!(config.init().unwrap());
        assert!(!config.init().unwrap());

        config.set("station", "chirp").unwrap();
        assert_eq!(config.get("station").unwrap().unwrap(), "chirp");
        assert!(config.get("absent").unwrap().is_none());
    }
}
