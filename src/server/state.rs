use axum::extract::FromRef;

use crate::config::DbConfig;
use crate::crates::CrateStore;
use crate::library::LibraryStore;
use crate::search::SearchVault;
use crate::user::UserStore;
use std::sync::Arc;

use super::ServerConfig;

pub type GuardedLibraryStore = Arc<dyn LibraryStore>;
pub type GuardedUserStore = Arc<dyn UserStore>;
pub type GuardedCrateStore = Arc<dyn CrateStore>;
pub type GuardedSearchVault = Arc<dyn SearchVault>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub library_store: GuardedLibraryStore,
    pub user_store: GuardedUserStore,
    pub crate_store: GuardedCrateStore,
    pub search_vault: GuardedSearchVault,
    pub db_config: DbConfig,
}

impl FromRef<ServerState> for GuardedLibraryStore {
    fn from_ref(input: &ServerState) -> Self {
        input.library_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for GuardedCrateStore {
    fn from_ref(input: &ServerState) -> Self {
        input.crate_store.clone()
    }
}

impl FromRef<ServerState> for GuardedSearchVault {
    fn from_ref(input: &ServerState) -> Self {
        input.search_vault.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for DbConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.db_config.clone()
    }
}
