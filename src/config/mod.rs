mod db_config;
mod file_config;

pub use db_config::DbConfig;
pub use file_config::{FileConfig, SearchConfig};
