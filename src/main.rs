use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use djdb_server::config::FileConfig;
use djdb_server::server::{run_server, RequestsLoggingLevel, ServerConfig, ServerState};
use djdb_server::user::UserRole;
#[cfg(not(feature = "no_search"))]
use djdb_server::Fts5SearchVault;
use djdb_server::{
    LibraryStore, NoopSearchVault, SearchVault, SqliteLibraryStore, SqliteUserStore, UserStore,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite library database file.
    #[clap(long, value_parser = parse_path)]
    pub library_db: Option<PathBuf>,

    /// Path to the SQLite user database file.
    #[clap(long, value_parser = parse_path)]
    pub user_db: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long)]
    pub port: Option<u16>,

    /// The level of logging to perform on each request.
    #[clap(long)]
    pub requests_logging: Option<RequestsLoggingLevel>,

    /// How many recent reviews the landing page returns.
    #[clap(long)]
    pub recent_reviews_limit: Option<usize>,

    /// Path to a TOML config file. CLI flags take precedence over it.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user in the user database and exit.
    AddUser {
        handle: String,
        password: String,
        /// Roles to grant, repeatable.
        #[clap(long, default_value = "dj")]
        role: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let default_level = file_config
        .logging_level
        .as_deref()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let library_db_path = cli_args
        .library_db
        .clone()
        .or_else(|| file_config.library_db_path.as_deref().map(PathBuf::from));
    let Some(library_db_path) = library_db_path else {
        bail!("No library database path, pass --library-db or set library_db_path in the config file");
    };
    let user_db_path = cli_args
        .user_db
        .clone()
        .or_else(|| file_config.user_db_path.as_deref().map(PathBuf::from));
    let Some(user_db_path) = user_db_path else {
        bail!("No user database path, pass --user-db or set user_db_path in the config file");
    };

    info!("Opening SQLite library database at {:?}...", library_db_path);
    let library_store = Arc::new(SqliteLibraryStore::open(&library_db_path)?);
    let user_store = Arc::new(SqliteUserStore::open(&user_db_path)?);

    if let Some(Command::AddUser {
        handle,
        password,
        role,
    }) = cli_args.command
    {
        let roles = role
            .iter()
            .map(|name| {
                UserRole::from_str(name).with_context(|| format!("Unknown role: {}", name))
            })
            .collect::<Result<Vec<_>>>()?;
        let user = user_store.create_user(&handle, &password, &roles)?;
        info!("Created user {} with id {}", user.handle, user.id);
        return Ok(());
    }

    let requests_logging_level = cli_args
        .requests_logging
        .or_else(|| {
            file_config
                .requests_logging
                .as_deref()
                .and_then(|s| RequestsLoggingLevel::from_str(s, true).ok())
        })
        .unwrap_or_default();
    let port = cli_args.port.or(file_config.port).unwrap_or(3001);
    let recent_reviews_limit = cli_args
        .recent_reviews_limit
        .or(file_config.recent_reviews_limit)
        .unwrap_or(10);

    #[cfg(feature = "no_search")]
    let search_vault: Arc<dyn SearchVault> = Arc::new(NoopSearchVault);

    #[cfg(not(feature = "no_search"))]
    let search_vault: Arc<dyn SearchVault> = {
        let engine = file_config
            .search
            .as_ref()
            .and_then(|search| search.engine.as_deref())
            .unwrap_or("fts5");
        match engine {
            "noop" => Arc::new(NoopSearchVault),
            "fts5" => {
                info!("Indexing library content for search...");
                let vault = Fts5SearchVault::new()?;
                let entries = library_store.searchable_entries()?;
                vault.rebuild_index(&entries)?;
                info!("Indexed {} entries", entries.len());
                Arc::new(vault)
            }
            other => bail!("Unknown search engine: {}", other),
        }
    };

    let config = ServerConfig {
        requests_logging_level,
        port,
        recent_reviews_limit,
    };
    let state = ServerState {
        config,
        library_store: library_store.clone(),
        user_store: user_store.clone(),
        crate_store: user_store,
        search_vault,
        db_config: djdb_server::config::DbConfig::new(library_store),
    };

    info!("Ready to serve at port {}!", port);
    run_server(state).await
}
