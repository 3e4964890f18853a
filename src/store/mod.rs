//! Durable session storage: the at-rest side of conversation state.

pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;
pub use traits::{SessionRecord, SessionStore, StoreError};

use crate::config::StoreConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Factory: create the configured store backend.
///
/// `sqlite` persists under `store.path` when set, otherwise `<workspace>/state`.
pub fn create_store(
    config: &StoreConfig,
    workspace_dir: &Path,
) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.backend.trim().to_ascii_lowercase().as_str() {
        "sqlite" => {
            let dir = match &config.path {
                Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
                None => workspace_dir.join("state"),
            };
            Ok(Arc::new(SqliteSessionStore::new(&dir)?))
        }
        "memory" => Ok(Arc::new(InMemorySessionStore::new())),
        other if other.is_empty() => {
            anyhow::bail!("store.backend cannot be empty. Supported values: sqlite, memory")
        }
        other => anyhow::bail!("Unknown store backend '{other}'. Supported values: sqlite, memory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn factory_sqlite() {
        let tmp = TempDir::new().unwrap();
        let cfg = StoreConfig {
            backend: "sqlite".into(),
            path: None,
        };
        let store = create_store(&cfg, tmp.path()).unwrap();
        assert_eq!(store.name(), "sqlite");
    }

    #[test]
    fn factory_memory() {
        let tmp = TempDir::new().unwrap();
        let cfg = StoreConfig {
            backend: "memory".into(),
            path: None,
        };
        let store = create_store(&cfg, tmp.path()).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn factory_unknown_errors() {
        let tmp = TempDir::new().unwrap();
        let cfg = StoreConfig {
            backend: "etcd".into(),
            path: None,
        };
        match create_store(&cfg, tmp.path()) {
            Err(err) => assert!(err.to_string().contains("Unknown store backend")),
            Ok(_) => panic!("unknown backend should error"),
        }
    }

    #[test]
    fn factory_empty_errors() {
        let tmp = TempDir::new().unwrap();
        let cfg = StoreConfig {
            backend: String::new(),
            path: None,
        };
        match create_store(&cfg, tmp.path()) {
            Err(err) => assert!(err.to_string().contains("cannot be empty")),
            Ok(_) => panic!("empty backend should error"),
        }
    }
}
