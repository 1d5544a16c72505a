use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::SESSION_KEY_PREFIX;
use crate::error::{AppError, Result};
use crate::models::GameState;
use crate::utils::normalize_address;

/// Client-local key-value storage.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

fn lock_map(
    map: &Mutex<BTreeMap<String, String>>,
) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
    map.lock()
        .map_err(|_| AppError::Storage("Session lock poisoned".to_string()))
}

#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock_map(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock_map(&self.values)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock_map(&self.values)?.remove(key);
        Ok(())
    }
}

/// JSON object on disk, rewritten on every change.
pub struct FileSessionStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Storage(format!("Corrupt session file {}: {}", path.display(), e))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(AppError::Io(err)),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock_map(&self.values)?.get(key).cloned())
    }

    // Memory only changes once the file write went through.
    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = lock_map(&self.values)?;
        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = lock_map(&self.values)?;
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut updated = values.clone();
        updated.remove(key);
        self.persist(&updated)?;
        *values = updated;
        Ok(())
    }
}

/// Remembers the game each address was last playing, so a restarted client
/// can rejoin it.
#[derive(Clone)]
pub struct ActiveGameTracker {
    store: Arc<dyn SessionStore>,
}

impl ActiveGameTracker {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn key_for(address: &str) -> String {
        format!("{}{}", SESSION_KEY_PREFIX, normalize_address(address))
    }

    pub fn remember(&self, address: &str, game_id: &str) -> Result<()> {
        tracing::debug!("Active game for {} is {}", address, game_id);
        self.store.set(&Self::key_for(address), game_id)
    }

    pub fn last_active(&self, address: &str) -> Result<Option<String>> {
        self.store.get(&Self::key_for(address))
    }

    pub fn forget(&self, address: &str) -> Result<()> {
        self.store.remove(&Self::key_for(address))
    }

    /// Clears the association once the remembered game is seen finished.
    /// Returns true when it was cleared.
    pub fn observe(&self, address: &str, game_id: &str, state: &GameState) -> Result<bool> {
        let remembered = self.last_active(address)?;
        let is_current = remembered
            .as_deref()
            .is_some_and(|id| normalize_address(id) == normalize_address(game_id));
        if is_current && state.finished {
            tracing::info!("Game {} finished; clearing session for {}", game_id, address);
            self.forget(address)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(finished: bool) -> GameState {
        GameState {
            player1: format!("0x{}", "0a".repeat(32)),
            player2: Some(format!("0x{}", "0b".repeat(32))),
            started: true,
            finished,
            current_round: 5,
            player1_score: 3,
            player2_score: 2,
            winner: None,
        }
    }

    fn temp_session_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "penalsui-session-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir.join("session.json")
    }

    #[test]
    fn key_uses_prefix_and_canonical_address() {
        assert_eq!(
            ActiveGameTracker::key_for("0xA"),
            format!("penalsui_game_0x{:0>64}", "a")
        );
    }

    #[test]
    fn tracker_remembers_and_clears_on_finish() {
        let tracker = ActiveGameTracker::new(Arc::new(MemorySessionStore::new()));
        let player = "0x0a";
        let game = "0x42";

        tracker.remember(player, game).expect("remember");
        assert_eq!(tracker.last_active(player).expect("get"), Some(game.to_string()));

        assert!(!tracker.observe(player, game, &state(false)).expect("observe"));
        assert!(!tracker.observe(player, "0x43", &state(true)).expect("observe"));
        assert!(tracker.last_active(player).expect("get").is_some());

        assert!(tracker.observe(player, game, &state(true)).expect("observe"));
        assert!(tracker.last_active(player).expect("get").is_none());
    }

    #[test]
    fn file_store_survives_reopen() {
        let path = temp_session_path("reopen");
        let _ = std::fs::remove_file(&path);

        let store = FileSessionStore::open(&path).expect("open");
        store.set("penalsui_game_0x1", "0x42").expect("set");
        drop(store);

        let reopened = FileSessionStore::open(&path).expect("reopen");
        assert_eq!(
            reopened.get("penalsui_game_0x1").expect("get"),
            Some("0x42".to_string())
        );
        reopened.remove("penalsui_game_0x1").expect("remove");
        assert!(FileSessionStore::open(&path)
            .expect("reopen")
            .get("penalsui_game_0x1")
            .expect("get")
            .is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = temp_session_path("unwritable")
            .parent()
            .expect("parent")
            .join("missing-dir");
        let _ = std::fs::remove_dir_all(&dir);
        let store = FileSessionStore::open(dir.join("session.json")).expect("open");

        assert!(store.set("penalsui_game_0x1", "0x42").is_err());
        assert!(store.get("penalsui_game_0x1").expect("get").is_none());
    }

    #[test]
    fn failed_remove_keeps_the_entry() {
        let path = temp_session_path("remove-fails");
        let _ = std::fs::remove_file(&path);
        let store = FileSessionStore::open(&path).expect("open");
        store.set("penalsui_game_0x1", "0x42").expect("set");

        // A directory in place of the file makes the next write fail.
        std::fs::remove_file(&path).expect("remove file");
        std::fs::create_dir_all(&path).expect("block path");
        assert!(store.remove("penalsui_game_0x1").is_err());
        assert_eq!(
            store.get("penalsui_game_0x1").expect("get"),
            Some("0x42".to_string())
        );

        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let path = temp_session_path("corrupt");
        std::fs::write(&path, "{not json").expect("write");
        match FileSessionStore::open(&path) {
            Err(AppError::Storage(msg)) => assert!(msg.contains("Corrupt session file")),
            Err(other) => panic!("expected Storage error, got {other:?}"),
            Ok(_) => panic!("expected Storage error, got a store"),
        }
        let _ = std::fs::remove_file(&path);
    }
}
