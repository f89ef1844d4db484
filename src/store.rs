//! Client-side state containers with injected persistence.
//!
//! The stores expose typed actions over an explicit [`StorageAdapter`]
//! rather than ambient global mutation: callers construct a store around an
//! adapter ([`JsonFileAdapter`] for disk, [`MemoryAdapter`] in tests) and
//! every mutation round-trips through it, so restart recovery is the same
//! code path as the tests.
//!
//! ## Auth chokepoint
//!
//! [`SessionStore::check_session`] is the single place auth errors are
//! intercepted. An expired/invalid token clears local session state
//! *without* calling any remote logout endpoint — that distinguishes auth
//! failure from a generic network failure, which leaves the session alone
//! for a later retry.

use crate::error::ConteurError;
use crate::model::Histoire;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

/// Key-value persistence behind a store.
pub trait StorageAdapter: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, ConteurError>;
    fn save(&self, key: &str, value: &str) -> Result<(), ConteurError>;
    fn remove(&self, key: &str) -> Result<(), ConteurError>;
}

/// One JSON file per key inside a directory.
pub struct JsonFileAdapter {
    dir: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageAdapter for JsonFileAdapter {
    fn load(&self, key: &str) -> Result<Option<String>, ConteurError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConteurError::StoreAdapter(e.to_string())),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ConteurError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ConteurError::StoreAdapter(e.to_string()))?;
        // Write-then-rename keeps a crash from leaving a torn file behind.
        let tmp = self.path_for(key).with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|e| ConteurError::StoreAdapter(e.to_string()))?;
        std::fs::rename(&tmp, self.path_for(key))
            .map_err(|e| ConteurError::StoreAdapter(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), ConteurError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConteurError::StoreAdapter(e.to_string())),
        }
    }
}

/// In-memory adapter for tests.
#[derive(Default)]
pub struct MemoryAdapter {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryAdapter {
    fn load(&self, key: &str) -> Result<Option<String>, ConteurError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), ConteurError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConteurError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// ── Session store ────────────────────────────────────────────────────────

const SESSION_KEY: &str = "session";

/// The locally persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

/// Checks the session validity with whoever owns the truth (normally the
/// backend's profile endpoint). Injected so tests can script outcomes.
pub trait SessionCheck: Send + Sync {
    /// `Ok(true)` — valid; `Ok(false)` — expired/invalid (auth error);
    /// `Err` — network failure, validity unknown.
    fn is_valid(&self, session: &Session) -> Result<bool, ConteurError>;
}

/// Typed actions over the persisted session.
pub struct SessionStore<A: StorageAdapter> {
    adapter: A,
    current: Mutex<Option<Session>>,
}

impl<A: StorageAdapter> SessionStore<A> {
    /// Build the store, hydrating from the adapter.
    pub fn open(adapter: A) -> Result<Self, ConteurError> {
        let current = match adapter.load(SESSION_KEY)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| ConteurError::StoreAdapter(format!("corrupt session: {e}")))?,
            None => None,
        };
        Ok(Self {
            adapter,
            current: Mutex::new(current),
        })
    }

    pub fn session(&self) -> Option<Session> {
        self.current.lock().unwrap().clone()
    }

    pub fn set_session(&self, session: Session) -> Result<(), ConteurError> {
        let json = serde_json::to_string(&session)
            .map_err(|e| ConteurError::Internal(e.to_string()))?;
        self.adapter.save(SESSION_KEY, &json)?;
        *self.current.lock().unwrap() = Some(session);
        Ok(())
    }

    /// Explicit logout: clear local state. Remote logout is the caller's
    /// business and happens before this, while the token is still valid.
    pub fn clear_session(&self) -> Result<(), ConteurError> {
        self.adapter.remove(SESSION_KEY)?;
        *self.current.lock().unwrap() = None;
        Ok(())
    }

    /// React to an auth rejection from any API call: clear local state and
    /// nothing else. The token is already dead, so no remote logout is
    /// attempted.
    pub fn handle_auth_error(&self) -> Result<(), ConteurError> {
        info!("session rejected; clearing local state");
        self.clear_session()
    }

    /// The single auth chokepoint.
    ///
    /// * Valid session — returns it.
    /// * Auth error — [`handle_auth_error`], returns
    ///   [`ConteurError::AuthExpired`].
    /// * Network failure — propagated untouched; local state survives.
    ///
    /// [`handle_auth_error`]: SessionStore::handle_auth_error
    pub fn check_session(&self, check: &dyn SessionCheck) -> Result<Session, ConteurError> {
        let session = self
            .session()
            .ok_or(ConteurError::AuthExpired)?;
        match check.is_valid(&session) {
            Ok(true) => Ok(session),
            Ok(false) => {
                self.handle_auth_error()?;
                Err(ConteurError::AuthExpired)
            }
            Err(e) => {
                debug!("session check inconclusive: {e}");
                Err(e)
            }
        }
    }
}

// ── Histoire store ───────────────────────────────────────────────────────

const HISTOIRES_KEY: &str = "histoires";

/// Append-only store of generated stories.
pub struct HistoireStore<A: StorageAdapter> {
    adapter: A,
    items: Mutex<Vec<Histoire>>,
}

impl<A: StorageAdapter> HistoireStore<A> {
    pub fn open(adapter: A) -> Result<Self, ConteurError> {
        let items = match adapter.load(HISTOIRES_KEY)? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| ConteurError::StoreAdapter(format!("corrupt histoires: {e}")))?,
            None => Vec::new(),
        };
        Ok(Self {
            adapter,
            items: Mutex::new(items),
        })
    }

    /// Persist a new histoire. Histoires are immutable snapshots; there is
    /// no update action.
    pub fn add(&self, histoire: Histoire) -> Result<(), ConteurError> {
        let mut items = self.items.lock().unwrap();
        items.push(histoire);
        let persisted = serde_json::to_string(&*items)
            .map_err(|e| ConteurError::Internal(e.to_string()))
            .and_then(|json| self.adapter.save(HISTOIRES_KEY, &json));
        if persisted.is_err() {
            // The adapter rejected the write; the in-memory view must not
            // claim an entry the disk never saw.
            items.pop();
        }
        persisted
    }

    pub fn list(&self) -> Vec<Histoire> {
        self.items.lock().unwrap().clone()
    }

    pub fn find(&self, id: &str) -> Result<Histoire, ConteurError> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| ConteurError::NotFound {
                kind: "histoire",
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_id: "user-1".into(),
            token: "tok".into(),
        }
    }

    fn histoire(id: &str) -> Histoire {
        Histoire {
            id: id.into(),
            template_id: "tmpl-1".into(),
            user_id: "user-1".into(),
            variables: HashMap::from([("nom".into(), "Alice".into())]),
            pdf_url: "/data/foret.pdf".into(),
            page_previews: vec![],
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    struct ScriptedCheck(Result<bool, ()>);

    impl SessionCheck for ScriptedCheck {
        fn is_valid(&self, _s: &Session) -> Result<bool, ConteurError> {
            match self.0 {
                Ok(v) => Ok(v),
                Err(()) => Err(ConteurError::DownloadFailed {
                    url: "profile".into(),
                    reason: "offline".into(),
                }),
            }
        }
    }

    #[test]
    fn session_round_trips_through_adapter() {
        let store = SessionStore::open(MemoryAdapter::new()).unwrap();
        assert!(store.session().is_none());
        store.set_session(session()).unwrap();
        assert_eq!(store.session().unwrap().user_id, "user-1");
        store.clear_session().unwrap();
        assert!(store.session().is_none());
    }

    #[test]
    fn auth_error_clears_local_state() {
        let store = SessionStore::open(MemoryAdapter::new()).unwrap();
        store.set_session(session()).unwrap();

        let err = store.check_session(&ScriptedCheck(Ok(false))).unwrap_err();
        assert!(matches!(err, ConteurError::AuthExpired));
        assert!(store.session().is_none(), "local session cleared");
    }

    #[test]
    fn network_failure_preserves_session() {
        let store = SessionStore::open(MemoryAdapter::new()).unwrap();
        store.set_session(session()).unwrap();

        let err = store.check_session(&ScriptedCheck(Err(()))).unwrap_err();
        assert!(matches!(err, ConteurError::DownloadFailed { .. }));
        assert!(store.session().is_some(), "session survives network error");
    }

    #[test]
    fn valid_session_passes_chokepoint() {
        let store = SessionStore::open(MemoryAdapter::new()).unwrap();
        store.set_session(session()).unwrap();
        let s = store.check_session(&ScriptedCheck(Ok(true))).unwrap();
        assert_eq!(s, session());
    }

    #[test]
    fn histoires_persist_and_rehydrate() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = HistoireStore::open(JsonFileAdapter::new(dir.path())).unwrap();
            store.add(histoire("h1")).unwrap();
            store.add(histoire("h2")).unwrap();
        }
        let store = HistoireStore::open(JsonFileAdapter::new(dir.path())).unwrap();
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.find("h2").unwrap().id, "h2");
        assert!(matches!(
            store.find("h404").unwrap_err(),
            ConteurError::NotFound { kind: "histoire", .. }
        ));
    }

    struct RejectingAdapter;

    impl StorageAdapter for RejectingAdapter {
        fn load(&self, _key: &str) -> Result<Option<String>, ConteurError> {
            Ok(None)
        }

        fn save(&self, _key: &str, _value: &str) -> Result<(), ConteurError> {
            Err(ConteurError::StoreAdapter("disk full".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), ConteurError> {
            Ok(())
        }
    }

    #[test]
    fn failed_save_does_not_grow_the_list() {
        let store = HistoireStore::open(RejectingAdapter).unwrap();
        assert!(store.add(histoire("h1")).is_err());
        assert!(
            store.list().is_empty(),
            "memory view must match what the adapter holds"
        );
        assert!(store.find("h1").is_err());
    }

    #[test]
    fn file_adapter_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileAdapter::new(dir.path());
        assert!(adapter.load("nope").unwrap().is_none());
        adapter.remove("nope").unwrap(); // idempotent
    }
}
