//! Auth session store.
//!
//! Holds the bearer token and signed-in user for the running client. Every
//! write replaces the whole [`Session`] value through a `watch` channel, so
//! readers (the HTTP pipeline, screen controllers) always see a consistent
//! pair and can subscribe to changes.
//!
//! When opened with a path, the session is persisted to `session.json` with
//! restricted permissions (0600). Tokens are never logged.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Signed-in resident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Fields the client does not model (estate, unit, avatar, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    #[cfg(test)]
    pub(crate) fn named(id: u64, first_name: &str) -> Self {
        Self {
            id,
            first_name: first_name.to_string(),
            last_name: None,
            email: None,
            phone: None,
            extra: Map::new(),
        }
    }

    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Authenticated identity and bearer token.
///
/// Both fields are present or both are absent; [`SessionStore`] only exposes
/// writes that keep them paired.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// Shared handle to the current session.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    tx: watch::Sender<Session>,
    path: Option<PathBuf>,
    /// Held across a state change and its write to disk so the file always
    /// ends up matching the last change.
    writes: Mutex<()>,
}

impl SessionStore {
    /// Creates a store that lives only for this process.
    pub fn in_memory() -> Self {
        Self::with_state(Session::default(), None)
    }

    /// Opens a store backed by `path`, restoring any saved session.
    ///
    /// A missing file means logged out. A file that can't be parsed is
    /// logged and treated the same way.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let initial = load_session(&path)?;
        if initial.is_authenticated() {
            tracing::debug!(path = %path.display(), "restored persisted session");
        }
        Ok(Self::with_state(initial, Some(path)))
    }

    fn with_state(session: Session, path: Option<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self {
            inner: Arc::new(Inner {
                tx,
                path,
                writes: Mutex::new(()),
            }),
        }
    }

    /// Synchronous snapshot of the current session.
    pub fn state(&self) -> Session {
        self.inner.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.tx.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.tx.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tx.borrow().is_authenticated()
    }

    /// Receiver that wakes on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.tx.subscribe()
    }

    /// Stores a freshly issued token together with its user.
    pub fn sign_in(&self, token: String, user: User) {
        tracing::info!(user_id = user.id, "session started");
        let session = Session {
            token: Some(token),
            user: Some(user),
        };
        self.modify(|current| {
            *current = session;
            true
        });
    }

    /// Replaces the user of the current session. No-op when logged out.
    pub fn update_user(&self, user: User) {
        self.modify(|session| {
            if session.token.is_none() {
                return false;
            }
            session.user = Some(user);
            true
        });
    }

    /// Drops token and user. Never fails; clearing an empty session is a no-op
    /// and does not notify subscribers.
    pub fn clear(&self) {
        let changed = self.modify(|session| {
            if session.token.is_none() && session.user.is_none() {
                return false;
            }
            *session = Session::default();
            true
        });
        if changed {
            tracing::info!("session cleared");
        }
    }

    /// Applies `f` and, when it reports a change, notifies subscribers and
    /// persists the value it produced.
    fn modify(&self, f: impl FnOnce(&mut Session) -> bool) -> bool {
        let _writes = self
            .inner
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut written = None;
        let changed = self.inner.tx.send_if_modified(|session| {
            let changed = f(session);
            if changed {
                written = Some(session.clone());
            }
            changed
        });
        if let Some(session) = written {
            self.persist(&session);
        }
        changed
    }

    fn persist(&self, session: &Session) {
        let Some(path) = self.inner.path.as_deref() else {
            return;
        };
        let result = if session.is_authenticated() {
            save_session(path, session)
        } else {
            remove_session(path)
        };
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), "failed to persist session: {e:#}");
        }
    }
}

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Ok(Session::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session from {}", path.display()))?;

    match serde_json::from_str::<Session>(&contents) {
        Ok(session) if session.is_authenticated() => Ok(session),
        Ok(_) => Ok(Session::default()),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable session file: {e}");
            Ok(Session::default())
        }
    }
}

/// Saves the session with restricted permissions (0600).
fn save_session(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let contents = serde_json::to_string_pretty(session).context("Failed to serialize session")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        // `mode` only applies on create; tighten a file that already existed.
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    Ok(())
}

fn remove_session(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
