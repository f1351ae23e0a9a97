//! Authentication state shared by every flow.
//!
//! All writes go through [`SessionStore::sign_in`] / [`SessionStore::sign_out`];
//! readers either peek at the current value or hold a `watch` receiver and
//! get notified on change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub logged_in: bool,
    pub token: Option<String>,
    pub phone: Option<String>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.logged_in && self.token.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
    storage: Option<Arc<PathBuf>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// Session that lives for the process only
    pub fn in_memory() -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self {
            tx: Arc::new(tx),
            storage: None,
        }
    }

    /// Session backed by a JSON file. A missing file starts signed out; a
    /// corrupt one is logged and ignored.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let session = match tokio::fs::read_to_string(&path).await {
            Ok(json) => match serde_json::from_str::<Session>(&json) {
                Ok(session) => session,
                Err(e) => {
                    warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                    Session::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Session::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session file {}", path.display()))
            }
        };

        debug!(logged_in = session.logged_in, "Loaded session from {}", path.display());
        let (tx, _rx) = watch::channel(session);
        Ok(Self {
            tx: Arc::new(tx),
            storage: Some(Arc::new(path)),
        })
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_active()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub async fn sign_in(&self, token: String, phone: Option<String>) {
        self.tx.send_replace(Session {
            logged_in: true,
            token: Some(token),
            phone,
        });
        info!("Session established");
        self.persist().await;
    }

    pub async fn sign_out(&self) {
        self.tx.send_replace(Session::default());
        info!("Session cleared");
        self.persist().await;
    }

    async fn persist(&self) {
        let Some(path) = &self.storage else { return };

        let json = match serde_json::to_string_pretty(&self.current()) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize session: {}", e);
                return;
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    warn!("Failed to create session directory {}: {}", parent.display(), e);
                    return;
                }
            }
        }
        if let Err(e) = tokio::fs::write(path.as_path(), json).await {
            warn!("Failed to write session file {}: {}", path.display(), e);
        }
    }
}
