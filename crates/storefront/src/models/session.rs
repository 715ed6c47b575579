//! Persisted login session.
//!
//! The session file holds the signed-in user and their bearer token:
//!
//! ```json
//! { "currentUser": { "id": "65f0...", "fullname": "An", "email": "an@example.com" }, "token": "..." }
//! ```
//!
//! A missing file means nobody is signed in. There is no expiry check; an
//! expired token surfaces as `Unauthorized` from the API.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use marketstall_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from reading or writing the session file.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed session file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The signed-in user as remembered by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub fullname: Option<String>,
    pub username: Option<String>,
    /// Recipient for order confirmations.
    pub email: Option<Email>,
}

impl CurrentUser {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.fullname
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("N/A")
    }
}

/// A signed-in user and their bearer token.
#[derive(Clone)]
pub struct Session {
    pub user: CurrentUser,
    token: SecretString,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Session {
    #[must_use]
    pub const fn new(user: CurrentUser, token: SecretString) -> Self {
        Self { user, token }
    }

    /// The bearer token for authenticated API calls.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

// =============================================================================
// On-disk format
// =============================================================================

#[derive(Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "currentUser")]
    current_user: StoredUser,
    token: String,
}

#[derive(Serialize, Deserialize)]
struct StoredUser {
    id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        let StoredUser {
            id,
            fullname,
            username,
            email,
        } = stored.current_user;

        let email = email.and_then(|raw| {
            Email::parse(&raw)
                .inspect_err(|e| warn!(user_id = %id, error = %e, "Ignoring invalid session email"))
                .ok()
        });

        Self {
            user: CurrentUser {
                id,
                fullname,
                username,
                email,
            },
            token: SecretString::from(stored.token),
        }
    }
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            current_user: StoredUser {
                id: session.user.id.clone(),
                fullname: session.user.fullname.clone(),
                username: session.user.username.clone(),
                email: session.user.email.as_ref().map(|e| e.as_str().to_string()),
            },
            token: session.token.expose_secret().to_string(),
        }
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session, or `None` when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No session file");
                return Ok(None);
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let stored: StoredSession =
            serde_json::from_str(&raw).map_err(|source| SessionError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(stored.into()))
    }

    /// Persist a session, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let json = serde_json::to_string_pretty(&StoredSession::from(session)).map_err(
            |source| SessionError::Malformed {
                path: self.path.clone(),
                source,
            },
        )?;

        std::fs::write(&self.path, json).map_err(|source| self.io_error(source))
    }

    /// Remove the session file. Succeeds when there is nothing to remove.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch_store() -> SessionStore {
        let dir = std::env::temp_dir().join(format!("marketstall-{}", uuid::Uuid::new_v4()));
        SessionStore::new(dir.join("nested").join("session.json"))
    }

    fn sample_session() -> Session {
        Session::new(
            CurrentUser {
                id: UserId::new("u1"),
                fullname: Some("Nguyen An".to_string()),
                username: None,
                email: Some(Email::parse("an@example.com").unwrap()),
            },
            SecretString::from("tok-123"),
        )
    }

    #[test]
    fn test_missing_file_means_signed_out() {
        assert!(scratch_store().load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let store = scratch_store();
        store.save(&sample_session()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.user, sample_session().user);
        assert_eq!(loaded.token().expose_secret(), "tok-123");

        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_reads_browser_shaped_session() {
        let store = scratch_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"currentUser": {"id": "u9", "username": "an", "email": "not-an-email"}, "token": "t"}"#,
        )
        .unwrap();

        let session = store.load().unwrap().unwrap();
        assert_eq!(session.user.display_name(), "an");
        assert!(session.user.email.is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let store = scratch_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(SessionError::Malformed { .. })));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", sample_session());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("tok-123"));
    }
}
