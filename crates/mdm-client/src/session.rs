//! Session context
//!
//! Holds the bearer token and role of the signed-in user, persists it to a
//! session file between runs, and notifies subscribers on login and logout.
//!
//! # Token handling
//!
//! Only the JWT payload is decoded, to read the role. The signature is
//! never checked here; the backend does that on every request.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::SessionError;

/// Role claim value granting the organizations view
pub const SUPER_ADMIN: &str = "SUPER_ADMIN";

const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const EVENT_CAPACITY: usize = 16;

/// Dashboard tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// All organizations (super admin only)
    Organizations,
    /// The user's own enterprise
    Enterprise,
    /// Device inventory
    Devices,
    /// Policy editor
    Policies,
    /// Employees and their devices
    Users,
}

impl View {
    /// Tab title
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Organizations => "Organizations",
            Self::Enterprise => "Enterprise",
            Self::Devices => "Devices",
            Self::Policies => "Policies",
            Self::Users => "Users",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// User role from the token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Platform operator managing all organizations
    SuperAdmin,
    /// Any other role, kept verbatim (may be empty)
    Member(String),
}

impl Role {
    /// Interpret a role claim
    #[must_use]
    pub fn from_claim(claim: &str) -> Self {
        if claim == SUPER_ADMIN {
            Self::SuperAdmin
        } else {
            Self::Member(claim.to_string())
        }
    }

    /// Claim text
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => SUPER_ADMIN,
            Self::Member(role) => role,
        }
    }

    /// Whether this is the super admin role
    #[inline]
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    /// View shown right after login
    #[must_use]
    pub fn landing_view(&self) -> View {
        if self.is_super_admin() {
            View::Organizations
        } else {
            View::Enterprise
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded JWT payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Role claim; missing is empty
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: String,
    /// Subject (usually the login email)
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
    /// Every other claim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_string<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl Claims {
    /// Decode the payload of a JWT
    ///
    /// Padding on the payload segment is optional.
    ///
    /// # Errors
    /// - `SessionError::MalformedToken` without a payload segment
    /// - `SessionError::InvalidEncoding` if the payload is not base64url
    /// - `SessionError::InvalidJson` if the payload is not a JSON object
    pub fn from_token(token: &str) -> Result<Self, SessionError> {
        let payload = token
            .split('.')
            .nth(1)
            .filter(|p| !p.is_empty())
            .ok_or(SessionError::MalformedToken)?;
        let bytes = PAYLOAD_ENGINE.decode(payload)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Role carried by the token
    #[must_use]
    pub fn role(&self) -> Role {
        Role::from_claim(&self.role)
    }

    /// Expiry time, if present
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Whether the token expired before `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

/// Signed-in user
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    role: Role,
}

impl Session {
    /// Create from token and role
    #[must_use]
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            role,
        }
    }

    /// Decode the role from the token
    ///
    /// # Errors
    /// Returns error if the token payload cannot be decoded
    pub fn from_token(token: impl Into<String>) -> Result<Self, SessionError> {
        let token = token.into();
        let role = Claims::from_token(&token)?.role();
        Ok(Self { token, role })
    }

    /// Bearer token
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// User role
    #[inline]
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// On-disk session record
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    token: String,
    is_authenticated: bool,
    #[serde(default)]
    user_role: String,
}

/// Session file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session
    ///
    /// A missing file, a record not marked authenticated, or an unparsable
    /// record yields `None`. Unparsable records are logged and removed.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        let stored: StoredSession = match serde_json::from_str(&text) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {}: {}", self.path.display(), e);
                if let Err(e) = self.clear() {
                    tracing::warn!("Could not remove session file: {}", e);
                }
                return Ok(None);
            }
        };
        if !stored.is_authenticated || stored.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(Session::new(stored.token, Role::from_claim(&stored.user_role))))
    }

    /// Persist `session`, creating parent directories
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let stored = StoredSession {
            token: session.token.clone(),
            is_authenticated: true,
            user_role: session.role.as_str().to_string(),
        };
        let text = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, text).map_err(|source| self.io_error(source))
    }

    /// Remove the session file; a missing file is fine
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be removed
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
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

/// Authentication state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session was established or restored
    LoggedIn {
        /// Role of the new session
        role: Role,
    },
    /// The session was cleared
    LoggedOut,
}

/// Shared session handle passed to everything that talks to the backend
#[derive(Debug)]
pub struct SessionContext {
    current: RwLock<Option<Session>>,
    store: Option<SessionStore>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionContext {
    /// Context persisting to `store`
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self::build(Some(store))
    }

    /// Context without persistence
    #[must_use]
    pub fn in_memory() -> Self {
        Self::build(None)
    }

    fn build(store: Option<SessionStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current: RwLock::new(None),
            store,
            events,
        }
    }

    /// Load the persisted session, if any
    ///
    /// # Errors
    /// Returns error if the session file is unreadable
    pub fn restore(&self) -> Result<Option<Session>, SessionError> {
        let Some(store) = &self.store else {
            return Ok(self.current());
        };
        let session = store.load()?;
        *self.current.write() = session.clone();
        if let Some(s) = &session {
            tracing::debug!("Restored session for role {}", s.role());
            self.notify(AuthEvent::LoggedIn { role: s.role().clone() });
        }
        Ok(session)
    }

    /// Start a session from a freshly issued token
    ///
    /// # Errors
    /// Returns error if the token cannot be decoded or persisted
    pub fn establish(&self, token: impl Into<String>) -> Result<Session, SessionError> {
        let session = Session::from_token(token)?;
        if let Some(store) = &self.store {
            store.save(&session)?;
        }
        *self.current.write() = Some(session.clone());
        tracing::info!("Logged in with role {}", session.role());
        self.notify(AuthEvent::LoggedIn {
            role: session.role().clone(),
        });
        Ok(session)
    }

    /// End the session
    ///
    /// # Errors
    /// Returns error if the session file cannot be removed
    pub fn logout(&self) -> Result<(), SessionError> {
        *self.current.write() = None;
        if let Some(store) = &self.store {
            store.clear()?;
        }
        tracing::info!("Logged out");
        self.notify(AuthEvent::LoggedOut);
        Ok(())
    }

    /// Receive future auth events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Current session
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Current bearer token
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.token.clone())
    }

    /// Current role
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.current.read().as_ref().map(|s| s.role.clone())
    }

    /// Whether a session is active
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    fn notify(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdm_test_utils::{make_jwt, make_jwt_with_claims};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decode_role_from_token() {
        let claims = Claims::from_token(&make_jwt("SUPER_ADMIN")).unwrap();
        assert_eq!(claims.role(), Role::SuperAdmin);
        assert_eq!(claims.sub.as_deref(), Some("admin@example.com"));
        assert_eq!(claims.role().landing_view(), View::Organizations);

        let claims = Claims::from_token(&make_jwt("ADMIN")).unwrap();
        assert_eq!(claims.role(), Role::Member("ADMIN".into()));
        assert_eq!(claims.role().landing_view(), View::Enterprise);
    }

    #[test]
    fn missing_role_is_empty_member() {
        let token = make_jwt_with_claims(&json!({"sub": "x", "tenant": "acme"}));
        let claims = Claims::from_token(&token).unwrap();
        assert_eq!(claims.role(), Role::Member(String::new()));
        assert_eq!(claims.extra["tenant"], json!("acme"));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let token = make_jwt("ADMIN");
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        while parts[1].len() % 4 != 0 {
            parts[1].push('=');
        }
        let claims = Claims::from_token(&parts.join(".")).unwrap();
        assert_eq!(claims.role, "ADMIN");
    }

    #[test]
    fn malformed_tokens() {
        assert!(matches!(Claims::from_token("abc"), Err(SessionError::MalformedToken)));
        assert!(matches!(Claims::from_token("a..c"), Err(SessionError::MalformedToken)));
        assert!(matches!(Claims::from_token("a.!!!.c"), Err(SessionError::InvalidEncoding(_))));
        let not_json = format!("h.{}.s", PAYLOAD_ENGINE.encode(b"not json"));
        assert!(matches!(Claims::from_token(&not_json), Err(SessionError::InvalidJson(_))));
    }

    #[test]
    fn expiry() {
        let claims = Claims {
            exp: Some(1_000),
            ..Claims::default()
        };
        let later = DateTime::from_timestamp(2_000, 0).unwrap();
        assert!(claims.is_expired_at(later));
        assert!(!Claims::default().is_expired_at(later));
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = Session::from_token(make_jwt("ADMIN")).unwrap();
        let debug = format!("{session:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(session.token()));
    }

    #[test]
    fn store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        assert_eq!(store.load().unwrap(), None);

        let session = Session::from_token(make_jwt("SUPER_ADMIN")).unwrap();
        store.save(&session).unwrap();
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["isAuthenticated"], json!(true));
        assert_eq!(raw["userRole"], json!("SUPER_ADMIN"));
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn unauthenticated_record_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"token":"t","isAuthenticated":false,"userRole":"ADMIN"}"#).unwrap();
        assert_eq!(SessionStore::new(path).load().unwrap(), None);
    }

    #[test]
    fn corrupt_record_loads_as_none_and_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let context = SessionContext::new(SessionStore::new(&path));
        assert_eq!(context.restore().unwrap(), None);
        assert!(!context.is_authenticated());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn context_notifies_on_login_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let context = SessionContext::new(SessionStore::new(dir.path().join("session.json")));
        let mut events = context.subscribe();

        context.establish(make_jwt("SUPER_ADMIN")).unwrap();
        assert!(context.is_authenticated());
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::LoggedIn { role: Role::SuperAdmin }
        );

        let restored = SessionContext::new(SessionStore::new(dir.path().join("session.json")));
        assert_eq!(restored.restore().unwrap().map(|s| s.role().clone()), Some(Role::SuperAdmin));

        context.logout().unwrap();
        assert!(!context.is_authenticated());
        assert_eq!(context.token(), None);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::LoggedOut);
        assert_eq!(restored.restore().unwrap(), None);
    }

    #[test]
    fn in_memory_context_keeps_nothing_on_disk() {
        let context = SessionContext::in_memory();
        assert_eq!(context.restore().unwrap(), None);
        context.establish(make_jwt("ADMIN")).unwrap();
        assert_eq!(context.role(), Some(Role::Member("ADMIN".into())));
    }
}
