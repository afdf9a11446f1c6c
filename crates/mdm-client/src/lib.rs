//! MDM Client
//!
//! Everything the console needs to talk to the MDM backend.
//!
//! # Core Concepts
//!
//! - [`ClientConfig`]: layered connection settings
//! - [`SessionContext`]: explicitly passed session with login/logout events
//! - [`MdmApi`]: REST client for organizations, devices, policies, employees
//! - [`SyncGateway`]: loads and saves a [`mdm_policy::PolicyDocument`]
//! - [`PolicyEditor`]: view-model of the policy view
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::load(None)?.validate()?;
//! let api = MdmApi::new(&config)?;
//! let session = SessionContext::new(SessionStore::new(&config.session_file));
//! let login = api.login("admin@example.com", "secret").await?;
//! let role = session.establish(login.token)?.role().clone();
//! println!("landing on {}", role.landing_view());
//! ```

#![warn(unreachable_pub)]

pub mod api;
pub mod config;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod session;

pub use api::{
    Device, Employee, GeoLocation, LoginRequest, LoginResponse, MdmApi, Organization, PolicyBackend, QrImage,
};
pub use config::ClientConfig;
pub use editor::{EditorStatus, PolicyEditor, NO_ENTERPRISE, SAVE_SUCCESS};
pub use error::{ClientError, ConfigError, ErrorKind, SessionError};
pub use gateway::{ContextKey, Saved, SyncGateway};
pub use session::{AuthEvent, Claims, Role, Session, SessionContext, SessionStore, View};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
