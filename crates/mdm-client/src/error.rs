//! Error types for the MDM client
//!
//! Every failure maps onto an [`ErrorKind`] and a short message suitable
//! for showing inline next to the view that caused it.

use std::path::PathBuf;

use mdm_policy::PolicyError;

/// Failure classification shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request rejected by transport or answered with a non-2xx status
    NetworkFailure,
    /// Malformed JSON body or token payload
    ParseFailure,
    /// Required context missing (enterprise, token, configuration)
    ValidationGap,
    /// Local session file could not be read or written
    Storage,
}

/// Main client error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, TLS)
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("{context} failed with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Operation, e.g. "fetch policy"
        context: &'static str,
    },

    /// Response body is not the expected JSON
    #[error("invalid {context} response: {source}")]
    InvalidBody {
        /// Operation, e.g. "fetch policy"
        context: &'static str,
        /// Decoder error
        source: serde_json::Error,
    },

    /// Credentials refused by the login endpoint
    #[error("login rejected with status {0}")]
    LoginRejected(u16),

    /// Login succeeded but carried no token
    #[error("login response carried no token")]
    MissingToken,

    /// Enrollment endpoint answered with something other than an image
    #[error("expected an image, got '{content_type}'")]
    NotAnImage {
        /// Content type received
        content_type: String,
    },

    /// Organization has no enterprise attached
    #[error("no enterprise found for this user")]
    MissingEnterprise,

    /// No session token available
    #[error("not logged in")]
    NotAuthenticated,

    /// Save requested while another save or load is outstanding
    #[error("a save is already in progress")]
    Busy,

    /// Policy document error
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Session error
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Classify the failure
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } | Self::LoginRejected(_) => ErrorKind::NetworkFailure,
            Self::InvalidBody { .. } | Self::MissingToken | Self::NotAnImage { .. } | Self::Policy(_) => {
                ErrorKind::ParseFailure
            }
            Self::MissingEnterprise | Self::NotAuthenticated | Self::Busy | Self::Config(_) => {
                ErrorKind::ValidationGap
            }
            Self::Session(e) => e.kind(),
        }
    }

    /// HTTP status, if the server answered
    #[inline]
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::LoginRejected(status) => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Message shown inline to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { context, .. } | Self::InvalidBody { context, .. } => format!("Failed to {context}"),
            Self::Http(_) => "Network error: unable to reach the server".to_string(),
            Self::LoginRejected(_) => "Invalid email or password".to_string(),
            Self::MissingToken => "Login failed: No token received".to_string(),
            Self::NotAnImage { .. } => "No QR code image received".to_string(),
            Self::MissingEnterprise => "No enterprise found for this user.".to_string(),
            Self::NotAuthenticated => "Please log in first.".to_string(),
            Self::Busy => "A save is already in progress.".to_string(),
            Self::Policy(e) => format!("Invalid policy: {e}"),
            Self::Session(e) => e.to_string(),
            Self::Config(e) => format!("Invalid configuration: {e}"),
        }
    }
}

/// Session and token errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Token does not have a payload segment
    #[error("malformed token: expected three dot-separated parts")]
    MalformedToken,

    /// Payload segment is not base64url
    #[error("token payload is not base64url: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    /// Payload or session file is not the expected JSON
    #[error("invalid session data: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Session file I/O failed
    #[error("session file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl SessionError {
    /// Classify the failure
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedToken | Self::InvalidEncoding(_) | Self::InvalidJson(_) => ErrorKind::ParseFailure,
            Self::Io { .. } => ErrorKind::Storage,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid TOML
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Base URL is not an absolute http(s) URL
    #[error("base_url must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),

    /// Policy id is blank
    #[error("policy_id must not be empty")]
    EmptyPolicyId,

    /// Timeout is zero
    #[error("timeout_secs must be greater than zero")]
    ZeroTimeout,
}
