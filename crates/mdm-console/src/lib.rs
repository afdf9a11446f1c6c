//! MDM Console
//!
//! Command-line administration console: login, role-routed dashboard,
//! organization and device listings, enrollment, employees and the
//! policy editor.

#![warn(unreachable_pub)]

pub mod cli;
pub mod commands;
pub mod dashboard;
pub mod edits;
pub mod logging;
pub mod render;

pub use commands::{user_message, Console};
pub use dashboard::{Dashboard, Unavailable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
