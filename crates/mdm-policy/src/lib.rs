//! MDM Policy
//!
//! Schema-driven editing of Android Enterprise management policies.
//!
//! # Core Concepts
//!
//! - [`SchemaRegistry`]: static table of editable fields, grouped for layout
//! - [`PolicyDocument`]: JSON policy with path-addressed, copy-on-write updates
//! - [`PolicyPath`]: dotted path into a document
//! - [`FieldBinder`]: renders a [`Form`] of controls and applies [`Edit`]s
//!
//! # Example
//!
//! ```rust
//! use mdm_policy::{Edit, FieldBinder, PolicyDocument, SchemaRegistry};
//!
//! let doc = PolicyDocument::from_json(r#"{"cameraDisabled": false}"#).unwrap();
//! let doc = FieldBinder::apply(&doc, Edit::FlipToggle { path: "cameraDisabled".parse().unwrap() }).unwrap();
//! let form = FieldBinder::render(SchemaRegistry::standard(), &doc);
//! assert_eq!(form.len(), SchemaRegistry::standard().len());
//! ```

#![warn(unreachable_pub)]

mod binder;
mod document;
mod error;
mod path;
mod schema;

pub use binder::{Cell, Control, ControlKind, Edit, FieldBinder, Form, Row};
pub use document::{FieldValue, PolicyDocument, Record};
pub use error::PolicyError;
pub use path::{PathError, PolicyPath};
pub use schema::{FieldGroup, FieldKind, FieldSchema, SchemaRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
