//! Field binder
//!
//! Maps schema entries to controls reflecting the current document, and
//! routes user edits back into the document through path updates.
//!
//! No validation happens here: enum options are displayed, not enforced.

use std::fmt::{self, Display, Formatter};

use serde_json::{Map, Value};

use crate::document::{display_scalar, FieldValue, PolicyDocument};
use crate::error::PolicyError;
use crate::path::PolicyPath;
use crate::schema::{split_columns, FieldGroup, FieldSchema, SchemaRegistry};

/// Rendered control bound to one schema entry and one document path
#[derive(Debug, Clone, PartialEq)]
pub struct Control<'a> {
    /// Schema entry this control reflects
    pub schema: &'a FieldSchema,
    /// Bound document path
    pub path: PolicyPath,
    /// Widget state
    pub kind: ControlKind,
}

/// Widget with its current state
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    /// Free text input
    TextInput {
        /// Current text
        value: String,
    },
    /// On/off switch
    Toggle {
        /// Current state
        on: bool,
    },
    /// Single choice
    Select {
        /// Selected option, if any
        selected: Option<String>,
    },
    /// List of strings with add/remove affordances
    ScalarList {
        /// Current items
        items: Vec<String>,
    },
    /// List of records with add-row/remove-row affordances
    ObjectList {
        /// One row per element
        rows: Vec<Row>,
    },
}

/// One element of an object list
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Position in the list
    pub index: usize,
    /// Path of the element
    pub path: PolicyPath,
    /// One cell per item field
    pub cells: Vec<Cell>,
}

/// One item field of a row
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Item field name
    pub field: &'static str,
    /// Path `list.<index>.<field>`
    pub path: PolicyPath,
    /// Current text
    pub value: String,
}

/// User edit routed through the binder
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Replace text input content
    SetText {
        /// Target path
        path: PolicyPath,
        /// New content
        value: String,
    },
    /// Set a toggle to an explicit state
    SetToggle {
        /// Target path
        path: PolicyPath,
        /// New state
        on: bool,
    },
    /// Flip a toggle
    FlipToggle {
        /// Target path
        path: PolicyPath,
    },
    /// Choose one option
    Select {
        /// Target path
        path: PolicyPath,
        /// Chosen option
        option: String,
    },
    /// Replace a multi-select list wholesale
    SetSelection {
        /// Target path
        path: PolicyPath,
        /// Selected options, in order
        options: Vec<String>,
    },
    /// Append a string to a scalar list; blank values are ignored
    AddScalar {
        /// List path
        path: PolicyPath,
        /// New item
        value: String,
    },
    /// Remove a scalar list item
    RemoveScalar {
        /// List path
        path: PolicyPath,
        /// Item index
        index: usize,
    },
    /// Append a blank record to an object list
    AddRow {
        /// List path
        path: PolicyPath,
    },
    /// Remove a record from an object list
    RemoveRow {
        /// List path
        path: PolicyPath,
        /// Row index
        index: usize,
    },
    /// Set one cell of an object list row
    SetCell {
        /// List path
        path: PolicyPath,
        /// Row index
        row: usize,
        /// Item field
        field: String,
        /// New content
        value: String,
    },
}

impl Edit {
    /// Path the edit writes through
    #[must_use]
    pub fn path(&self) -> PolicyPath {
        match self {
            Self::SetCell { path, row, field, .. } => path.index(*row).child(field.as_str()),
            Self::SetText { path, .. }
            | Self::SetToggle { path, .. }
            | Self::FlipToggle { path }
            | Self::Select { path, .. }
            | Self::SetSelection { path, .. }
            | Self::AddScalar { path, .. }
            | Self::RemoveScalar { path, .. }
            | Self::AddRow { path }
            | Self::RemoveRow { path, .. } => path.clone(),
        }
    }
}

/// Controls for a whole registry, in layout order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Form<'a> {
    controls: Vec<Control<'a>>,
}

impl<'a> Form<'a> {
    /// All controls
    #[inline]
    #[must_use]
    pub fn controls(&self) -> &[Control<'a>] {
        &self.controls
    }

    /// Control bound to a schema key
    #[must_use]
    pub fn control(&self, key: &str) -> Option<&Control<'a>> {
        self.controls.iter().find(|c| c.schema.key == key)
    }

    /// Controls of one layout group
    pub fn group(&self, group: FieldGroup) -> impl Iterator<Item = &Control<'a>> {
        self.controls.iter().filter(move |c| c.schema.group == group)
    }

    /// Number of controls
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    /// Check if form has no controls
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Plain-text rendering: one section per group, toggles in two columns
    #[must_use]
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

/// Binds schema entries to a document
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldBinder;

impl FieldBinder {
    /// Render one control per registry entry
    #[must_use]
    pub fn render<'a>(registry: &'a SchemaRegistry, document: &PolicyDocument) -> Form<'a> {
        Form {
            controls: registry.iter().map(|schema| Self::control(schema, document)).collect(),
        }
    }

    /// Render the control for a single entry
    #[must_use]
    pub fn control<'a>(schema: &'a FieldSchema, document: &PolicyDocument) -> Control<'a> {
        let path = schema.path();
        let kind = match document.field(schema) {
            FieldValue::Text(value) => ControlKind::TextInput { value },
            FieldValue::Toggle(on) => ControlKind::Toggle { on },
            FieldValue::Enum(selected) => ControlKind::Select { selected },
            FieldValue::ScalarList(items) => ControlKind::ScalarList { items },
            FieldValue::ObjectList(records) => ControlKind::ObjectList {
                rows: records
                    .iter()
                    .enumerate()
                    .map(|(index, record)| row(schema, &path, index, record))
                    .collect(),
            },
        };
        Control { schema, path, kind }
    }

    /// Apply an edit, returning the updated document
    ///
    /// # Errors
    /// Propagates store errors, e.g. `PolicyError::NotAList` when adding to
    /// a path holding a scalar
    pub fn apply(document: &PolicyDocument, edit: Edit) -> Result<PolicyDocument, PolicyError> {
        match edit {
            Edit::SetText { path, value } | Edit::Select { path, option: value } => {
                document.set(&path, Value::String(value))
            }
            Edit::SetToggle { path, on } => document.set(&path, Value::Bool(on)),
            Edit::FlipToggle { path } => document.toggle(&path),
            Edit::SetSelection { path, options } => {
                document.set(&path, Value::Array(options.into_iter().map(Value::String).collect()))
            }
            Edit::AddScalar { path, value } => {
                let value = value.trim();
                if value.is_empty() {
                    return Ok(document.clone());
                }
                document.append_to_list(&path, Value::String(value.to_string()))
            }
            Edit::AddRow { path } => document.append_to_list(&path, Value::Object(Map::new())),
            Edit::RemoveScalar { path, index } | Edit::RemoveRow { path, index } => {
                Ok(document.remove_from_list(&path, index))
            }
            Edit::SetCell {
                path,
                row,
                field,
                value,
            } => document.set(&path.index(row).child(field), Value::String(value)),
        }
    }
}

fn row(schema: &FieldSchema, list: &PolicyPath, index: usize, record: &Map<String, Value>) -> Row {
    let path = list.index(index);
    let cells = schema
        .item_fields
        .iter()
        .map(|&field| Cell {
            field,
            path: path.child(field),
            value: record.get(field).map(display_scalar).unwrap_or_default(),
        })
        .collect();
    Row { index, path, cells }
}

const COLUMN_WIDTH: usize = 44;

fn toggle_cell(control: &Control<'_>) -> String {
    let on = matches!(control.kind, ControlKind::Toggle { on: true });
    format!("[{}] {}", if on { "x" } else { " " }, control.schema.label)
}

impl Display for Form<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for group in FieldGroup::ALL {
            let controls: Vec<_> = self.group(group).collect();
            if controls.is_empty() {
                continue;
            }
            writeln!(f, "== {} ==", group.title())?;

            if group == FieldGroup::Toggles {
                let (left, right) = split_columns(&controls);
                for (i, l) in left.iter().enumerate() {
                    match right.get(i) {
                        Some(r) => writeln!(f, "{:<width$}{}", toggle_cell(l), toggle_cell(r), width = COLUMN_WIDTH)?,
                        None => writeln!(f, "{}", toggle_cell(l))?,
                    }
                }
                writeln!(f)?;
                continue;
            }

            for control in controls {
                write!(f, "{control}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Display for Control<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = self.schema.label;
        match &self.kind {
            ControlKind::TextInput { value } => writeln!(f, "{label}: {value}"),
            ControlKind::Toggle { .. } => {
                writeln!(f, "{}", toggle_cell(self))?;
                match self.schema.info {
                    Some(info) => writeln!(f, "    {info}"),
                    None => Ok(()),
                }
            }
            ControlKind::Select { selected } => {
                writeln!(f, "{label}: {}", selected.as_deref().unwrap_or("Select..."))?;
                writeln!(f, "    options: {}", self.schema.options.join(", "))
            }
            ControlKind::ScalarList { items } => {
                if items.is_empty() {
                    writeln!(f, "{label}: (none)")?;
                } else {
                    writeln!(f, "{label}:")?;
                    for (i, item) in items.iter().enumerate() {
                        writeln!(f, "    [{i}] {item}")?;
                    }
                }
                if !self.schema.options.is_empty() {
                    writeln!(f, "    options: {}", self.schema.options.join(", "))?;
                }
                Ok(())
            }
            ControlKind::ObjectList { rows } => {
                writeln!(f, "{label} ({})", rows.len())?;
                for row in rows {
                    let cells: Vec<_> = row
                        .cells
                        .iter()
                        .map(|c| format!("{}={}", c.field, c.value))
                        .collect();
                    writeln!(f, "    [{}] {}", row.index, cells.join("  "))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> PolicyPath {
        s.parse().unwrap()
    }

    fn document() -> PolicyDocument {
        PolicyDocument::from_value(json!({
            "name": "policy1",
            "cameraDisabled": true,
            "passwordQuality": "NUMERIC",
            "keyguardDisabledFeatures": ["CAMERA"],
            "applications": [
                {"packageName": "com.spotify.music", "installType": "FORCE_INSTALLED"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn render_reflects_document() {
        let registry = SchemaRegistry::standard();
        let form = FieldBinder::render(registry, &document());
        assert_eq!(form.len(), registry.len());

        assert_eq!(
            form.control("name").unwrap().kind,
            ControlKind::TextInput { value: "policy1".into() }
        );
        assert_eq!(form.control("cameraDisabled").unwrap().kind, ControlKind::Toggle { on: true });
        assert_eq!(
            form.control("passwordQuality").unwrap().kind,
            ControlKind::Select { selected: Some("NUMERIC".into()) }
        );
        assert_eq!(
            form.control("keyguardDisabledFeatures").unwrap().kind,
            ControlKind::ScalarList { items: vec!["CAMERA".into()] }
        );
    }

    #[test]
    fn object_list_cells_have_own_paths() {
        let form = FieldBinder::render(SchemaRegistry::standard(), &document());
        let ControlKind::ObjectList { rows } = &form.control("applications").unwrap().kind else {
            panic!("expected object list");
        };
        assert_eq!(rows.len(), 1);
        let cells = &rows[0].cells;
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].path.to_string(), "applications.0.packageName");
        assert_eq!(cells[0].value, "com.spotify.music");
        assert_eq!(cells[2].field, "defaultPermissionPolicy");
        assert_eq!(cells[2].value, "");
    }

    #[test]
    fn apply_text_and_select() {
        let doc = FieldBinder::apply(
            &document(),
            Edit::Select {
                path: path("wifiConfigType"),
                option: "WPA3".into(),
            },
        )
        .unwrap();
        assert_eq!(doc.get(&path("wifiConfigType")), Some(&json!("WPA3")));

        let doc = FieldBinder::apply(
            &doc,
            Edit::SetText {
                path: path("name"),
                value: "renamed".into(),
            },
        )
        .unwrap();
        assert_eq!(doc.get(&path("name")), Some(&json!("renamed")));
    }

    #[test]
    fn select_accepts_value_outside_options() {
        let doc = FieldBinder::apply(
            &document(),
            Edit::Select {
                path: path("passwordQuality"),
                option: "SOMETHING_ELSE".into(),
            },
        )
        .unwrap();
        assert_eq!(doc.get(&path("passwordQuality")), Some(&json!("SOMETHING_ELSE")));
    }

    #[test]
    fn apply_toggles() {
        let doc = FieldBinder::apply(&document(), Edit::FlipToggle { path: path("cameraDisabled") }).unwrap();
        assert_eq!(doc.get(&path("cameraDisabled")), Some(&json!(false)));
        let doc = FieldBinder::apply(
            &doc,
            Edit::SetToggle {
                path: path("statusReportingSettings.softwareInfoEnabled"),
                on: true,
            },
        )
        .unwrap();
        assert_eq!(
            doc.get(&path("statusReportingSettings")),
            Some(&json!({"softwareInfoEnabled": true}))
        );
    }

    #[test]
    fn blank_scalar_is_ignored() {
        let original = document();
        let doc = FieldBinder::apply(
            &original,
            Edit::AddScalar {
                path: path("frpAdminEmails"),
                value: "   ".into(),
            },
        )
        .unwrap();
        assert_eq!(doc, original);
    }

    #[test]
    fn scalar_add_and_remove() {
        let doc = FieldBinder::apply(
            &document(),
            Edit::AddScalar {
                path: path("keyguardDisabledFeatures"),
                value: "FINGERPRINT".into(),
            },
        )
        .unwrap();
        assert_eq!(doc.get(&path("keyguardDisabledFeatures")), Some(&json!(["CAMERA", "FINGERPRINT"])));
        let doc = FieldBinder::apply(
            &doc,
            Edit::RemoveScalar {
                path: path("keyguardDisabledFeatures"),
                index: 0,
            },
        )
        .unwrap();
        assert_eq!(doc.get(&path("keyguardDisabledFeatures")), Some(&json!(["FINGERPRINT"])));
    }

    #[test]
    fn set_selection_replaces_list() {
        let doc = FieldBinder::apply(
            &document(),
            Edit::SetSelection {
                path: path("stayOnPluggedModes"),
                options: vec!["AC".into(), "USB".into()],
            },
        )
        .unwrap();
        assert_eq!(doc.get(&path("stayOnPluggedModes")), Some(&json!(["AC", "USB"])));
    }

    #[test]
    fn rows_add_edit_remove() {
        let list = path("permittedApps");
        let doc = FieldBinder::apply(&document(), Edit::AddRow { path: list.clone() }).unwrap();
        assert_eq!(doc.get(&list), Some(&json!([{}])));

        let doc = FieldBinder::apply(
            &doc,
            Edit::SetCell {
                path: list.clone(),
                row: 0,
                field: "packageName".into(),
                value: "com.example".into(),
            },
        )
        .unwrap();
        assert_eq!(doc.get(&list), Some(&json!([{"packageName": "com.example"}])));

        let doc = FieldBinder::apply(&doc, Edit::RemoveRow { path: list.clone(), index: 0 }).unwrap();
        assert_eq!(doc.get(&list), Some(&json!([])));
    }

    #[test]
    fn edit_leaves_siblings_untouched() {
        let original = document();
        let doc = FieldBinder::apply(
            &original,
            Edit::SetCell {
                path: path("applications"),
                row: 0,
                field: "installType".into(),
                value: "BLOCKED".into(),
            },
        )
        .unwrap();
        assert_eq!(doc.get(&path("applications.0.packageName")), Some(&json!("com.spotify.music")));
        assert_eq!(doc.get(&path("cameraDisabled")), original.get(&path("cameraDisabled")));
    }

    #[test]
    fn add_row_on_scalar_is_error() {
        let err = FieldBinder::apply(&document(), Edit::AddRow { path: path("name") }).unwrap_err();
        assert!(matches!(err, PolicyError::NotAList(_)));
    }

    #[test]
    fn edit_path_for_cell() {
        let edit = Edit::SetCell {
            path: path("applications"),
            row: 2,
            field: "installType".into(),
            value: String::new(),
        };
        assert_eq!(edit.path().to_string(), "applications.2.installType");
    }

    #[test]
    fn text_rendering_has_sections_and_columns() {
        let text = FieldBinder::render(SchemaRegistry::standard(), &document()).render_text();
        assert!(text.contains("== General policy settings =="));
        assert!(text.contains("Name: policy1"));
        assert!(text.contains("[x] Camera Disabled"));
        assert!(text.contains("Password Quality: NUMERIC"));
        assert!(text.contains("Applications (1)"));
        assert!(text.contains("packageName=com.spotify.music"));
        let first_toggle_line = text
            .lines()
            .find(|l| l.contains("Screen Capture Disabled"))
            .unwrap();
        assert!(first_toggle_line.contains("Remove User Disabled"));
    }

    #[test]
    fn toggle_grid_matches_registry_columns() {
        let registry = SchemaRegistry::standard();
        let text = FieldBinder::render(registry, &document()).render_text();
        let cell = |s: &FieldSchema| format!("[{}] {}", if s.key == "cameraDisabled" { "x" } else { " " }, s.label);
        let (left, right) = registry.toggle_columns();
        for (l, r) in left.iter().zip(&right) {
            let expected = format!("{:<width$}{}", cell(*l), cell(*r), width = COLUMN_WIDTH);
            assert!(text.lines().any(|line| line == expected), "missing row: {expected}");
        }
    }

    #[test]
    fn single_toggle_shows_help_text() {
        let registry = SchemaRegistry::standard();
        let control = FieldBinder::control(registry.get("cameraDisabled").unwrap(), &document());
        assert_eq!(
            control.to_string(),
            "[x] Camera Disabled\n    Disables the device camera for all users.\n"
        );
    }
}
