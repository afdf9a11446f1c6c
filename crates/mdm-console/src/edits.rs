//! Translate policy command arguments into binder edits

use mdm_policy::{Edit, FieldKind, PolicyDocument, PolicyPath, SchemaRegistry};
use serde_json::Value;

/// Argument that cannot become an edit
#[derive(Debug, thiserror::Error)]
pub enum ArgError {
    /// Toggle value is not a boolean
    #[error("'{0}' is not a boolean (use true or false)")]
    NotABool(String),

    /// Object lists are edited per row
    #[error("'{0}' is a list of records; use `policy add` and `policy remove`, or set `{0}.<row>.<field>`")]
    WholeList(String),

    /// Scalar lists need an item to add
    #[error("'{0}' needs an item to add")]
    MissingItem(String),
}

fn parse_bool(raw: &str) -> Result<bool, ArgError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ArgError::NotABool(raw.to_string())),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn kind_of(registry: &SchemaRegistry, path: &PolicyPath) -> Option<FieldKind> {
    registry.get(&path.to_string()).map(|s| s.kind)
}

/// Edit for `policy set <path> <value>`
///
/// Known fields are edited according to their kind. `list.<row>.<field>`
/// on a record list edits one cell. Unknown paths take booleans as toggles
/// and everything else as text.
///
/// # Errors
/// Returns error for non-boolean toggle values and whole record lists
pub fn for_set(registry: &SchemaRegistry, path: PolicyPath, raw: &str) -> Result<Edit, ArgError> {
    if let Some(kind) = kind_of(registry, &path) {
        return match kind {
            FieldKind::Text => Ok(Edit::SetText {
                path,
                value: raw.to_string(),
            }),
            FieldKind::Toggle => parse_bool(raw).map(|on| Edit::SetToggle { path, on }),
            FieldKind::Enum => Ok(Edit::Select {
                path,
                option: raw.to_string(),
            }),
            FieldKind::ListOfScalar => Ok(Edit::SetSelection {
                path,
                options: split_list(raw),
            }),
            FieldKind::ListOfObject => Err(ArgError::WholeList(path.to_string())),
        };
    }

    if let [list, row, field] = path.segments() {
        let is_records = registry.get(list).is_some_and(|s| s.kind == FieldKind::ListOfObject);
        if let (true, Ok(row)) = (is_records, row.parse::<usize>()) {
            return Ok(Edit::SetCell {
                path: PolicyPath::single(list.as_str()),
                row,
                field: field.clone(),
                value: raw.to_string(),
            });
        }
    }

    Ok(match parse_bool(raw) {
        Ok(on) => Edit::SetToggle { path, on },
        Err(_) => Edit::SetText {
            path,
            value: raw.to_string(),
        },
    })
}

/// Edits for `policy add <path> [<item>]`
///
/// Record lists get a blank row, then one cell edit per field of a JSON
/// object item. Other lists get the item as text.
///
/// # Errors
/// Returns error if a scalar list is given no item
pub fn for_add(
    registry: &SchemaRegistry,
    document: &PolicyDocument,
    path: PolicyPath,
    item: Option<&str>,
) -> Result<Vec<Edit>, ArgError> {
    let records = kind_of(registry, &path) == Some(FieldKind::ListOfObject);
    let parsed = item.map(|raw| serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string())));

    match parsed {
        None if records || kind_of(registry, &path).is_none() => Ok(vec![Edit::AddRow { path }]),
        None => Err(ArgError::MissingItem(path.to_string())),
        Some(Value::Object(fields)) => {
            let row = document.get(&path).and_then(Value::as_array).map_or(0, Vec::len);
            let mut edits = vec![Edit::AddRow { path: path.clone() }];
            edits.extend(fields.into_iter().map(|(field, value)| Edit::SetCell {
                path: path.clone(),
                row,
                field,
                value: match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
            }));
            Ok(edits)
        }
        Some(Value::String(value)) => Ok(vec![Edit::AddScalar { path, value }]),
        Some(other) => Ok(vec![Edit::AddScalar {
            path,
            value: other.to_string(),
        }]),
    }
}

/// Edit for `policy remove <path> <index>`
#[must_use]
pub fn for_remove(registry: &SchemaRegistry, path: PolicyPath, index: usize) -> Edit {
    if kind_of(registry, &path) == Some(FieldKind::ListOfObject) {
        Edit::RemoveRow { path, index }
    } else {
        Edit::RemoveScalar { path, index }
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

    fn registry() -> &'static SchemaRegistry {
        SchemaRegistry::standard()
    }

    #[test]
    fn set_follows_field_kind() {
        assert_eq!(
            for_set(registry(), path("cameraDisabled"), "TRUE").unwrap(),
            Edit::SetToggle {
                path: path("cameraDisabled"),
                on: true
            }
        );
        assert_eq!(
            for_set(registry(), path("wifiConfigType"), "WPA3").unwrap(),
            Edit::Select {
                path: path("wifiConfigType"),
                option: "WPA3".into()
            }
        );
        assert_eq!(
            for_set(registry(), path("stayOnPluggedModes"), "AC, USB").unwrap(),
            Edit::SetSelection {
                path: path("stayOnPluggedModes"),
                options: vec!["AC".into(), "USB".into()]
            }
        );
        assert!(matches!(
            for_set(registry(), path("cameraDisabled"), "maybe"),
            Err(ArgError::NotABool(_))
        ));
        assert!(matches!(
            for_set(registry(), path("applications"), "x"),
            Err(ArgError::WholeList(_))
        ));
    }

    #[test]
    fn set_cell_of_record_list() {
        assert_eq!(
            for_set(registry(), path("applications.0.installType"), "BLOCKED").unwrap(),
            Edit::SetCell {
                path: path("applications"),
                row: 0,
                field: "installType".into(),
                value: "BLOCKED".into()
            }
        );
    }

    #[test]
    fn set_unknown_path() {
        assert_eq!(
            for_set(registry(), path("kioskCustomization.statusBar"), "SYSTEM_INFO_ONLY").unwrap(),
            Edit::SetText {
                path: path("kioskCustomization.statusBar"),
                value: "SYSTEM_INFO_ONLY".into()
            }
        );
    }

    #[test]
    fn add_record_with_fields() {
        let document = PolicyDocument::from_value(json!({"applications": [{"packageName": "a"}]})).unwrap();
        let edits = for_add(
            registry(),
            &document,
            path("applications"),
            Some(r#"{"packageName": "com.example", "installType": "AVAILABLE"}"#),
        )
        .unwrap();
        assert_eq!(edits.len(), 3);
        assert_eq!(edits[0], Edit::AddRow { path: path("applications") });
        assert_eq!(
            edits[1],
            Edit::SetCell {
                path: path("applications"),
                row: 1,
                field: "packageName".into(),
                value: "com.example".into()
            }
        );
    }

    #[test]
    fn add_scalar_and_blank_row() {
        let document = PolicyDocument::new();
        assert_eq!(
            for_add(registry(), &document, path("frpAdminEmails"), Some("a@example.com")).unwrap(),
            vec![Edit::AddScalar {
                path: path("frpAdminEmails"),
                value: "a@example.com".into()
            }]
        );
        assert_eq!(
            for_add(registry(), &document, path("setupActions"), None).unwrap(),
            vec![Edit::AddRow { path: path("setupActions") }]
        );
        assert!(matches!(
            for_add(registry(), &document, path("frpAdminEmails"), None),
            Err(ArgError::MissingItem(_))
        ));
    }

    #[test]
    fn remove_picks_row_or_item() {
        assert_eq!(
            for_remove(registry(), path("applications"), 2),
            Edit::RemoveRow {
                path: path("applications"),
                index: 2
            }
        );
        assert_eq!(
            for_remove(registry(), path("wipeDataFlags"), 0),
            Edit::RemoveScalar {
                path: path("wipeDataFlags"),
                index: 0
            }
        );
    }
}
