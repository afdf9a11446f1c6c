//! Plain-text rendering of backend listings

use chrono::{DateTime, Utc};
use mdm_client::{Device, Employee, GeoLocation, Organization};
use serde_json::Value;

/// Shown for an empty organization listing
pub const NO_DATA: &str = "No data found.";
/// Shown for an empty device listing
pub const NO_DEVICES: &str = "No devices found.";
/// Shown for an empty employee listing
pub const NO_EMPLOYEES: &str = "No employees found.";
/// Shown when a device has no known location
pub const NO_LOCATION: &str = "Location not available.";

/// Left-aligned table with a header rule
#[must_use]
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![line(headers.to_vec()), line(rule.iter().map(String::as_str).collect())];
    out.extend(rows.iter().map(|row| line(row.iter().map(String::as_str).collect())));
    out.join("\n")
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn id_text(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Organizations table
#[must_use]
pub fn organizations(orgs: &[Organization]) -> String {
    if orgs.is_empty() {
        return NO_DATA.to_string();
    }
    let rows: Vec<_> = orgs
        .iter()
        .map(|o| {
            vec![
                id_text(o.id.as_ref()),
                o.name.clone(),
                text(o.enterprise()),
                text(o.enterprise_id.as_deref()),
            ]
        })
        .collect();
    table(&["ID", "NAME", "ENTERPRISE", "ENTERPRISE ID"], &rows)
}

/// Single organization summary
#[must_use]
pub fn organization(org: &Organization) -> String {
    format!(
        "Organization: {}\nEnterprise:   {}\nEnterprise ID: {}",
        org.name,
        text(org.enterprise()),
        text(org.enterprise_id.as_deref())
    )
}

fn short_time(raw: Option<&str>) -> String {
    raw.map_or_else(
        || "-".to_string(),
        |s| {
            s.parse::<DateTime<Utc>>()
                .map_or_else(|_| s.to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        },
    )
}

/// Device inventory table
#[must_use]
pub fn devices(devices: &[Device]) -> String {
    if devices.is_empty() {
        return NO_DEVICES.to_string();
    }
    let rows: Vec<_> = devices
        .iter()
        .map(|d| {
            vec![
                text(d.serial_number.as_deref()),
                text(d.state.as_deref()),
                text(d.policy_name.as_deref().and_then(|p| p.rsplit('/').next())),
                short_time(d.last_status_report_time.as_deref()),
                text(d.name.as_deref()),
            ]
        })
        .collect();
    table(&["SERIAL", "STATE", "POLICY", "LAST REPORT", "NAME"], &rows)
}

/// Employee table
#[must_use]
pub fn employees(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return NO_EMPLOYEES.to_string();
    }
    let rows: Vec<_> = employees
        .iter()
        .map(|e| {
            vec![
                id_text(e.id.as_ref()),
                e.name.clone(),
                text(e.email.as_deref()),
                e.devices.len().to_string(),
            ]
        })
        .collect();
    table(&["ID", "NAME", "EMAIL", "DEVICES"], &rows)
}

/// Device location line
#[must_use]
pub fn location(serial: &str, location: Option<&GeoLocation>) -> String {
    match location {
        None => NO_LOCATION.to_string(),
        Some(loc) => {
            let mut out = format!("{serial}: {:.6}, {:.6}", loc.latitude, loc.longitude);
            if let Some(accuracy) = loc.accuracy {
                out.push_str(&format!(" (±{accuracy:.0} m)"));
            }
            if let Some(at) = &loc.timestamp {
                out.push_str(&format!(" at {}", short_time(Some(at))));
            }
            out
        }
    }
}
