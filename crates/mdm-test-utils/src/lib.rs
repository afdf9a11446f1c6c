//! Testing utilities for the MDM console workspace
//!
//! Shared fixtures: a realistic policy document, unsigned JWTs and sample
//! backend listings.

#![allow(missing_docs)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};

pub const ENTERPRISE_NAME: &str = "enterprises/LC02gl8uah";
pub const POLICY_ID: &str = "policy1";

/// Policy as returned by the backend, including a field the console does
/// not edit (`kioskCustomization`)
pub fn sample_policy() -> Value {
    json!({
        "name": "enterprises/LC02gl8uah/policies/policy1",
        "version": "32",
        "screenCaptureDisabled": false,
        "cameraDisabled": true,
        "factoryResetDisabled": true,
        "passwordQuality": "NUMERIC",
        "wifiConfigType": "WPA2",
        "defaultPermissionPolicy": "PROMPT",
        "advancedSecurityOverrides": {
            "developerSettings": "DEVELOPER_SETTINGS_ALLOWED"
        },
        "statusReportingSettings": {
            "applicationReportsEnabled": true
        },
        "keyguardDisabledFeatures": ["CAMERA", "NOTIFICATIONS"],
        "frpAdminEmails": ["admin@example.com"],
        "applications": [
            {
                "packageName": "com.spotify.music",
                "installType": "FORCE_INSTALLED",
                "defaultPermissionPolicy": "GRANT"
            },
            {
                "packageName": "com.android.chrome",
                "installType": "AVAILABLE"
            }
        ],
        "kioskCustomization": {
            "statusBar": "SYSTEM_INFO_ONLY",
            "deviceSettings": "SETTINGS_ACCESS_ALLOWED"
        }
    })
}

pub fn sample_policy_json() -> String {
    sample_policy().to_string()
}

/// Unsigned JWT whose payload carries `role` and a subject
pub fn make_jwt(role: &str) -> String {
    make_jwt_with_claims(&json!({
        "sub": "admin@example.com",
        "role": role,
        "exp": 4_102_444_800_u64
    }))
}

/// Unsigned JWT with an arbitrary payload
pub fn make_jwt_with_claims(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.signature")
}

pub fn sample_orgs() -> Value {
    json!([
        {
            "id": 1,
            "name": "Acme Corp",
            "enterpriseName": ENTERPRISE_NAME,
            "enterpriseId": "LC02gl8uah",
            "createdAt": "2024-03-01T10:00:00Z"
        },
        {
            "id": 2,
            "name": "Globex",
            "enterpriseName": "enterprises/LC04xx91ab",
            "enterpriseId": "LC04xx91ab"
        }
    ])
}

pub fn sample_devices() -> Value {
    json!([
        {
            "name": "enterprises/LC02gl8uah/devices/3a1f",
            "serialNumber": "R58N123ABC",
            "state": "ACTIVE",
            "appliedState": "ACTIVE",
            "policyName": "enterprises/LC02gl8uah/policies/policy1",
            "lastStatusReportTime": "2024-05-10T08:15:00Z",
            "hardwareInfo": {"brand": "samsung", "model": "SM-A515F"}
        }
    ])
}

pub fn sample_employees() -> Value {
    json!([
        {
            "id": 7,
            "name": "Jane Doe",
            "email": "jane@example.com",
            "devices": [{"id": 11, "serialNumber": "R58N123ABC"}]
        }
    ])
}
