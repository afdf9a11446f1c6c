//! Schema registry for editable policy fields
//!
//! Provides [`SchemaRegistry`], the static declarative table of every policy
//! field the console knows how to edit.

use once_cell::sync::Lazy;

use crate::path::PolicyPath;

/// Widget kind for a policy field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Free text input
    Text,
    /// Boolean toggle
    Toggle,
    /// Single choice from `options`
    Enum,
    /// Ordered list of strings, optionally constrained to `options`
    ListOfScalar,
    /// Ordered list of records with `item_fields`
    ListOfObject,
}

/// Layout group, in rendering order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldGroup {
    /// Policy name and version
    General,
    /// Device restriction toggles
    Toggles,
    /// Enum selects
    EnumSelects,
    /// Lists of strings or enum values
    ScalarLists,
    /// Lists of records
    ObjectLists,
}

impl FieldGroup {
    /// All groups in layout order
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Toggles,
        Self::EnumSelects,
        Self::ScalarLists,
        Self::ObjectLists,
    ];

    /// Section heading
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::General => "General policy settings",
            Self::Toggles => "Device restrictions",
            Self::EnumSelects => "Settings",
            Self::ScalarLists => "Lists",
            Self::ObjectLists => "Records",
        }
    }
}

/// One schema entry
///
/// # Invariants
/// - `key` is a dotted path into the policy document
/// - `item_fields` is non-empty only for [`FieldKind::ListOfObject`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Dotted path of the field
    pub key: &'static str,
    /// Display label
    pub label: &'static str,
    /// Widget kind
    pub kind: FieldKind,
    /// Layout group
    pub group: FieldGroup,
    /// Allowed values for enums and enum lists
    pub options: &'static [&'static str],
    /// Record fields for object lists
    pub item_fields: &'static [&'static str],
    /// Help text shown next to the control
    pub info: Option<&'static str>,
}

impl FieldSchema {
    const fn base(key: &'static str, label: &'static str, kind: FieldKind, group: FieldGroup) -> Self {
        Self {
            key,
            label,
            kind,
            group,
            options: &[],
            item_fields: &[],
            info: None,
        }
    }

    /// Text input
    #[must_use]
    pub const fn text(key: &'static str, label: &'static str) -> Self {
        Self::base(key, label, FieldKind::Text, FieldGroup::General)
    }

    /// Boolean toggle with help text
    #[must_use]
    pub const fn toggle(key: &'static str, label: &'static str, info: &'static str) -> Self {
        let mut schema = Self::base(key, label, FieldKind::Toggle, FieldGroup::Toggles);
        schema.info = Some(info);
        schema
    }

    /// Single-choice select
    #[must_use]
    pub const fn select(
        key: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        let mut schema = Self::base(key, label, FieldKind::Enum, FieldGroup::EnumSelects);
        schema.options = options;
        schema
    }

    /// List of strings; empty `options` means free-form
    #[must_use]
    pub const fn scalar_list(
        key: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        let mut schema = Self::base(key, label, FieldKind::ListOfScalar, FieldGroup::ScalarLists);
        schema.options = options;
        schema
    }

    /// List of records
    #[must_use]
    pub const fn object_list(
        key: &'static str,
        label: &'static str,
        item_fields: &'static [&'static str],
    ) -> Self {
        let mut schema = Self::base(key, label, FieldKind::ListOfObject, FieldGroup::ObjectLists);
        schema.item_fields = item_fields;
        schema
    }

    /// Path of the field in the document
    #[must_use]
    pub fn path(&self) -> PolicyPath {
        PolicyPath::new(self.key.split('.').map(str::to_string).collect())
    }

    /// Top-level document key owning this field
    #[must_use]
    pub fn top_level_key(&self) -> &'static str {
        self.key.split('.').next().unwrap_or(self.key)
    }
}

/// Ordered, immutable table of field schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: Vec<FieldSchema>,
}

static STANDARD: Lazy<SchemaRegistry> = Lazy::new(|| SchemaRegistry::from_entries(standard_entries()));

impl SchemaRegistry {
    /// Create registry from entries; layout order is group order, then
    /// declaration order within a group
    #[must_use]
    pub fn from_entries(mut entries: Vec<FieldSchema>) -> Self {
        entries.sort_by_key(|e| e.group);
        Self { entries }
    }

    /// The built-in Android Enterprise policy schema
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// All entries in layout order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[FieldSchema] {
        &self.entries
    }

    /// Iterate entries in layout order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FieldSchema> {
        self.entries.iter()
    }

    /// Entries of one group
    pub fn group(&self, group: FieldGroup) -> impl Iterator<Item = &FieldSchema> {
        self.entries.iter().filter(move |e| e.group == group)
    }

    /// Look up an entry by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldSchema> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Whether any entry lives under this top-level document key
    #[must_use]
    pub fn owns_top_level(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.top_level_key() == key)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Toggles split into two layout columns; the left column takes the
    /// extra entry when the count is odd
    #[must_use]
    pub fn toggle_columns(&self) -> (Vec<&FieldSchema>, Vec<&FieldSchema>) {
        let toggles: Vec<_> = self.group(FieldGroup::Toggles).collect();
        let (left, right) = split_columns(&toggles);
        (left.to_vec(), right.to_vec())
    }
}

/// Two layout columns; the left one takes the extra item
pub(crate) fn split_columns<T>(items: &[T]) -> (&[T], &[T]) {
    items.split_at(items.len().div_ceil(2))
}

const PERMISSION_POLICIES: &[&str] = &["PROMPT", "GRANT", "DENY"];

fn standard_entries() -> Vec<FieldSchema> {
    vec![
        FieldSchema::text("name", "Name"),
        FieldSchema::text("version", "Version"),
        // Device restrictions
        FieldSchema::toggle(
            "screenCaptureDisabled",
            "Screen Capture Disabled",
            "Prevents users from taking screenshots or screen recordings.",
        ),
        FieldSchema::toggle("cameraDisabled", "Camera Disabled", "Disables the device camera for all users."),
        FieldSchema::toggle("addUserDisabled", "Add User Disabled", "Prevents adding new users to the device."),
        FieldSchema::toggle(
            "factoryResetDisabled",
            "Factory Reset Disabled",
            "Prevents users from performing a factory reset.",
        ),
        FieldSchema::toggle(
            "installAppsDisabled",
            "Install Apps Disabled",
            "Blocks installation of new apps by users.",
        ),
        FieldSchema::toggle(
            "mountPhysicalMediaDisabled",
            "Mount Physical Media Disabled",
            "Prevents mounting of external storage media.",
        ),
        FieldSchema::toggle(
            "modifyAccountsDisabled",
            "Modify Accounts Disabled",
            "Prevents modification of user accounts on the device.",
        ),
        FieldSchema::toggle("safeBootDisabled", "Safe Boot Disabled", "Prevents device from booting into safe mode."),
        FieldSchema::toggle(
            "uninstallAppsDisabled",
            "Uninstall Apps Disabled",
            "Prevents users from uninstalling apps.",
        ),
        FieldSchema::toggle("vpnConfigDisabled", "VPN Config Disabled", "Prevents configuration of VPNs on the device."),
        FieldSchema::toggle("removeUserDisabled", "Remove User Disabled", "Prevents removal of users from the device."),
        FieldSchema::toggle("shareLocationDisabled", "Share Location Disabled", "Disables location sharing features."),
        FieldSchema::toggle(
            "unmuteMicrophoneDisabled",
            "Unmute Microphone Disabled",
            "Prevents users from unmuting the microphone.",
        ),
        FieldSchema::toggle("usbFileTransferDisabled", "USB File Transfer Disabled", "Blocks file transfer over USB."),
        FieldSchema::toggle(
            "ensureVerifyAppsEnabled",
            "Ensure Verify Apps Enabled",
            "Ensures Google Play Protect is enabled.",
        ),
        FieldSchema::toggle(
            "installUnknownSourcesAllowed",
            "Install Unknown Sources Allowed",
            "Allows installation of apps from unknown sources.",
        ),
        FieldSchema::toggle(
            "debuggingFeaturesAllowed",
            "Debugging Features Allowed",
            "Allows use of developer debugging features.",
        ),
        FieldSchema::toggle("usbMassStorageEnabled", "USB Mass Storage Enabled", "Enables USB mass storage mode."),
        FieldSchema::toggle(
            "statusReportingSettings.applicationReportsEnabled",
            "Application Reports Enabled",
            "Devices report installed applications.",
        ),
        FieldSchema::toggle(
            "statusReportingSettings.softwareInfoEnabled",
            "Software Info Enabled",
            "Devices report software information.",
        ),
        // Enum selects
        FieldSchema::select("passwordQuality", "Password Quality", &["ANY", "NUMERIC", "ALPHANUMERIC", "COMPLEX"]),
        FieldSchema::select("wifiConfigType", "WiFi Config Type", &["NONE", "WPA2", "WPA3"]),
        FieldSchema::select("defaultPermissionPolicy", "Default Permission Policy", PERMISSION_POLICIES),
        FieldSchema::select(
            "locationMode",
            "Location Mode",
            &["LOCATION_MODE_UNSPECIFIED", "HIGH_ACCURACY", "SENSORS_ONLY", "BATTERY_SAVING", "OFF"],
        ),
        FieldSchema::select(
            "appAutoUpdatePolicy",
            "App Auto Update Policy",
            &["AUTO_UPDATE_POLICY_UNSPECIFIED", "NEVER", "WI_FI_ONLY", "ALWAYS"],
        ),
        FieldSchema::select(
            "encryptionPolicy",
            "Encryption Policy",
            &["ENCRYPTION_POLICY_UNSPECIFIED", "ENABLED_WITHOUT_PASSWORD", "ENABLED_WITH_PASSWORD"],
        ),
        FieldSchema::select("playStoreMode", "Play Store Mode", &["WHITELIST", "BLACKLIST", "ALL_APPS"]),
        FieldSchema::select(
            "autoDateAndTimeZone",
            "Auto Date And Time Zone",
            &["AUTO_DATE_AND_TIME_ZONE_UNSPECIFIED", "AUTOMATIC", "MANUAL"],
        ),
        FieldSchema::select(
            "cameraAccess",
            "Camera Access",
            &["CAMERA_ACCESS_UNSPECIFIED", "CAMERA_ACCESS_ALLOWED", "CAMERA_ACCESS_BLOCKED"],
        ),
        FieldSchema::select(
            "microphoneAccess",
            "Microphone Access",
            &["MICROPHONE_ACCESS_UNSPECIFIED", "MICROPHONE_ACCESS_ALLOWED", "MICROPHONE_ACCESS_BLOCKED"],
        ),
        FieldSchema::select(
            "credentialProviderPolicyDefault",
            "Credential Provider Policy Default",
            &["CREDENTIAL_PROVIDER_POLICY_DEFAULT_UNSPECIFIED", "ALLOW", "DISALLOW"],
        ),
        FieldSchema::select("printingPolicy", "Printing Policy", &["PRINTING_POLICY_UNSPECIFIED", "ALLOW", "DISALLOW"]),
        FieldSchema::select(
            "assistContentPolicy",
            "Assist Content Policy",
            &["ASSIST_CONTENT_POLICY_UNSPECIFIED", "ALLOW", "DISALLOW"],
        ),
        FieldSchema::select(
            "preferentialNetworkService",
            "Preferential Network Service",
            &["PREFERENTIAL_NETWORK_SERVICE_UNSPECIFIED", "CELLULAR", "WIFI"],
        ),
        FieldSchema::select(
            "enterpriseDisplayNameVisibility",
            "Enterprise Display Name Visibility",
            &["ENTERPRISE_DISPLAY_NAME_VISIBILITY_UNSPECIFIED", "ALWAYS", "NEVER"],
        ),
        FieldSchema::select(
            "advancedSecurityOverrides.developerSettings",
            "Developer Settings",
            &["DEVELOPER_SETTINGS_USER_CHOICE", "DEVELOPER_SETTINGS_ALLOWED", "DEVELOPER_SETTINGS_DISABLED"],
        ),
        FieldSchema::select(
            "advancedSecurityOverrides.googlePlayProtectVerifyApps",
            "Play Protect",
            &["VERIFY_APPS_USER_CHOICE", "VERIFY_APPS_ENFORCE", "VERIFY_APPS_DISABLED"],
        ),
        FieldSchema::select(
            "advancedSecurityOverrides.untrustedAppsPolicy",
            "Untrusted Apps",
            &["DISALLOW_INSTALL", "ALLOW_INSTALL_DEVICE_WIDE", "ALLOW_INSTALL_IN_PERSONAL_PROFILE_ONLY"],
        ),
        // Lists of enums and strings
        FieldSchema::scalar_list(
            "keyguardDisabledFeatures",
            "Keyguard Disabled Features",
            &[
                "FEATURE_UNSPECIFIED",
                "CAMERA",
                "NOTIFICATIONS",
                "UNREDACTED_NOTIFICATIONS",
                "TRUST_AGENTS",
                "FINGERPRINT",
                "REMOTE_INPUT",
                "SAFE_BOOT",
                "ALL_FEATURES",
            ],
        ),
        FieldSchema::scalar_list(
            "stayOnPluggedModes",
            "Stay On Plugged Modes",
            &["BATTERY_PLUGGED_MODE_UNSPECIFIED", "AC", "USB", "WIRELESS"],
        ),
        FieldSchema::scalar_list(
            "androidDevicePolicyTracks",
            "Android Device Policy Tracks",
            &["APP_TRACK_UNSPECIFIED", "PRODUCTION", "BETA", "DEV"],
        ),
        FieldSchema::scalar_list(
            "wipeDataFlags",
            "Wipe Data Flags",
            &[
                "WIPE_DATA_FLAG_UNSPECIFIED",
                "PRESERVE_RESET_PROTECTION_DATA",
                "WIPE_EXTERNAL_STORAGE",
                "WIPE_ESIM",
            ],
        ),
        FieldSchema::scalar_list("frpAdminEmails", "FRP Admin Emails", &[]),
        FieldSchema::scalar_list(
            "accountTypesWithManagementDisabled",
            "Account Types With Management Disabled",
            &[],
        ),
        // Lists of records
        FieldSchema::object_list("permittedApps", "Permitted Apps", &["packageName", "minVersion"]),
        FieldSchema::object_list(
            "applications",
            "Applications",
            &["packageName", "installType", "defaultPermissionPolicy"],
        ),
        FieldSchema::object_list(
            "persistentPreferredActivities",
            "Persistent Preferred Activities",
            &["receiverActivity", "actions", "categories"],
        ),
        FieldSchema::object_list(
            "choosePrivateKeyRules",
            "Choose Private Key Rules",
            &["packageNames", "privateKeyAlias"],
        ),
        FieldSchema::object_list("complianceRules", "Compliance Rules", &["name", "condition", "action"]),
        FieldSchema::object_list("passwordPolicies", "Password Policies", &["passwordQuality", "minimumLength"]),
        FieldSchema::object_list("policyEnforcementRules", "Policy Enforcement Rules", &["name", "enforcementType"]),
        FieldSchema::object_list(
            "oncCertificateProviders",
            "ONC Certificate Providers",
            &["providerId", "certificate"],
        ),
        FieldSchema::object_list("setupActions", "Setup Actions", &["actionType", "description"]),
    ]
}
