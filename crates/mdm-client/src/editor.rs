//! Policy editor view-model
//!
//! Owns the document shown in the policy view together with its loading,
//! saving and message flags. Failures never discard the loaded document.

use mdm_policy::{Edit, FieldBinder, Form, PolicyDocument, PolicyError, SchemaRegistry};

use crate::api::PolicyBackend;
use crate::error::ClientError;
use crate::gateway::{ContextKey, Saved, SyncGateway};

/// Message shown after a successful save
pub const SAVE_SUCCESS: &str = "Policy updated successfully!";

/// Placeholder shown when the user has no enterprise
pub const NO_ENTERPRISE: &str = "No enterprise found for this user.";

/// Flags and inline messages of the policy view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorStatus {
    /// A load is outstanding
    pub loading: bool,
    /// A save is outstanding
    pub saving: bool,
    /// Last load or edit failure
    pub error: Option<String>,
    /// Last save failure
    pub save_error: Option<String>,
    /// Last save confirmation
    pub save_success: Option<String>,
}

/// Editor for one policy
#[derive(Debug)]
pub struct PolicyEditor<B> {
    gateway: SyncGateway<B>,
    key: Option<ContextKey>,
    document: PolicyDocument,
    status: EditorStatus,
}

impl<B: PolicyBackend> PolicyEditor<B> {
    /// Editor over `gateway`; without a key it only shows the placeholder
    #[must_use]
    pub fn new(gateway: SyncGateway<B>, key: Option<ContextKey>) -> Self {
        Self {
            gateway,
            key,
            document: PolicyDocument::new(),
            status: EditorStatus::default(),
        }
    }

    /// Current document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Current flags and messages
    #[inline]
    #[must_use]
    pub fn status(&self) -> &EditorStatus {
        &self.status
    }

    /// Text shown instead of the form when there is no enterprise
    #[must_use]
    pub fn placeholder(&self) -> Option<&'static str> {
        self.key.is_none().then_some(NO_ENTERPRISE)
    }

    /// Whether the submit control is enabled
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.key.is_some() && !self.status.saving && !self.status.loading
    }

    /// Controls for the current document
    #[must_use]
    pub fn form(&self) -> Form<'static> {
        FieldBinder::render(SchemaRegistry::standard(), &self.document)
    }

    /// Load the policy; on failure the previous document stays
    ///
    /// # Errors
    /// - `ClientError::MissingEnterprise` without a context key
    /// - any load error, also recorded in `status().error`
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let Some(key) = &self.key else {
            return Err(ClientError::MissingEnterprise);
        };
        self.status.loading = true;
        self.status.error = None;
        let result = self.gateway.load(key).await;
        self.status.loading = false;

        match result {
            Ok(document) => {
                self.document = document;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Policy load failed: {}", e);
                self.status.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Apply a user edit locally
    ///
    /// # Errors
    /// Returns the store error, also recorded in `status().error`
    pub fn edit(&mut self, edit: Edit) -> Result<(), PolicyError> {
        match FieldBinder::apply(&self.document, edit) {
            Ok(document) => {
                self.document = document;
                self.status.error = None;
                Ok(())
            }
            Err(e) => {
                self.status.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Submit the document; on success it is replaced by the reloaded one
    ///
    /// Once the write is accepted the save counts as successful. A failed
    /// reload keeps the edited document and is recorded in `status().error`.
    ///
    /// # Errors
    /// - `ClientError::MissingEnterprise` without a context key
    /// - `ClientError::Busy` while another load or save is outstanding
    /// - any save error, also recorded in `status().save_error`
    pub async fn save(&mut self) -> Result<(), ClientError> {
        let Some(key) = &self.key else {
            return Err(ClientError::MissingEnterprise);
        };
        if self.status.saving || self.status.loading {
            return Err(ClientError::Busy);
        }

        self.status.saving = true;
        self.status.save_error = None;
        self.status.save_success = None;
        let result = self.gateway.save(key, &self.document).await;
        self.status.saving = false;

        match result {
            Ok(saved) => {
                self.status.save_success = Some(SAVE_SUCCESS.to_string());
                match saved {
                    Saved::Reloaded(document) => {
                        self.document = document;
                        self.status.error = None;
                    }
                    Saved::ReloadFailed(e) => self.status.error = Some(e.user_message()),
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("Policy save failed: {}", e);
                self.status.save_error = Some(e.user_message());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockPolicyBackend;
    use mdm_policy::{ControlKind, PolicyPath};
    use mdm_test_utils::{sample_policy, ENTERPRISE_NAME, POLICY_ID};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn editor(backend: MockPolicyBackend) -> PolicyEditor<MockPolicyBackend> {
        PolicyEditor::new(
            SyncGateway::new(backend, POLICY_ID),
            Some(ContextKey::new(ENTERPRISE_NAME, "token")),
        )
    }

    fn path(s: &str) -> PolicyPath {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn refresh_then_edit_and_save() {
        let mut backend = MockPolicyBackend::new();
        backend.expect_fetch_policy().returning(|_, _, _| Ok(sample_policy()));
        backend
            .expect_update_policy()
            .withf(|_, _, _, body| body["cameraDisabled"] == json!(false))
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut editor = editor(backend);
        editor.refresh().await.unwrap();
        assert_eq!(
            editor.form().control("cameraDisabled").unwrap().kind,
            ControlKind::Toggle { on: true }
        );

        editor.edit(Edit::FlipToggle { path: path("cameraDisabled") }).unwrap();
        editor.save().await.unwrap();
        assert_eq!(editor.status().save_success.as_deref(), Some(SAVE_SUCCESS));
        assert!(!editor.status().saving);
        // reload replaced the local edit with the server copy
        assert_eq!(editor.document().get(&path("cameraDisabled")), Some(&json!(true)));
    }

    #[tokio::test]
    async fn failed_save_keeps_document_and_reports() {
        let mut backend = MockPolicyBackend::new();
        backend.expect_fetch_policy().times(1).returning(|_, _, _| Ok(sample_policy()));
        backend.expect_update_policy().returning(|_, _, _, _| {
            Err(ClientError::Status {
                status: 500,
                context: "update policy",
            })
        });

        let mut editor = editor(backend);
        editor.refresh().await.unwrap();
        editor
            .edit(Edit::Select {
                path: path("passwordQuality"),
                option: "COMPLEX".into(),
            })
            .unwrap();
        let edited = editor.document().clone();

        assert!(editor.save().await.is_err());
        assert_eq!(editor.document(), &edited);
        assert_eq!(editor.status().save_error.as_deref(), Some("Failed to update policy"));
        assert_eq!(editor.status().save_success, None);
        assert!(editor.can_submit());
    }

    #[tokio::test]
    async fn accepted_write_with_failed_reload_still_succeeds() {
        let mut backend = MockPolicyBackend::new();
        let mut calls = 0;
        backend.expect_fetch_policy().times(2).returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Ok(sample_policy())
            } else {
                Err(ClientError::Status {
                    status: 503,
                    context: "fetch policy",
                })
            }
        });
        backend.expect_update_policy().times(1).returning(|_, _, _, _| Ok(()));

        let mut editor = editor(backend);
        editor.refresh().await.unwrap();
        editor.edit(Edit::FlipToggle { path: path("cameraDisabled") }).unwrap();
        let edited = editor.document().clone();

        editor.save().await.unwrap();
        assert_eq!(editor.status().save_success.as_deref(), Some(SAVE_SUCCESS));
        assert_eq!(editor.status().save_error, None);
        assert_eq!(editor.status().error.as_deref(), Some("Failed to fetch policy"));
        assert_eq!(editor.document(), &edited);
        assert!(editor.can_submit());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_document() {
        let mut backend = MockPolicyBackend::new();
        let mut calls = 0;
        backend.expect_fetch_policy().times(2).returning(move |_, _, _| {
            calls += 1;
            if calls == 1 {
                Ok(sample_policy())
            } else {
                Err(ClientError::Status {
                    status: 502,
                    context: "fetch policy",
                })
            }
        });

        let mut editor = editor(backend);
        editor.refresh().await.unwrap();
        let loaded = editor.document().clone();
        assert!(editor.refresh().await.is_err());
        assert_eq!(editor.document(), &loaded);
        assert_eq!(editor.status().error.as_deref(), Some("Failed to fetch policy"));
        assert!(!editor.status().loading);
    }

    #[test]
    fn failed_edit_records_error() {
        let mut editor = editor(MockPolicyBackend::new());
        editor
            .edit(Edit::SetText {
                path: path("name"),
                value: "x".into(),
            })
            .unwrap();
        assert!(editor.edit(Edit::AddRow { path: path("name") }).is_err());
        assert!(editor.status().error.is_some());
        assert_eq!(editor.document().get(&path("name")), Some(&json!("x")));
    }

    #[tokio::test]
    async fn no_enterprise_shows_placeholder() {
        let mut editor = PolicyEditor::new(SyncGateway::new(MockPolicyBackend::new(), POLICY_ID), None);
        assert_eq!(editor.placeholder(), Some(NO_ENTERPRISE));
        assert!(!editor.can_submit());
        assert!(matches!(editor.refresh().await, Err(ClientError::MissingEnterprise)));
        assert!(matches!(editor.save().await, Err(ClientError::MissingEnterprise)));
    }
}
