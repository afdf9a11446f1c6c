//! Sync gateway between the policy store and the backend
//!
//! Loads are keyed by enterprise and token. Saves write the whole document
//! and then reload it, so the caller sees server-side normalization.
//! Nothing is retried.

use std::fmt;

use mdm_policy::{PolicyDocument, PolicyError};

use crate::api::{Organization, PolicyBackend};
use crate::error::ClientError;
use crate::session::SessionContext;

/// Enterprise and credential a policy is read and written under
#[derive(Clone, PartialEq, Eq)]
pub struct ContextKey {
    /// Enterprise resource name
    pub enterprise_name: String,
    token: String,
}

impl ContextKey {
    /// Create from parts
    #[must_use]
    pub fn new(enterprise_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            enterprise_name: enterprise_name.into(),
            token: token.into(),
        }
    }

    /// Derive from the user's organization and the active session
    ///
    /// # Errors
    /// - `ClientError::MissingEnterprise` if the organization has no enterprise
    /// - `ClientError::NotAuthenticated` if no session is active
    pub fn from_session(org: &Organization, session: &SessionContext) -> Result<Self, ClientError> {
        let enterprise = org.enterprise().ok_or(ClientError::MissingEnterprise)?;
        let token = session.token().ok_or(ClientError::NotAuthenticated)?;
        Ok(Self::new(enterprise, token))
    }

    /// Bearer token
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextKey")
            .field("enterprise_name", &self.enterprise_name)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Loads and saves one named policy
#[derive(Debug, Clone)]
pub struct SyncGateway<B> {
    backend: B,
    policy_id: String,
}

impl<B: PolicyBackend> SyncGateway<B> {
    /// Gateway for `policy_id`
    #[must_use]
    pub fn new(backend: B, policy_id: impl Into<String>) -> Self {
        Self {
            backend,
            policy_id: policy_id.into(),
        }
    }

    /// Policy this gateway reads and writes
    #[inline]
    #[must_use]
    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    /// Underlying backend
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch the policy
    ///
    /// # Errors
    /// - `ClientError::Status` on a non-2xx status
    /// - `ClientError::Policy` if the body is not a JSON object
    pub async fn load(&self, key: &ContextKey) -> Result<PolicyDocument, ClientError> {
        let value = self
            .backend
            .fetch_policy(&key.enterprise_name, &self.policy_id, &key.token)
            .await?;
        if !value.is_object() {
            let found = if value.is_array() { "array" } else { "non-object value" };
            return Err(PolicyError::NotAMapping(found).into());
        }
        let document = PolicyDocument::from_value(value)?;
        tracing::debug!(
            "Loaded policy {} with {} unedited fields",
            self.policy_id,
            document.extra_keys().count()
        );
        Ok(document)
    }

    /// Write the policy, then reload it
    ///
    /// A reload failure does not undo the accepted write; it is reported
    /// as [`Saved::ReloadFailed`].
    ///
    /// # Errors
    /// Returns the write error
    pub async fn save(&self, key: &ContextKey, document: &PolicyDocument) -> Result<Saved, ClientError> {
        let body = document.to_value();
        self.backend
            .update_policy(&key.enterprise_name, &self.policy_id, &key.token, &body)
            .await?;
        tracing::info!("Policy {} written for {}", self.policy_id, key.enterprise_name);

        Ok(match self.load(key).await {
            Ok(document) => Saved::Reloaded(document),
            Err(e) => {
                tracing::warn!("Reload after save failed: {}", e);
                Saved::ReloadFailed(e)
            }
        })
    }
}

/// Outcome of an accepted write
#[derive(Debug)]
pub enum Saved {
    /// Server copy read back after the write
    Reloaded(PolicyDocument),
    /// The write was accepted but reading it back failed
    ReloadFailed(ClientError),
}

impl Saved {
    /// Reloaded document, if the read-back succeeded
    #[must_use]
    pub fn document(self) -> Option<PolicyDocument> {
        match self {
            Self::Reloaded(document) => Some(document),
            Self::ReloadFailed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockPolicyBackend;
    use crate::error::ErrorKind;
    use mdm_test_utils::{make_jwt, sample_policy, ENTERPRISE_NAME, POLICY_ID};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key() -> ContextKey {
        ContextKey::new(ENTERPRISE_NAME, "token")
    }

    #[tokio::test]
    async fn load_parses_object_body() {
        let mut backend = MockPolicyBackend::new();
        backend
            .expect_fetch_policy()
            .withf(|enterprise, policy, token| enterprise == ENTERPRISE_NAME && policy == POLICY_ID && token == "token")
            .times(1)
            .returning(|_, _, _| Ok(sample_policy()));

        let gateway = SyncGateway::new(backend, POLICY_ID);
        let document = gateway.load(&key()).await.unwrap();
        assert_eq!(document.to_value(), sample_policy());
    }

    #[tokio::test]
    async fn load_rejects_non_object() {
        let mut backend = MockPolicyBackend::new();
        backend.expect_fetch_policy().returning(|_, _, _| Ok(json!([1, 2])));

        let err = SyncGateway::new(backend, POLICY_ID).load(&key()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[tokio::test]
    async fn load_surfaces_status() {
        let mut backend = MockPolicyBackend::new();
        backend.expect_fetch_policy().returning(|_, _, _| {
            Err(ClientError::Status {
                status: 404,
                context: "fetch policy",
            })
        });

        let err = SyncGateway::new(backend, POLICY_ID).load(&key()).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.user_message(), "Failed to fetch policy");
    }

    #[tokio::test]
    async fn save_writes_then_reloads() {
        let mut backend = MockPolicyBackend::new();
        let mut sequence = mockall::Sequence::new();
        backend
            .expect_update_policy()
            .withf(|_, _, _, body| body["cameraDisabled"] == json!(false) && body["kioskCustomization"].is_object())
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _, _| Ok(()));
        backend
            .expect_fetch_policy()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(json!({"cameraDisabled": false, "version": "33"})));

        let document = PolicyDocument::from_value(sample_policy())
            .unwrap()
            .set(&"cameraDisabled".parse().unwrap(), json!(false))
            .unwrap();
        let reloaded = SyncGateway::new(backend, POLICY_ID)
            .save(&key(), &document)
            .await
            .unwrap()
            .document()
            .unwrap();
        assert_eq!(reloaded.to_value(), json!({"cameraDisabled": false, "version": "33"}));
    }

    #[tokio::test]
    async fn reload_failure_after_write_is_not_a_save_failure() {
        let mut backend = MockPolicyBackend::new();
        backend.expect_update_policy().times(1).returning(|_, _, _, _| Ok(()));
        backend.expect_fetch_policy().times(1).returning(|_, _, _| {
            Err(ClientError::Status {
                status: 503,
                context: "fetch policy",
            })
        });

        let saved = SyncGateway::new(backend, POLICY_ID)
            .save(&key(), &PolicyDocument::new())
            .await
            .unwrap();
        match saved {
            Saved::ReloadFailed(e) => assert_eq!(e.status(), Some(503)),
            Saved::Reloaded(_) => panic!("reload should have failed"),
        }
    }

    #[tokio::test]
    async fn failed_save_does_not_reload() {
        let mut backend = MockPolicyBackend::new();
        backend.expect_update_policy().returning(|_, _, _, _| {
            Err(ClientError::Status {
                status: 500,
                context: "update policy",
            })
        });
        backend.expect_fetch_policy().never();

        let err = SyncGateway::new(backend, POLICY_ID)
            .save(&key(), &PolicyDocument::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn key_from_session_requires_enterprise_and_token() {
        let session = SessionContext::in_memory();
        let org = Organization {
            enterprise_name: Some(ENTERPRISE_NAME.into()),
            ..Organization::default()
        };
        assert!(matches!(
            ContextKey::from_session(&org, &session),
            Err(ClientError::NotAuthenticated)
        ));

        session.establish(make_jwt("ADMIN")).unwrap();
        let key = ContextKey::from_session(&org, &session).unwrap();
        assert_eq!(key.enterprise_name, ENTERPRISE_NAME);
        assert!(!format!("{key:?}").contains(key.token()));

        let err = ContextKey::from_session(&Organization::default(), &session).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationGap);
    }
}
