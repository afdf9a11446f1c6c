//! REST client for the MDM backend
//!
//! Every call is a single attempt with the configured timeout. Paths are
//! relative to [`ClientConfig::base_url`]; authenticated calls send the
//! token as a bearer `Authorization` header.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{ClientError, ConfigError};

/// Login credentials
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful login
#[derive(Clone, PartialEq, Eq)]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse").field("token", &"<redacted>").finish()
    }
}

#[derive(Deserialize)]
struct RawLogin {
    #[serde(default)]
    token: Option<String>,
}

/// Tenant owning an enterprise
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    /// Backend id
    #[serde(default)]
    pub id: Option<Value>,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Android Enterprise resource name, e.g. `enterprises/LC02gl8uah`
    #[serde(default)]
    pub enterprise_name: Option<String>,
    /// Enterprise id used for enrollment
    #[serde(default)]
    pub enterprise_id: Option<String>,
    /// Everything else the backend sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Organization {
    /// Enterprise name, if present and non-blank
    #[must_use]
    pub fn enterprise(&self) -> Option<&str> {
        self.enterprise_name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Managed device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Resource name
    #[serde(default)]
    pub name: Option<String>,
    /// Hardware serial number
    #[serde(default)]
    pub serial_number: Option<String>,
    /// Management state
    #[serde(default)]
    pub state: Option<String>,
    /// Policy applied to the device
    #[serde(default)]
    pub policy_name: Option<String>,
    /// Last status report, RFC 3339
    #[serde(default)]
    pub last_status_report_time: Option<String>,
    /// Everything else the backend sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Employee record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Backend id
    #[serde(default)]
    pub id: Option<Value>,
    /// Full name
    #[serde(default)]
    pub name: String,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Linked devices
    #[serde(default)]
    pub devices: Vec<Value>,
    /// Everything else the backend sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Last known device position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Degrees north
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Degrees east
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    /// Accuracy radius in meters
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Report time
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Enrollment QR code image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    /// MIME type, e.g. `image/png`
    pub content_type: String,
    /// Image bytes
    pub bytes: Vec<u8>,
}

/// Policy read/write seam used by the sync gateway
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PolicyBackend: Send + Sync {
    /// Fetch the raw policy document
    async fn fetch_policy(&self, enterprise_name: &str, policy_id: &str, token: &str) -> Result<Value, ClientError>;

    /// Replace the policy document
    async fn update_policy(
        &self,
        enterprise_name: &str,
        policy_id: &str,
        token: &str,
        policy: &Value,
    ) -> Result<(), ClientError>;
}

/// MDM backend client
#[derive(Debug, Clone)]
pub struct MdmApi {
    base_url: String,
    client: Client,
}

impl MdmApi {
    /// Build a client from validated configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(config.base_url.clone(), client))
    }

    /// Build from an existing reqwest client
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// API root
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL extended by `segments`, each percent-encoded as a single
    /// path segment
    fn segment_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let invalid = || ClientError::Config(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Exchange credentials for a token
    ///
    /// # Errors
    /// - `ClientError::LoginRejected` on a non-2xx status
    /// - `ClientError::MissingToken` if the response has no token
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        tracing::debug!("POST /v1/auth/login for {}", email);
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.client.post(self.url("/v1/auth/login")).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Login rejected: {}", status);
            return Err(ClientError::LoginRejected(status.as_u16()));
        }
        let raw: RawLogin = read_json(response, "log in").await?;
        match raw.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::info!("Login succeeded for {}", email);
                Ok(LoginResponse { token })
            }
            None => Err(ClientError::MissingToken),
        }
    }

    /// All organizations (super admin)
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status or malformed body
    pub async fn list_orgs(&self, token: &str) -> Result<Vec<Organization>, ClientError> {
        let request = self.client.get(self.url("/v1/orgs")).bearer_auth(token);
        let response = send(request, "fetch organizations").await?;
        read_json(response, "fetch organizations").await
    }

    /// Organization of the signed-in user
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status or malformed body
    pub async fn my_org(&self, token: &str) -> Result<Organization, ClientError> {
        let request = self.client.get(self.url("/v1/orgs/my")).bearer_auth(token);
        let response = send(request, "fetch organization").await?;
        read_json(response, "fetch organization").await
    }

    /// Devices of an enterprise; a non-list body yields no devices
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status or malformed body
    pub async fn list_devices(&self, enterprise_name: &str, token: &str) -> Result<Vec<Device>, ClientError> {
        let request = self
            .client
            .get(self.url("/enterprise/devices"))
            .query(&[("enterpriseName", enterprise_name)])
            .bearer_auth(token);
        let response = send(request, "fetch devices").await?;
        let body: Value = read_json(response, "fetch devices").await?;
        if !body.is_array() {
            tracing::warn!("Device listing is not a list; showing none");
            return Ok(Vec::new());
        }
        serde_json::from_value(body).map_err(|source| ClientError::InvalidBody {
            context: "fetch devices",
            source,
        })
    }

    /// Request an enrollment QR code
    ///
    /// # Errors
    /// - `ClientError::NotAnImage` if the response is not an image
    /// - transport and status errors otherwise
    pub async fn enrollment_qr(
        &self,
        enterprise_id: &str,
        policy_name: &str,
        token: &str,
    ) -> Result<QrImage, ClientError> {
        let request = self
            .client
            .post(self.url("/device/onboard"))
            .query(&[("enterpriseId", enterprise_id), ("policyName", policy_name)])
            .header(ACCEPT, "image/png")
            .bearer_auth(token);
        let response = send(request, "generate QR code").await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image/") {
            return Err(ClientError::NotAnImage { content_type });
        }
        let bytes = response.bytes().await?.to_vec();
        tracing::info!("Received {} byte QR code", bytes.len());
        Ok(QrImage { content_type, bytes })
    }

    /// Raw policy document
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status or malformed body
    pub async fn fetch_policy(&self, enterprise_name: &str, policy_id: &str, token: &str) -> Result<Value, ClientError> {
        tracing::debug!("Fetching policy {} for {}", policy_id, enterprise_name);
        let request = self
            .client
            .get(self.segment_url(&["enterprise", "policy", policy_id])?)
            .query(&[("enterpriseName", enterprise_name)])
            .bearer_auth(token);
        let response = send(request, "fetch policy").await?;
        read_json(response, "fetch policy").await
    }

    /// Replace the policy document
    ///
    /// # Errors
    /// Returns error on transport failure or non-2xx status
    pub async fn update_policy(
        &self,
        enterprise_name: &str,
        policy_id: &str,
        token: &str,
        policy: &Value,
    ) -> Result<(), ClientError> {
        tracing::debug!("Updating policy {} for {}", policy_id, enterprise_name);
        let request = self
            .client
            .post(self.url("/enterprise/declare/policy"))
            .query(&[("enterpriseName", enterprise_name), ("policyId", policy_id)])
            .bearer_auth(token)
            .json(policy);
        send(request, "update policy").await?;
        tracing::info!("Policy {} updated", policy_id);
        Ok(())
    }

    /// Last known location; `None` when the backend has none or answers
    /// with something unreadable
    ///
    /// # Errors
    /// Returns error on transport failure or an unusable base URL
    pub async fn device_location(&self, serial: &str, token: &str) -> Result<Option<GeoLocation>, ClientError> {
        let response = self
            .client
            .get(self.segment_url(&["location", serial])?)
            .bearer_auth(token)
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::warn!("No location for {}: {}", serial, response.status());
            return Ok(None);
        }
        let body = response.bytes().await?;
        match serde_json::from_slice(&body) {
            Ok(location) => Ok(Some(location)),
            Err(e) => {
                tracing::warn!("Unreadable location for {}: {}", serial, e);
                Ok(None)
            }
        }
    }

    /// All employees
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status or malformed body
    pub async fn list_employees(&self, token: &str) -> Result<Vec<Employee>, ClientError> {
        let request = self.client.get(self.url("/employee/all")).bearer_auth(token);
        let response = send(request, "fetch employees").await?;
        read_json(response, "fetch employees").await
    }

    /// Attach a device to an employee
    ///
    /// # Errors
    /// Returns error on transport failure or non-2xx status
    pub async fn link_device(&self, employee_id: &str, device_id: &str, token: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .post(self.segment_url(&["employee", employee_id, "devices", device_id])?)
            .bearer_auth(token);
        send(request, "link device").await?;
        tracing::info!("Linked device {} to employee {}", device_id, employee_id);
        Ok(())
    }

    /// Detach a device from an employee
    ///
    /// # Errors
    /// Returns error on transport failure or non-2xx status
    pub async fn unlink_device(&self, employee_id: &str, device_id: &str, token: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .delete(self.segment_url(&["employee", employee_id, "devices", device_id])?)
            .bearer_auth(token);
        send(request, "unlink device").await?;
        tracing::info!("Unlinked device {} from employee {}", device_id, employee_id);
        Ok(())
    }
}

#[async_trait]
impl PolicyBackend for MdmApi {
    async fn fetch_policy(&self, enterprise_name: &str, policy_id: &str, token: &str) -> Result<Value, ClientError> {
        MdmApi::fetch_policy(self, enterprise_name, policy_id, token).await
    }

    async fn update_policy(
        &self,
        enterprise_name: &str,
        policy_id: &str,
        token: &str,
        policy: &Value,
    ) -> Result<(), ClientError> {
        MdmApi::update_policy(self, enterprise_name, policy_id, token, policy).await
    }
}

async fn send(request: RequestBuilder, context: &'static str) -> Result<Response, ClientError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        tracing::warn!("Failed to {}: {}", context, status);
        Err(ClientError::Status {
            status: status.as_u16(),
            context,
        })
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, context: &'static str) -> Result<T, ClientError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| ClientError::InvalidBody { context, source })
}
