//! The single HTTP entry point used by every client flow.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::audit::audited_resource_type;
use super::session::{CurrentUser, RedirectToLogin, SessionHandle, SignOutHook};
use crate::api::middleware::api_key::API_KEY_HEADER;
use crate::config::ClientConfig;
use crate::models::enums::AuditSource;
use crate::resources::{endpoint_name, parse_endpoint_name, EndpointOp, ResourceKind};

/// Errors surfaced to the UI. `Display` is the banner text.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(String),
    #[error("Your session has ended. Please sign in again.")]
    SignedOut,
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("{0}")]
    Validation(String),
    #[error("{endpoint} is unavailable: {message}")]
    Unavailable { endpoint: String, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::SignedOut => Some(401),
            _ => None,
        }
    }
}

/// A named endpoint (`get_patients`, `update_labs`, ...) plus its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    name: String,
    op: EndpointOp,
    kind: ResourceKind,
    id: Option<String>,
    patient_id: Option<Uuid>,
}

impl Endpoint {
    pub fn parse(name: &str) -> Result<Self, ClientError> {
        let (op, kind) = parse_endpoint_name(name)
            .ok_or_else(|| ClientError::Validation(format!("Unknown endpoint {name}")))?;
        Ok(Self::new(op, kind))
    }

    pub fn new(op: EndpointOp, kind: ResourceKind) -> Self {
        Self {
            name: endpoint_name(op, kind),
            op,
            kind,
            id: None,
            patient_id: None,
        }
    }

    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Restrict a list fetch to one patient.
    pub fn for_patient(mut self, patient_id: Uuid) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn op(&self) -> EndpointOp {
        self.op
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn method(&self) -> Method {
        match self.op {
            EndpointOp::Get => Method::GET,
            EndpointOp::Create => Method::POST,
            EndpointOp::Update => Method::PUT,
            EndpointOp::Delete => Method::DELETE,
        }
    }

    /// Path under the base URL. Update and delete need an id.
    pub fn path(&self) -> Result<String, ClientError> {
        let base = format!("/api/{}", self.kind.slug());
        let path = match (self.op, &self.id) {
            (EndpointOp::Create, _) => base,
            (EndpointOp::Get, None) => match self.patient_id {
                Some(patient) if self.kind.is_patient_scoped() => {
                    format!("{base}?patient_id={patient}")
                }
                _ => base,
            },
            (_, Some(id)) if is_path_segment(id) => format!("{base}/{id}"),
            (_, Some(id)) => {
                return Err(ClientError::Validation(format!("Invalid record id {id:?}")))
            }
            (_, None) => {
                return Err(ClientError::Validation(format!("{} needs a record id", self.name)))
            }
        };
        Ok(path)
    }
}

/// Record ids are UUIDs; anything that would leave its path segment is refused.
fn is_path_segment(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct SignInResponse {
    token: String,
    user: CurrentUser,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    session: SessionHandle,
    on_sign_out: Arc<dyn SignOutHook>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: SessionHandle) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let hook = RedirectToLogin {
            login_route: config.login_route.clone(),
        };
        Ok(Self {
            http,
            config: Arc::new(config),
            session,
            on_sign_out: Arc::new(hook),
        })
    }

    pub fn with_sign_out_hook(mut self, hook: Arc<dyn SignOutHook>) -> Self {
        self.on_sign_out = hook;
        self
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(API_KEY_HEADER, &self.config.api_key);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Exchange credentials for a session token and store it.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<CurrentUser, ClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/sign_in"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        let signed_in: SignInResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        self.session.establish(signed_in.token, Some(signed_in.user.clone()));
        tracing::info!(user_id = %signed_in.user.id, "Client signed in");
        Ok(signed_in.user)
    }

    /// Revoke the token server-side (best effort) and clear the session.
    pub async fn sign_out(&self) {
        if self.session.is_signed_in() {
            let result = self.request(Method::POST, "/api/auth/sign_out").send().await;
            if let Err(e) = result {
                tracing::warn!("Sign-out request failed: {e}");
            }
        }
        self.session.sign_out();
    }

    /// Send one request for `endpoint` and return the decoded JSON body.
    pub async fn call(&self, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value, ClientError> {
        let path = endpoint.path()?;
        let mut builder = self.request(endpoint.method(), &path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(endpoint = endpoint.name(), "Session rejected; signing out");
            self.session.sign_out();
            self.on_sign_out.on_sign_out(&self.session);
            return Err(ClientError::SignedOut);
        }
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if let Some(resource_type) = audited_resource_type(endpoint.name()) {
            self.spawn_audit(endpoint, resource_type, &value);
        }
        Ok(value)
    }

    /// Fire-and-forget audit record for a successful PHI call.
    fn spawn_audit(&self, endpoint: &Endpoint, resource_type: &'static str, response: &Value) {
        let resource_id = endpoint
            .id()
            .map(str::to_string)
            .or_else(|| response.get("id").and_then(Value::as_str).map(str::to_string));
        let entry = json!({
            "source": AuditSource::Client,
            "action": endpoint.op().audit_action(),
            "resource_type": resource_type,
            "resource_id": resource_id,
            "patient_id": self.session.selected_patient(),
            "detail": endpoint.name(),
        });
        let request = self
            .request(Method::POST, "/api/audit_logs")
            .json(&entry);
        let name = endpoint.name().to_string();

        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    tracing::warn!(endpoint = %name, status = resp.status().as_u16(), "Audit call rejected");
                }
                Err(e) => tracing::warn!(endpoint = %name, "Audit call failed: {e}"),
            }
        });
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> ClientError {
    let fallback_message = status.canonical_reason().unwrap_or("Request failed").to_string();
    match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => ClientError::Api {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: format!("HTTP_{}", status.as_u16()),
            message: fallback_message,
        },
    }
}
