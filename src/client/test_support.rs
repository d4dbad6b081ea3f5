//! Stub servers that record what the client sends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::Value;

use super::http::ApiClient;
use super::session::SessionHandle;
use crate::config::ClientConfig;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub api_key: Option<String>,
    pub body: Option<Value>,
}

type Responder = dyn Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync;

#[derive(Clone)]
struct StubState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    respond: Arc<Responder>,
}

pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (StatusCode, Value) + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            requests: requests.clone(),
            respond: Arc::new(respond),
        };
        let app = Router::new().fallback(record).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Poll until a request for `path` arrives (spawned calls land late).
    pub async fn wait_for_path(&self, path: &str) -> Option<RecordedRequest> {
        for _ in 0..50 {
            let found = self.requests().into_iter().find(|r| r.path == path);
            if found.is_some() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

async fn record(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let request = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        api_key: header("x-api-key"),
        body: serde_json::from_slice(&body).ok(),
    };
    let (status, value) = (state.respond)(&request);
    state.requests.lock().unwrap().push(request);
    (status, Json(value))
}

/// Client pointed at a stub server, with an optional session token.
pub fn stub_client(stub: &StubServer, token: Option<&str>) -> ApiClient {
    client_for(&stub.base_url, "stub-key", token)
}

pub fn client_for(base_url: &str, api_key: &str, token: Option<&str>) -> ApiClient {
    let session = match token {
        Some(token) => SessionHandle::with_token(token),
        None => SessionHandle::new(),
    };
    ApiClient::new(ClientConfig::new(base_url, api_key), session).unwrap()
}
