//! Default Catalyst Center client over reqwest.
//!
//! Implements [`SwimBackend`] against the controller's intent API. The
//! [`TransportContext`] (base URL, token, TLS verification) is built once per
//! run and never refreshed; an expired token simply surfaces as failed calls.
//!
//! # Quick Start
//!
//! ```ignore
//! use swim_purge::{CatalystClient, Credentials, PurgeWorkflow, WorkflowConfig};
//!
//! let client = CatalystClient::connect(
//!     "https://catalyst.example.net",
//!     Credentials::Password { username: "admin".into(), password: "secret".into() },
//!     true,
//! ).await?;
//! let workflow = PurgeWorkflow::new(&client, WorkflowConfig::default());
//! ```

use crate::backend::SwimBackend;
use crate::error::SwimError;
use crate::types::{
    is_empty_wrapper, ApiResponse, GoldenScope, InventoryQuery, RawRecord, TaskStatus,
};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info};

const AUTH_PATH: &str = "/dna/system/api/v1/auth/token";
const INVENTORY_PATH: &str = "/dna/intent/api/v1/image/importation";
const TASK_PATH: &str = "/dna/intent/api/v1/task";
const AUTH_HEADER: &str = "X-Auth-Token";

/// How to authenticate.
#[derive(Clone)]
pub enum Credentials {
    /// Use an existing `X-Auth-Token`.
    Token(String),
    /// Exchange username/password for a token.
    Password { username: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(..)"),
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Per-run transport settings shared read-only by every call.
#[derive(Clone)]
pub struct TransportContext {
    pub base_url: String,
    pub token: String,
    pub verify_tls: bool,
}

impl TransportContext {
    pub fn new(base_url: &str, token: impl Into<String>, verify_tls: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            verify_tls,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Catalyst Center client implementing [`SwimBackend`].
pub struct CatalystClient {
    http: reqwest::Client,
    ctx: TransportContext,
}

fn build_http(verify_tls: bool) -> Result<reqwest::Client, SwimError> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|e| SwimError::Config(format!("failed to create HTTP client: {}", e)))
}

fn transport(e: reqwest::Error) -> SwimError {
    SwimError::Transport(e.to_string())
}

/// Pull the interesting payload out of `{"response": ...}`, falling back to
/// the body itself when the wrapper is missing or empty.
fn unwrap_response(body: Value) -> Value {
    match body {
        Value::Object(map) => match map.get("response") {
            Some(inner) if !is_empty_wrapper(inner) => inner.clone(),
            _ => Value::Object(map),
        },
        other => other,
    }
}

/// Parse an inventory payload into raw records.
pub fn parse_inventory(body: Value) -> Result<Vec<RawRecord>, SwimError> {
    match unwrap_response(body) {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        other => Err(SwimError::Decode(format!(
            "expected an image list, got {}",
            other
        ))),
    }
}

impl CatalystClient {
    /// Authenticate and build a client. Authentication failure is fatal.
    pub async fn connect(
        base_url: &str,
        credentials: Credentials,
        verify_tls: bool,
    ) -> Result<Self, SwimError> {
        let http = build_http(verify_tls)?;
        let token = match credentials {
            Credentials::Token(token) => token,
            Credentials::Password { username, password } => {
                login(&http, base_url.trim_end_matches('/'), &username, &password).await?
            }
        };
        Ok(Self {
            http,
            ctx: TransportContext::new(base_url, token, verify_tls),
        })
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, SwimError> {
        let response = self
            .http
            .delete(self.ctx.url(path))
            .header(AUTH_HEADER, &self.ctx.token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        debug!(path, status, "DELETE");
        Ok(ApiResponse::from_body(status, body))
    }
}

async fn login(
    http: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String, SwimError> {
    let response = http
        .post(format!("{}{}", base_url, AUTH_PATH))
        .basic_auth(username, Some(password))
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(|e| SwimError::Auth(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read response".to_string());
    if status != StatusCode::OK && status != StatusCode::CREATED {
        return Err(SwimError::Auth(format!("{}: {}", status.as_u16(), body)));
    }

    let parsed: Value = serde_json::from_str(&body)
        .map_err(|e| SwimError::Auth(format!("unreadable token response: {}", e)))?;
    let token = parsed
        .get("Token")
        .or_else(|| parsed.get("token"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SwimError::Auth("auth succeeded but no token in response".into()))?;
    info!(user = username, "authenticated");
    Ok(token.to_string())
}

impl SwimBackend for CatalystClient {
    async fn list_inventory(&self, query: &InventoryQuery) -> Result<Vec<RawRecord>, SwimError> {
        let response = self
            .http
            .get(self.ctx.url(INVENTORY_PATH))
            .header(AUTH_HEADER, &self.ctx.token)
            .query(&query.params())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response".to_string());
            return Err(SwimError::Inventory {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SwimError::Decode(format!("image list: {}", e)))?;
        let records = parse_inventory(body)?;
        info!(count = records.len(), "fetched image inventory");
        Ok(records)
    }

    async fn delete_by_path(&self, path: &str) -> Result<ApiResponse, SwimError> {
        self.delete(path).await
    }

    async fn remove_golden_tag(
        &self,
        scope: &GoldenScope,
        image_id: &str,
    ) -> Result<ApiResponse, SwimError> {
        let path = format!(
            "{}/golden/site/{}/family/{}/role/{}/image/{}",
            INVENTORY_PATH,
            scope.site_id,
            scope.device_family_identifier,
            scope.device_role,
            image_id
        );
        self.delete(&path).await
    }

    async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus, SwimError> {
        let response = self
            .http
            .get(self.ctx.url(&format!("{}/{}", TASK_PATH, task_id)))
            .header(AUTH_HEADER, &self.ctx.token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if status != StatusCode::OK {
            return Err(SwimError::TaskQuery {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| SwimError::Decode(format!("task {}: {}", task_id, e)))?;
        Ok(TaskStatus::from_json(parsed))
    }
}
