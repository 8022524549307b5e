//! Minimal domain types for the SWIM purge workflow.
//!
//! These are the types the workflow engine needs. Nothing more.
//! Raw inventory entries stay untyped until the normalizer resolves them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An inventory entry exactly as the controller returned it.
pub type RawRecord = Map<String, Value>;

/// Canonical image descriptor, rebuilt from each inventory fetch.
///
/// Serializes to the candidate row shape shown to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "imageUuid")]
    pub id: Option<String>,
    pub name: String,
    pub version: String,
    pub family: String,
    #[serde(rename = "type")]
    pub image_type: String,
    #[serde(rename = "golden")]
    pub is_golden: bool,
    #[serde(rename = "usedCount")]
    pub used_device_count: u64,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    /// A record with only an id set; the rest defaulted.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            id: if id.is_empty() { None } else { Some(id) },
            name: String::new(),
            version: String::new(),
            family: String::new(),
            image_type: String::new(),
            is_golden: false,
            used_device_count: 0,
            created_at: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    pub fn with_type(mut self, image_type: impl Into<String>) -> Self {
        self.image_type = image_type.into();
        self
    }

    pub fn with_golden(mut self, is_golden: bool) -> Self {
        self.is_golden = is_golden;
        self
    }

    pub fn with_used_devices(mut self, count: u64) -> Self {
        self.used_device_count = count;
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Only records with a non-empty id can be acted upon.
    pub fn is_selectable(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Id for display, `-` when missing.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("-")
    }
}

/// Coarse server-side pre-filter for the inventory query.
///
/// The client-side filter is always re-applied; this only trims the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryQuery {
    pub family: Option<String>,
    pub version: Option<String>,
}

impl InventoryQuery {
    /// Query parameters in request order.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        let mut params = Vec::new();
        if let Some(family) = &self.family {
            params.push(("family", family.as_str()));
        }
        if let Some(version) = &self.version {
            params.push(("version", version.as_str()));
        }
        params
    }
}

/// Scope a golden tag applies to. All three parts are required for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenScope {
    pub site_id: String,
    pub device_family_identifier: String,
    pub device_role: String,
}

impl GoldenScope {
    /// Build a scope only if every part is present and non-empty.
    pub fn from_parts(
        site_id: Option<String>,
        device_family_identifier: Option<String>,
        device_role: Option<String>,
    ) -> Option<Self> {
        let non_empty = |s: Option<String>| s.filter(|v| !v.is_empty());
        Some(Self {
            site_id: non_empty(site_id)?,
            device_family_identifier: non_empty(device_family_identifier)?,
            device_role: non_empty(device_role)?,
        })
    }
}

/// Response to a mutating call (delete or golden removal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub task_id: Option<String>,
    pub body: String,
}

impl ApiResponse {
    /// Build from a status and raw body, picking the task handle out of
    /// `response.taskId` when the body is JSON.
    pub fn from_body(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let task_id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("response")
                    .and_then(|r| r.get("taskId"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|id| !id.is_empty());
        Self {
            status,
            task_id,
            body,
        }
    }
}

/// A `response` wrapper that carries nothing: `null` or `{}`. Callers fall
/// back to the outer body when they see one.
pub(crate) fn is_empty_wrapper(inner: &Value) -> bool {
    match inner {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// One observation of a server-side async task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatus {
    pub progress: Option<String>,
    pub is_error: bool,
    pub failure_reason: Option<String>,
    pub raw: Value,
}

impl TaskStatus {
    /// Extract status fields from a task payload. The interesting object
    /// sits under `response` on most controller versions.
    pub fn from_json(body: Value) -> Self {
        let data = match body.get("response") {
            Some(inner) if !is_empty_wrapper(inner) => inner.clone(),
            _ => body,
        };
        let progress = match data.get("progress") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        let is_error = data
            .get("isError")
            .is_some_and(crate::normalize::truthy);
        // Any non-empty reason counts, whatever its JSON type.
        let failure_reason = match data.get("failureReason") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::String(_)) | None => None,
            Some(other) if crate::normalize::truthy(other) => Some(other.to_string()),
            Some(_) => None,
        };
        Self {
            progress,
            is_error,
            failure_reason,
            raw: data,
        }
    }
}
