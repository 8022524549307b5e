//! Scripted in-memory backend shared by the integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use swim_purge::{
    ApiResponse, GoldenScope, ImageRecord, InventoryQuery, Operator, RawRecord, SwimBackend,
    SwimError, TaskStatus,
};

/// Every call the engine made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(InventoryQuery),
    Delete(String),
    RemoveGolden(String),
    Task(String),
}

type Scripted<T> = VecDeque<Result<T, SwimError>>;

/// Backend whose responses are queued up front. A queue's last entry
/// repeats once the others are used, so a task can stay pending forever.
pub struct ScriptedBackend {
    inventory: Mutex<Option<Result<Vec<RawRecord>, SwimError>>>,
    deletes: Mutex<HashMap<String, Scripted<ApiResponse>>>,
    default_delete: ApiResponse,
    golden: Mutex<Scripted<ApiResponse>>,
    tasks: Mutex<HashMap<String, Scripted<TaskStatus>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    pub fn new(inventory: Vec<Value>) -> Self {
        let records = inventory
            .into_iter()
            .map(|v| v.as_object().cloned().expect("inventory entries are objects"))
            .collect();
        Self {
            inventory: Mutex::new(Some(Ok(records))),
            deletes: Mutex::new(HashMap::new()),
            default_delete: ApiResponse::from_body(204, ""),
            golden: Mutex::new(VecDeque::new()),
            tasks: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_inventory(status: u16) -> Self {
        Self::inventory_error(SwimError::Inventory {
            status,
            body: "server error".into(),
        })
    }

    pub fn inventory_error(err: SwimError) -> Self {
        let backend = Self::new(Vec::new());
        *backend.inventory.lock().unwrap() = Some(Err(err));
        backend
    }

    pub fn on_delete(self, path: &str, response: Result<ApiResponse, SwimError>) -> Self {
        self.deletes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn on_golden(self, response: Result<ApiResponse, SwimError>) -> Self {
        self.golden.lock().unwrap().push_back(response);
        self
    }

    pub fn on_task(self, task_id: &str, status: Result<TaskStatus, SwimError>) -> Self {
        self.tasks
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .push_back(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn next<T: Clone>(queue: &mut Scripted<T>) -> Option<Result<T, SwimError>> {
    if queue.len() > 1 {
        return queue.pop_front();
    }
    queue.front().map(|r| match r {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(clone_err(e)),
    })
}

fn clone_err(e: &SwimError) -> SwimError {
    match e {
        SwimError::TaskQuery { status, body } => SwimError::TaskQuery {
            status: *status,
            body: body.clone(),
        },
        other => SwimError::Transport(other.to_string()),
    }
}

impl SwimBackend for ScriptedBackend {
    async fn list_inventory(&self, query: &InventoryQuery) -> Result<Vec<RawRecord>, SwimError> {
        self.log(Call::List(query.clone()));
        self.inventory
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete_by_path(&self, path: &str) -> Result<ApiResponse, SwimError> {
        self.log(Call::Delete(path.to_string()));
        let mut deletes = self.deletes.lock().unwrap();
        match deletes.get_mut(path).and_then(next) {
            Some(result) => result,
            None => Ok(self.default_delete.clone()),
        }
    }

    async fn remove_golden_tag(
        &self,
        _scope: &GoldenScope,
        image_id: &str,
    ) -> Result<ApiResponse, SwimError> {
        self.log(Call::RemoveGolden(image_id.to_string()));
        next(&mut self.golden.lock().unwrap()).unwrap_or_else(|| Ok(ApiResponse::from_body(204, "")))
    }

    async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus, SwimError> {
        self.log(Call::Task(task_id.to_string()));
        let mut tasks = self.tasks.lock().unwrap();
        tasks
            .get_mut(task_id)
            .and_then(next)
            .unwrap_or_else(|| {
                Err(SwimError::TaskQuery {
                    status: 404,
                    body: "unknown task".into(),
                })
            })
    }
}

/// Operator that answers confirmation with a fixed reply.
pub struct ScriptedOperator {
    pub reply: bool,
    pub presented: Vec<ImageRecord>,
    pub prompts: Vec<String>,
}

impl ScriptedOperator {
    pub fn answering(reply: bool) -> Self {
        Self {
            reply,
            presented: Vec::new(),
            prompts: Vec::new(),
        }
    }
}

impl Operator for ScriptedOperator {
    fn present(&mut self, candidates: &[ImageRecord]) {
        self.presented = candidates.to_vec();
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.reply
    }
}

pub fn accepted(task_id: &str) -> ApiResponse {
    ApiResponse::from_body(
        202,
        json!({"response": {"taskId": task_id, "url": format!("/api/v1/task/{}", task_id)}})
            .to_string(),
    )
}

pub fn rejected(status: u16, body: &str) -> ApiResponse {
    ApiResponse::from_body(status, body)
}

pub fn progress(text: &str) -> TaskStatus {
    TaskStatus::from_json(json!({"response": {"progress": text, "isError": false}}))
}

pub fn task_failure(reason: &str) -> TaskStatus {
    TaskStatus::from_json(json!({
        "response": {"progress": "Image deletion completed", "isError": true, "failureReason": reason}
    }))
}

pub fn image(id: &str, family: &str, golden: bool) -> Value {
    json!({
        "imageUuid": id,
        "name": format!("{}_image.bin", id),
        "version": "17.9.4a",
        "family": family,
        "imageType": "SYSTEM_SW",
        "isTaggedGolden": golden,
    })
}

pub fn importation_path(id: &str) -> String {
    format!("/dna/intent/api/v1/image/importation/{}", id)
}

pub fn legacy_path(id: &str) -> String {
    format!("/dna/intent/api/v1/image/{}", id)
}
