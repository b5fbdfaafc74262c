use super::client::InferenceClient;
use crate::cache::StageKind;
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub value: Value,
    pub error: Option<BackendError>,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(value: Value) -> Self {
        Self {
            value,
            error: None,
            delay: None,
        }
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            value: Value::Null,
            error: Some(error),
            delay: None,
        }
    }

    /// Answer only after sleeping for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// One call seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub stage: StageKind,
    pub file_name: Option<String>,
    pub payload: Value,
}

/// Scriptable in-memory inference service
///
/// Responses are chosen in order: a per-file response for the stage, then the
/// next queued response for the stage, then the stage default. A stage with none
/// of these fails with `BackendError::Other`.
pub struct MockInferenceClient {
    per_file: Mutex<HashMap<(StageKind, String), MockResponse>>,
    queued: Mutex<HashMap<StageKind, VecDeque<MockResponse>>>,
    defaults: Mutex<HashMap<StageKind, MockResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
    name: String,
}

impl MockInferenceClient {
    pub fn new() -> Self {
        Self {
            per_file: Mutex::new(HashMap::new()),
            queued: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            name: "MockInference".to_string(),
        }
    }

    /// A mock where every stage succeeds with a small canned answer
    pub fn happy_path() -> Self {
        let mock = Self::new();
        mock.set_default(
            StageKind::Metadata,
            MockResponse::json(json!({"overview": "mock metadata"})),
        );
        mock.set_default(StageKind::Context, MockResponse::json(json!([])));
        mock.set_default(
            StageKind::ReportVulnerability,
            MockResponse::json(json!({"vulnerabilities": []})),
        );
        mock.set_default(
            StageKind::ReportCompliance,
            MockResponse::json(json!({"violations": []})),
        );
        mock
    }

    pub fn set_default(&self, stage: StageKind, response: MockResponse) {
        self.defaults.lock().unwrap().insert(stage, response);
    }

    pub fn add_response(&self, stage: StageKind, response: MockResponse) {
        self.queued
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(response);
    }

    /// Answer `stage` requests whose `fileName` is `file_name` with `response`
    pub fn respond_for(&self, stage: StageKind, file_name: impl Into<String>, response: MockResponse) {
        self.per_file
            .lock()
            .unwrap()
            .insert((stage, file_name.into()), response);
    }

    /// Make `stage` fail with an HTTP 500 for `file_name`
    pub fn fail_for(&self, stage: StageKind, file_name: impl Into<String>) {
        self.respond_for(
            stage,
            file_name,
            MockResponse::error(BackendError::ApiError {
                message: "HTTP 500 Internal Server Error: mock failure".to_string(),
                status_code: Some(500),
            }),
        );
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, stage: StageKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.stage == stage)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn pick(&self, stage: StageKind, file_name: Option<&str>) -> Option<MockResponse> {
        if let Some(name) = file_name {
            let per_file = self.per_file.lock().unwrap();
            if let Some(response) = per_file.get(&(stage, name.to_string())) {
                return Some(response.clone());
            }
        }
        if let Some(response) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&stage)
            .and_then(VecDeque::pop_front)
        {
            return Some(response);
        }
        self.defaults.lock().unwrap().get(&stage).cloned()
    }
}

impl Default for MockInferenceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn invoke(&self, stage: StageKind, payload: Value) -> Result<Value, BackendError> {
        let file_name = payload
            .get("fileName")
            .and_then(Value::as_str)
            .map(str::to_string);

        let response = self.pick(stage, file_name.as_deref());
        self.calls.lock().unwrap().push(RecordedCall {
            stage,
            file_name,
            payload,
        });

        let Some(response) = response else {
            return Err(BackendError::Other {
                message: format!("No mock response configured for {}", stage),
            });
        };

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        match response.error {
            Some(error) => Err(error),
            None => Ok(response.value),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
