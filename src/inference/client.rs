use super::types::{
    ContextEntry, ContextRequest, MetadataRequest, ReportKind, ReportRequest,
};
use crate::cache::StageKind;
use crate::error::BackendError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Endpoint path (relative to the service base URL) for each stage
pub fn endpoint_for(stage: StageKind) -> &'static str {
    match stage {
        StageKind::Metadata => "analyze_repo_code",
        StageKind::Context => "analyze_context",
        StageKind::ReportVulnerability => "analyze_vulnerabilities",
        StageKind::ReportCompliance => "analyze_compliance",
    }
}

/// A remote service that answers one JSON request per analysis stage
///
/// Implementors only provide [`InferenceClient::invoke`]; the typed stage methods
/// build the payload and validate the response shape on top of it.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke(&self, stage: StageKind, payload: Value) -> Result<Value, BackendError>;

    fn name(&self) -> &str;

    async fn extract_metadata(&self, request: &MetadataRequest) -> Result<Value, BackendError> {
        let value = self.invoke(StageKind::Metadata, to_payload(request)?).await?;
        non_null(value)
    }

    async fn resolve_context(
        &self,
        request: &ContextRequest<'_>,
    ) -> Result<Vec<ContextEntry>, BackendError> {
        let value = self.invoke(StageKind::Context, to_payload(request)?).await?;
        parse_context_entries(value)
    }

    async fn generate_report(
        &self,
        kind: &ReportKind,
        request: &ReportRequest,
    ) -> Result<Value, BackendError> {
        let value = self.invoke(kind.stage_kind(), to_payload(request)?).await?;
        non_null(value)
    }
}

fn to_payload<T: Serialize + ?Sized>(request: &T) -> Result<Value, BackendError> {
    serde_json::to_value(request).map_err(|e| BackendError::Other {
        message: format!("Failed to serialize request: {}", e),
    })
}

fn non_null(value: Value) -> Result<Value, BackendError> {
    if value.is_null() {
        return Err(BackendError::invalid_response("empty response", None));
    }
    Ok(value)
}

/// Interprets a context-stage response
///
/// The service answers with a JSON array of entries, sometimes wrapped in a JSON
/// string. Array elements that are not objects become empty entries, which the
/// bundler later skips.
pub fn parse_context_entries(value: Value) -> Result<Vec<ContextEntry>, BackendError> {
    let items = match value {
        Value::Array(items) => items,
        Value::String(text) => match serde_json::from_str::<Value>(text.trim()) {
            Ok(Value::Array(items)) => items,
            _ => {
                return Err(BackendError::invalid_response(
                    "context response is not a JSON array",
                    Some(text),
                ))
            }
        },
        other => {
            return Err(BackendError::invalid_response(
                "context response is not a JSON array",
                Some(other.to_string()),
            ))
        }
    };

    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).unwrap_or_default())
        .collect())
}
