//! Request and response shapes exchanged with the inference service

use crate::cache::StageKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Stage-1 output for every file processed so far, keyed by repository-relative path
pub type RepoAnalysisMap = BTreeMap<String, Value>;

/// Which report the third stage produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportKind {
    Vulnerability,
    /// Compliance review against caller-supplied policy text
    Compliance { policies: String },
}

impl ReportKind {
    pub fn stage_kind(&self) -> StageKind {
        match self {
            ReportKind::Vulnerability => StageKind::ReportVulnerability,
            ReportKind::Compliance { .. } => StageKind::ReportCompliance,
        }
    }

    pub fn policies(&self) -> Option<&str> {
        match self {
            ReportKind::Vulnerability => None,
            ReportKind::Compliance { policies } => Some(policies),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub file_name: String,
    pub file_path: String,
    pub file_content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRequest<'a> {
    pub file_name: String,
    pub file_content: String,
    #[serde(rename = "fMap")]
    pub f_map: &'a RepoAnalysisMap,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub file_name: String,
    /// The assembled code bundle
    pub file_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_defined_policies: Option<String>,
}

/// A file the context stage considers relevant to the subject file
///
/// Fields are optional on the wire; entries without a name and path are skipped
/// when bundling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    #[serde(default)]
    pub related_file_name: Option<String>,
    #[serde(default)]
    pub related_file_path: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ContextEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            related_file_name: Some(name.into()),
            related_file_path: Some(path.into()),
            reason: Some(reason.into()),
        }
    }

    /// Name and path, if both are present and non-empty
    pub fn reference(&self) -> Option<(&str, &str)> {
        let name = self.related_file_name.as_deref().filter(|s| !s.trim().is_empty())?;
        let path = self.related_file_path.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((name, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_request_wire_names() {
        let req = MetadataRequest {
            file_name: "a.py".to_string(),
            file_path: "src/a.py".to_string(),
            file_content: "x".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"fileName": "a.py", "filePath": "src/a.py", "fileContent": "x"})
        );
    }

    #[test]
    fn test_context_request_uses_fmap() {
        let mut map = RepoAnalysisMap::new();
        map.insert("a.py".to_string(), json!({"overview": "a"}));
        let req = ContextRequest {
            file_name: "b.py".to_string(),
            file_content: "y".to_string(),
            f_map: &map,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["fMap"]["a.py"]["overview"], "a");
        assert_eq!(value["fileName"], "b.py");
    }

    #[test]
    fn test_report_request_policies_optional() {
        let vuln = ReportRequest {
            file_name: "a.py".to_string(),
            file_content: "bundle".to_string(),
            user_defined_policies: None,
        };
        assert!(serde_json::to_value(&vuln)
            .unwrap()
            .get("userDefinedPolicies")
            .is_none());

        let compliance = ReportRequest {
            user_defined_policies: Some("no PII in logs".to_string()),
            ..vuln
        };
        assert_eq!(
            serde_json::to_value(&compliance).unwrap()["userDefinedPolicies"],
            "no PII in logs"
        );
    }

    #[test]
    fn test_context_entry_reference() {
        let full = ContextEntry::new("b.py", "src/b.py", "imported");
        assert_eq!(full.reference(), Some(("b.py", "src/b.py")));

        let missing_path: ContextEntry =
            serde_json::from_value(json!({"relatedFileName": "b.py", "reason": "x"})).unwrap();
        assert!(missing_path.reference().is_none());

        let blank_name = ContextEntry::new(" ", "src/b.py", "");
        assert!(blank_name.reference().is_none());
    }

    #[test]
    fn test_report_kind_stage() {
        assert_eq!(ReportKind::Vulnerability.stage_kind(), StageKind::ReportVulnerability);
        let compliance = ReportKind::Compliance {
            policies: "p".to_string(),
        };
        assert_eq!(compliance.stage_kind(), StageKind::ReportCompliance);
        assert_eq!(compliance.policies(), Some("p"));
    }
}
