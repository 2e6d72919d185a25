//! REST request and response bodies.
//!
//! Report and outline trees are carried as JSON objects; their shape is the engine's serde form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

/// Body of `POST /runs`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RunReq {
    /// Group to run. Defaults to the suite root.
    #[serde(default)]
    pub group_id: Option<String>,

    /// FHIR base URL of the server under test. Defaults to the configured server.
    #[serde(default)]
    pub server_url: Option<String>,

    /// Named inputs, overlaid on the configured defaults.
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,

    /// Run sibling groups concurrently.
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusTotalsRes {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub error: usize,
    pub not_run: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RunRes {
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub finished_at: String,
    pub totals: StatusTotalsRes,
    /// Root group report.
    #[schema(value_type = Object)]
    pub report: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuiteRes {
    /// Input names used anywhere in the tree.
    pub inputs: Vec<String>,
    /// Group outline.
    #[schema(value_type = Object)]
    pub outline: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_request_fields_are_optional() {
        let req: RunReq = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(req, RunReq::default());
    }

    #[test]
    fn run_request_reads_inputs() {
        let req: RunReq = serde_json::from_value(json!({
            "group_id": "ips_summary_operation",
            "inputs": {"patient_id": "p1"}
        }))
        .expect("parse");
        assert_eq!(req.group_id.as_deref(), Some("ips_summary_operation"));
        assert_eq!(req.inputs.get("patient_id").map(String::as_str), Some("p1"));
        assert!(req.server_url.is_none());
        assert!(!req.parallel);
    }
}
