//! Check outcomes.
//!
//! A check body returns a [`CheckOutcome`]: `Ok(())` is a pass, and `Err(Verdict)` carries a
//! failure, a skip or an error with its message. The runner turns that into an immutable
//! [`CheckResult`]. Writing bodies against `Result` lets them use `?` on the assertion helpers
//! below, stopping at the first violated assertion.

use crate::constants::HTTP_OK;
use crate::client::FetchedRecord;
use fhir::{Resource, ResourceType};
use serde::{Deserialize, Serialize};

/// Terminal status of a check (and of an aggregated group).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Skip => "skip",
            CheckStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluation outcome. Created once per check execution and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl CheckResult {
    pub fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::with_message(CheckStatus::Fail, message)
    }

    pub fn skip(message: impl Into<String>) -> Self {
        Self::with_message(CheckStatus::Skip, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_message(CheckStatus::Error, message)
    }

    fn with_message(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_pass(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

/// Why a check did not pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The system under test violated a requirement.
    Fail(String),
    /// There was nothing to check (missing input or an upstream step already diagnosed).
    Skip(String),
    /// The engine or a collaborator failed unexpectedly.
    Error(String),
}

/// Result of running a check body.
pub type CheckOutcome = Result<(), Verdict>;

impl From<CheckOutcome> for CheckResult {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            Ok(()) => CheckResult::pass(),
            Err(Verdict::Fail(msg)) => CheckResult::fail(msg),
            Err(Verdict::Skip(msg)) => CheckResult::skip(msg),
            Err(Verdict::Error(msg)) => CheckResult::error(msg),
        }
    }
}

impl From<CheckResult> for CheckOutcome {
    fn from(result: CheckResult) -> Self {
        let message = result.message.unwrap_or_default();
        match result.status {
            CheckStatus::Pass => Ok(()),
            CheckStatus::Fail => Err(Verdict::Fail(message)),
            CheckStatus::Skip => Err(Verdict::Skip(message)),
            CheckStatus::Error => Err(Verdict::Error(message)),
        }
    }
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Fail with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> CheckOutcome {
    if condition {
        Ok(())
    } else {
        Err(Verdict::Fail(message.into()))
    }
}

/// Assert a fetch produced the expected status.
///
/// A transport failure is an `error`, not a `fail`: nothing was learned about the server.
pub fn assert_response_status(record: &FetchedRecord, expected: u16) -> CheckOutcome {
    if let Some(error) = record.transport_error() {
        return Err(Verdict::Error(format!("Request failed: {error}")));
    }
    ensure(
        record.status_code() == expected,
        format!(
            "Unexpected response status: expected {expected}, but received {}",
            record.status_code()
        ),
    )
}

/// Assert a fetch returned a resource of the given type and hand it back.
pub fn assert_resource_type(
    record: &FetchedRecord,
    expected: ResourceType,
) -> Result<&Resource, Verdict> {
    let resource = record.resource().ok_or_else(|| {
        let detail = record
            .parse_error()
            .map(|e| format!(": {e}"))
            .unwrap_or_default();
        Verdict::Fail(format!(
            "Expected a {expected} resource, but the response contained no resource{detail}"
        ))
    })?;
    ensure(
        resource.is_a(expected),
        format!(
            "Unexpected resource type: expected {expected}, but received {}",
            resource.resource_type()
        ),
    )?;
    Ok(resource)
}

/// The record a dependent check inspects: skip unless the named step produced a successful
/// response with a resource.
pub fn prior_resource<'a>(
    record: Option<&'a FetchedRecord>,
    step: &str,
) -> Result<&'a Resource, Verdict> {
    let record =
        record.ok_or_else(|| Verdict::Skip(format!("No '{step}' request has been made")))?;
    if record.transport_error().is_some() || record.status_code() != HTTP_OK {
        return Err(Verdict::Skip(format!(
            "The '{step}' request did not succeed (status {})",
            record.status_code()
        )));
    }
    record
        .resource()
        .ok_or_else(|| Verdict::Skip(format!("The '{step}' request returned no resource")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok_record(value: serde_json::Value) -> FetchedRecord {
        FetchedRecord::from_response(200, &value.to_string())
    }

    #[test]
    fn outcome_round_trips_into_result() {
        assert_eq!(CheckResult::from(Ok(())), CheckResult::pass());
        let failed = CheckResult::from(Err(Verdict::Fail("nope".into())));
        assert_eq!(failed.status(), CheckStatus::Fail);
        assert_eq!(failed.message(), Some("nope"));
        assert_eq!(
            CheckOutcome::from(CheckResult::skip("later")),
            Err(Verdict::Skip("later".into()))
        );
    }

    #[test]
    fn status_serialises_snake_case() {
        let text = serde_json::to_string(&CheckResult::fail("x")).expect("serialise");
        assert_eq!(text, r#"{"status":"fail","message":"x"}"#);
        let text = serde_json::to_string(&CheckResult::pass()).expect("serialise");
        assert_eq!(text, r#"{"status":"pass"}"#);
    }

    #[test]
    fn response_status_mismatch_fails() {
        let record = FetchedRecord::from_response(404, "");
        let outcome = assert_response_status(&record, 200);
        match outcome {
            Err(Verdict::Fail(msg)) => {
                assert!(msg.contains("200"));
                assert!(msg.contains("404"));
            }
            other => panic!("expected fail, got {other:?}"),
        }
    }

    #[test]
    fn transport_failure_is_an_error_not_a_fail() {
        let record = FetchedRecord::transport_failure("connection refused");
        assert!(matches!(
            assert_response_status(&record, 200),
            Err(Verdict::Error(_))
        ));
    }

    #[test]
    fn resource_type_mismatch_names_both_types() {
        let record = ok_record(json!({"resourceType": "OperationOutcome"}));
        match assert_resource_type(&record, ResourceType::Bundle) {
            Err(Verdict::Fail(msg)) => {
                assert!(msg.contains("Bundle"));
                assert!(msg.contains("OperationOutcome"));
            }
            other => panic!("expected fail, got {other:?}"),
        }
    }

    #[test]
    fn prior_resource_skips_when_upstream_failed() {
        assert!(matches!(
            prior_resource(None, "patient"),
            Err(Verdict::Skip(_))
        ));
        let not_found = FetchedRecord::from_response(404, "");
        assert!(matches!(
            prior_resource(Some(&not_found), "patient"),
            Err(Verdict::Skip(_))
        ));
        let ok = ok_record(json!({"resourceType": "Patient", "id": "abc"}));
        let resource = prior_resource(Some(&ok), "patient").expect("resource");
        assert_eq!(resource.id(), Some("abc"));
    }
}
