//! FHIR OperationOutcome wire model.
//!
//! The external validator reports its findings as an OperationOutcome. This module turns the
//! `issue` array into an ordered list of [`OutcomeIssue`] values.

use crate::{FhirError, FhirResult, Resource, ResourceType};
use serde::Deserialize;

// ============================================================================
// Public domain-level types
// ============================================================================

/// Severity of an OperationOutcome issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueSeverity {
    /// The issue caused the action to fail and no further checking could be performed.
    Fatal,
    /// The issue is sufficiently important to cause the action to fail.
    Error,
    /// The issue is not important enough to cause the action to fail.
    Warning,
    /// The issue has no relation to the degree of success of the action.
    Information,
}

impl IssueSeverity {
    /// Convert to FHIR wire format string.
    pub fn to_wire(self) -> &'static str {
        match self {
            IssueSeverity::Fatal => "fatal",
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Information => "information",
        }
    }

    /// Parse from FHIR wire format string.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "fatal" => Some(IssueSeverity::Fatal),
            "error" => Some(IssueSeverity::Error),
            "warning" => Some(IssueSeverity::Warning),
            "information" => Some(IssueSeverity::Information),
            _ => None,
        }
    }

    /// Whether this severity fails a validation (`fatal` or `error`).
    pub fn is_error(self) -> bool {
        matches!(self, IssueSeverity::Fatal | IssueSeverity::Error)
    }
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_wire())
    }
}

/// One issue reported in an OperationOutcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeIssue {
    pub severity: IssueSeverity,
    pub code: String,
    /// Human-readable text: `details.text`, falling back to `diagnostics`.
    pub text: String,
    /// First `expression`, falling back to the first `location`.
    pub location: Option<String>,
}

/// Typed view of an OperationOutcome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationOutcome {
    pub issues: Vec<OutcomeIssue>,
}

impl OperationOutcome {
    /// Parse an OperationOutcome from JSON text.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let resource = Resource::parse(json_text)?;
        Self::from_resource(&resource)
    }

    /// Build a typed view from a resource declaring `resourceType: OperationOutcome`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] for malformed issues or unknown severities.
    pub fn from_resource(resource: &Resource) -> FhirResult<Self> {
        resource.expect_type(ResourceType::OperationOutcome)?;
        let wire: OperationOutcomeWire =
            crate::from_value_with_path(resource.as_json(), "OperationOutcome")?;

        let issues = wire
            .issue
            .into_iter()
            .enumerate()
            .map(|(index, issue)| {
                let severity = IssueSeverity::from_wire(&issue.severity).ok_or_else(|| {
                    FhirError::Translation(format!(
                        "OperationOutcome issue[{index}] has unknown severity '{}'",
                        issue.severity
                    ))
                })?;
                let text = issue
                    .details
                    .and_then(|d| d.text)
                    .or(issue.diagnostics)
                    .unwrap_or_default();
                let location = issue
                    .expression
                    .into_iter()
                    .next()
                    .or_else(|| issue.location.into_iter().next());
                Ok(OutcomeIssue {
                    severity,
                    code: issue.code,
                    text,
                    location,
                })
            })
            .collect::<FhirResult<Vec<_>>>()?;

        Ok(Self { issues })
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OperationOutcomeWire {
    #[serde(default)]
    issue: Vec<IssueWire>,
}

#[derive(Debug, Deserialize)]
struct IssueWire {
    severity: String,

    #[serde(default)]
    code: String,

    #[serde(default)]
    details: Option<CodeableConceptWire>,

    #[serde(default)]
    diagnostics: Option<String>,

    #[serde(default)]
    expression: Vec<String>,

    #[serde(default)]
    location: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CodeableConceptWire {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_issues_in_order() {
        let outcome = OperationOutcome::parse(
            r#"{
              "resourceType": "OperationOutcome",
              "issue": [
                {"severity": "error", "code": "structure",
                 "details": {"text": "Composition.subject: minimum required = 1, but only found 0"},
                 "expression": ["Bundle.entry[0].resource"]},
                {"severity": "information", "code": "informational",
                 "diagnostics": "All OK", "location": ["Bundle"]}
              ]
            }"#,
        )
        .expect("parse outcome");

        assert_eq!(outcome.issues.len(), 2);
        assert_eq!(outcome.issues[0].severity, IssueSeverity::Error);
        assert_eq!(
            outcome.issues[0].location.as_deref(),
            Some("Bundle.entry[0].resource")
        );
        assert!(outcome.issues[0].text.starts_with("Composition.subject"));
        assert_eq!(outcome.issues[1].text, "All OK");
        assert_eq!(outcome.issues[1].location.as_deref(), Some("Bundle"));
    }

    #[test]
    fn details_text_wins_over_diagnostics() {
        let outcome = OperationOutcome::parse(
            r#"{"resourceType": "OperationOutcome", "issue": [
                {"severity": "warning", "code": "x",
                 "details": {"text": "preferred"}, "diagnostics": "fallback"}
            ]}"#,
        )
        .expect("parse outcome");
        assert_eq!(outcome.issues[0].text, "preferred");
    }

    #[test]
    fn rejects_unknown_severity() {
        let err = OperationOutcome::parse(
            r#"{"resourceType": "OperationOutcome",
                "issue": [{"severity": "catastrophic", "code": "x"}]}"#,
        )
        .expect_err("unknown severity");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("catastrophic")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn fatal_and_error_are_error_level() {
        assert!(IssueSeverity::Fatal.is_error());
        assert!(IssueSeverity::Error.is_error());
        assert!(!IssueSeverity::Warning.is_error());
        assert!(!IssueSeverity::Information.is_error());
    }
}
