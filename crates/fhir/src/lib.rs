//! FHIR wire/boundary support for the IPS conformance engine.
//!
//! This crate provides **wire models** and **parse helpers** for the FHIR R4 JSON documents the
//! engine inspects:
//! - a generic [`Resource`] envelope (type tag, id, raw JSON)
//! - typed views over the few resources whose structure the engine reasons about:
//!   [`Bundle`], [`CapabilityStatement`], [`OperationOutcome`] and [`Parameters`]
//!
//! This crate focuses on:
//! - serialisation/deserialisation with field-path diagnostics
//! - translation between wire structs and small domain-level views
//!
//! Profile validation is NOT done here. Records are handed to an external validator by
//! `ips-core`; this crate only reads the elements needed for structural checks.

pub mod bundle;
pub mod capability_statement;
pub mod operation_outcome;
pub mod parameters;
pub mod resource;
pub mod resource_type;

// Re-export facades
pub use bundle::{Bundle, BundleEntry, DOCUMENT_BUNDLE_TYPE};
pub use capability_statement::{CapabilityStatement, OperationComponent, ResourceComponent};
pub use operation_outcome::{IssueSeverity, OperationOutcome, OutcomeIssue};
pub use parameters::{ParameterValue, Parameters};
pub use resource::Resource;
pub use resource_type::ResourceType;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("expected resourceType '{expected}', got '{found}'")]
    UnexpectedResourceType { expected: String, found: String },
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialize a wire struct from a JSON value, reporting the failing field path.
///
/// `what` names the resource in the error message (e.g. `"Bundle"`).
pub(crate) fn from_value_with_path<T>(value: &serde_json::Value, what: &str) -> FhirResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>"
        } else {
            path.as_str()
        };
        FhirError::Translation(format!("{what} schema mismatch at {path}: {source}"))
    })
}
