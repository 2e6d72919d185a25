//! External profile validator collaborator.
//!
//! The engine does not implement profile validation. It hands a record and a profile canonical to
//! a [`ResourceValidator`] and receives an ordered list of issues back.

use crate::constants::FHIR_JSON_MEDIA_TYPE;
use crate::{SuiteError, SuiteResult};
use fhir::{IssueSeverity, OperationOutcome, Resource};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// One issue reported by the external validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub location: Option<String>,
    pub text: String,
}

impl ValidationIssue {
    pub fn new(severity: IssueSeverity, location: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            severity,
            location: location.map(str::to_owned),
            text: text.into(),
        }
    }

    /// `location: text`, or just the text when the validator gave no location.
    ///
    /// Message filter rules are matched against this rendering.
    pub fn message(&self) -> String {
        match &self.location {
            Some(location) => format!("{location}: {}", self.text),
            None => self.text.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

/// Validates a resource against a profile.
pub trait ResourceValidator: Send + Sync {
    /// Validate `resource` against `profile_url` and return every issue in reported order.
    ///
    /// # Errors
    ///
    /// Returns an error when the validator itself could not be reached or answered with
    /// something other than an OperationOutcome.
    fn validate(&self, resource: &Resource, profile_url: &str) -> SuiteResult<Vec<ValidationIssue>>;
}

/// Validator service reached over HTTP.
///
/// Sends `POST [base]/validate?profile=<url>` with the resource as the body and reads the
/// OperationOutcome returned.
#[derive(Clone, Debug)]
pub struct HttpValidator {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpValidator {
    pub fn new(base_url: &str, timeout: Duration) -> SuiteResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SuiteError::InvalidInput(
                "validator base URL cannot be empty".into(),
            ));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SuiteError::HttpClient)?;

        Ok(Self {
            base_url: base_url.to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ResourceValidator for HttpValidator {
    fn validate(
        &self,
        resource: &Resource,
        profile_url: &str,
    ) -> SuiteResult<Vec<ValidationIssue>> {
        let url = format!("{}/validate", self.base_url);
        let body = resource.to_json_string()?;

        tracing::debug!(
            "validating {} against {profile_url}",
            resource.reference_label()
        );

        let response = self
            .http
            .post(&url)
            .query(&[("profile", profile_url)])
            .header(CONTENT_TYPE, FHIR_JSON_MEDIA_TYPE)
            .header(ACCEPT, FHIR_JSON_MEDIA_TYPE)
            .body(body)
            .send()
            .map_err(|e| SuiteError::Validator(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| SuiteError::Validator(format!("unreadable validator response: {e}")))?;

        if !status.is_success() {
            return Err(SuiteError::Validator(format!(
                "validator returned status {}",
                status.as_u16()
            )));
        }

        issues_from_outcome(&text)
    }
}

/// Translate a validator OperationOutcome body into issues.
pub fn issues_from_outcome(json_text: &str) -> SuiteResult<Vec<ValidationIssue>> {
    let outcome = OperationOutcome::parse(json_text)
        .map_err(|e| SuiteError::Validator(format!("unexpected validator response: {e}")))?;

    Ok(outcome
        .issues
        .into_iter()
        .map(|issue| ValidationIssue {
            severity: issue.severity,
            location: issue.location,
            text: issue.text,
        })
        .collect())
}
