//! Record fetch adapter.
//!
//! Wraps "read record by id" and "invoke named operation" calls against the FHIR server under
//! test and normalises every outcome into a [`FetchedRecord`]. The adapter never returns an
//! error: transport failures become a record with [`TRANSPORT_ERROR_STATUS`] and no resource,
//! and deciding pass or fail is left to the calling check.

use crate::constants::{FHIR_JSON_MEDIA_TYPE, TRANSPORT_ERROR_STATUS};
use crate::{SuiteError, SuiteResult};
use fhir::{Resource, ResourceType};
use ips_types::ResourceId;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Outcome of one network retrieval or operation invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedRecord {
    status_code: u16,
    resource: Option<Resource>,
    transport_error: Option<String>,
    parse_error: Option<String>,
}

impl FetchedRecord {
    /// Normalise an HTTP response. An empty body yields no resource and no parse error.
    pub fn from_response(status_code: u16, body: &str) -> Self {
        let (resource, parse_error) = if body.trim().is_empty() {
            (None, None)
        } else {
            match Resource::parse(body) {
                Ok(resource) => (Some(resource), None),
                Err(e) => (None, Some(e.to_string())),
            }
        };

        Self {
            status_code,
            resource,
            transport_error: None,
            parse_error,
        }
    }

    /// A request that never produced a response.
    pub fn transport_failure(error: impl Into<String>) -> Self {
        Self {
            status_code: TRANSPORT_ERROR_STATUS,
            resource: None,
            transport_error: Some(error.into()),
            parse_error: None,
        }
    }

    /// A record built from content supplied directly rather than fetched.
    pub fn from_resource(status_code: u16, resource: Resource) -> Self {
        Self {
            status_code,
            resource: Some(resource),
            transport_error: None,
            parse_error: None,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// The record's self-declared type tag.
    pub fn declared_type(&self) -> Option<&str> {
        self.resource.as_ref().map(Resource::resource_type)
    }

    /// The record's self-declared id.
    pub fn record_id(&self) -> Option<&str> {
        self.resource.as_ref().and_then(Resource::id)
    }

    pub fn transport_error(&self) -> Option<&str> {
        self.transport_error.as_deref()
    }

    pub fn parse_error(&self) -> Option<&str> {
        self.parse_error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.transport_error.is_none() && (200..300).contains(&self.status_code)
    }
}

/// HTTP method used to invoke an extended operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationMethod {
    Get,
    Post,
}

impl OperationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationMethod::Get => "GET",
            OperationMethod::Post => "POST",
        }
    }
}

/// Transport to the FHIR server under test.
///
/// Implementations perform exactly one network call per invocation and never fail: every
/// outcome, including transport errors, is returned as data.
pub trait FhirClient: Send + Sync {
    /// `GET [base]/[type]/[id]`.
    fn fetch(&self, resource_type: ResourceType, id: &ResourceId) -> FetchedRecord;

    /// Invoke a server-relative path, e.g. `Patient/123/$summary`.
    fn invoke(
        &self,
        operation_path: &str,
        method: OperationMethod,
        body: Option<&serde_json::Value>,
    ) -> FetchedRecord;

    /// `GET [base]/metadata`.
    fn capability_statement(&self) -> FetchedRecord {
        self.invoke("metadata", OperationMethod::Get, None)
    }
}

/// Normalise a server-relative operation path.
///
/// Leading slashes are dropped. Absolute URLs and empty paths are rejected.
pub fn normalise_operation_path(operation_path: &str) -> Result<&str, String> {
    let trimmed = operation_path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err("operation path cannot be empty".into());
    }
    if trimmed.contains("://") {
        return Err(format!(
            "operation path must be server-relative, got '{operation_path}'"
        ));
    }
    Ok(trimmed)
}

/// [`FhirClient`] over blocking HTTP.
#[derive(Clone, Debug)]
pub struct HttpFhirClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpFhirClient {
    /// Create a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::InvalidInput`] for a blank base URL and
    /// [`SuiteError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> SuiteResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(SuiteError::InvalidInput(
                "FHIR server base URL cannot be empty".into(),
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

    fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.base_url, relative)
    }

    fn execute(
        &self,
        method: &str,
        url: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> FetchedRecord {
        tracing::debug!("{method} {url}");
        let response = match request.header(ACCEPT, FHIR_JSON_MEDIA_TYPE).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{method} {url} failed: {e}");
                return FetchedRecord::transport_failure(e.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.text() {
            Ok(body) => {
                tracing::debug!("{method} {url} -> {status}");
                FetchedRecord::from_response(status, &body)
            }
            Err(e) => {
                tracing::warn!("{method} {url} -> {status}, body unreadable: {e}");
                FetchedRecord::transport_failure(format!(
                    "failed to read response body (status {status}): {e}"
                ))
            }
        }
    }
}

impl FhirClient for HttpFhirClient {
    fn fetch(&self, resource_type: ResourceType, id: &ResourceId) -> FetchedRecord {
        let url = self.url_for(&format!("{resource_type}/{id}"));
        self.execute("GET", &url, self.http.get(&url))
    }

    fn invoke(
        &self,
        operation_path: &str,
        method: OperationMethod,
        body: Option<&serde_json::Value>,
    ) -> FetchedRecord {
        let relative = match normalise_operation_path(operation_path) {
            Ok(relative) => relative,
            Err(e) => return FetchedRecord::transport_failure(e),
        };
        let url = self.url_for(relative);

        let request = match method {
            OperationMethod::Get => self.http.get(&url),
            OperationMethod::Post => self.http.post(&url),
        };
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, FHIR_JSON_MEDIA_TYPE)
                .body(body.to_string()),
            None => request,
        };

        self.execute(method.as_str(), &url, request)
    }
}
