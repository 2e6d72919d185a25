//! Run configuration.
//!
//! A [`RunConfig`] is resolved once, before a run starts, and passed into the engine. Nothing in
//! the engine reads environment variables; binaries overlay flags or env values on top of the
//! YAML file themselves.

use crate::catalogue::is_known_profile_key;
use crate::client::HttpFhirClient;
use crate::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_VALIDATOR_URL};
use crate::filter::MessageFilterPolicy;
use crate::validator::HttpValidator;
use crate::{SuiteError, SuiteResult};
use ips_types::CanonicalUrl;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Profile URL overrides keyed by profile key (e.g. `ips_bundle_profile_url`).
///
/// Checks resolve their profile once, when the catalogue is built, and capture the value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileBindings {
    overrides: BTreeMap<String, CanonicalUrl>,
}

impl ProfileBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::Config`] for a key no check reads, or [`SuiteError::Type`] for a
    /// value that is not an absolute URL.
    pub fn with_override(mut self, key: &str, url: &str) -> SuiteResult<Self> {
        if !is_known_profile_key(key) {
            return Err(SuiteError::Config(format!("unknown profile key '{key}'")));
        }
        self.overrides
            .insert(key.to_owned(), CanonicalUrl::new(url)?);
        Ok(self)
    }

    /// The override for `key`, or `default`.
    pub fn resolve(&self, key: &str, default: &str) -> String {
        self.overrides
            .get(key)
            .map(|url| url.as_str().to_owned())
            .unwrap_or_else(|| default.to_owned())
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides
            .iter()
            .map(|(key, url)| (key.as_str(), url.as_str()))
    }
}

/// Everything a run needs besides per-run inputs.
#[derive(Clone, Debug)]
pub struct RunConfig {
    server_url: Option<String>,
    validator_url: String,
    profiles: ProfileBindings,
    message_filters: MessageFilterPolicy,
    inputs: BTreeMap<String, String>,
    request_timeout: Duration,
}

impl RunConfig {
    /// Defaults: no server, the local validator, IPS message filters, no inputs.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in filter patterns do not compile.
    pub fn new() -> SuiteResult<Self> {
        Ok(Self {
            server_url: None,
            validator_url: DEFAULT_VALIDATOR_URL.to_owned(),
            profiles: ProfileBindings::default(),
            message_filters: MessageFilterPolicy::ips_default()?,
            inputs: BTreeMap::new(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Parse a YAML run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::Config`] naming the failing path when the YAML does not match the
    /// schema (unknown fields included), and the usual errors for bad profile keys, URLs or
    /// filter patterns.
    pub fn from_yaml_str(yaml_text: &str) -> SuiteResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire: RunConfigWire = match serde_path_to_error::deserialize(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(SuiteError::Config(format!(
                    "run configuration schema mismatch at {path}: {source}"
                )));
            }
        };

        Self::from_wire(wire)
    }

    /// Read and parse a YAML run configuration file.
    pub fn load(path: &Path) -> SuiteResult<Self> {
        let text = std::fs::read_to_string(path).map_err(SuiteError::ConfigRead)?;
        Self::from_yaml_str(&text)
    }

    fn from_wire(wire: RunConfigWire) -> SuiteResult<Self> {
        let mut config = Self::new()?;

        if let Some(url) = wire.server_url {
            config = config.with_server_url(Some(url));
        }
        if let Some(url) = wire.validator_url {
            config = config.with_validator_url(url)?;
        }
        for (key, url) in &wire.profiles {
            config.profiles = config.profiles.with_override(key, url)?;
        }
        if let Some(patterns) = wire.message_filters {
            config.message_filters = MessageFilterPolicy::new(patterns)?;
        }
        config.inputs = wire.inputs;
        if let Some(secs) = wire.request_timeout_secs {
            if secs == 0 {
                return Err(SuiteError::Config(
                    "request_timeout_secs must be greater than zero".into(),
                ));
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Replace the server URL. Blank values clear it.
    pub fn with_server_url(mut self, url: Option<String>) -> Self {
        self.server_url = url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty());
        self
    }

    pub fn with_validator_url(mut self, url: impl Into<String>) -> SuiteResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SuiteError::Config("validator_url cannot be empty".into()));
        }
        self.validator_url = url.trim().to_owned();
        Ok(self)
    }

    pub fn with_profiles(mut self, profiles: ProfileBindings) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_message_filters(mut self, filters: MessageFilterPolicy) -> Self {
        self.message_filters = filters;
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    pub fn validator_url(&self) -> &str {
        &self.validator_url
    }

    pub fn profiles(&self) -> &ProfileBindings {
        &self.profiles
    }

    pub fn message_filters(&self) -> &MessageFilterPolicy {
        &self.message_filters
    }

    /// Configured default inputs.
    pub fn inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Configured inputs overlaid with `overrides`.
    pub fn merged_inputs(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = self.inputs.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// HTTP client for the configured server, if one is set.
    pub fn http_client(&self) -> SuiteResult<Option<HttpFhirClient>> {
        self.server_url
            .as_deref()
            .map(|url| HttpFhirClient::new(url, self.request_timeout))
            .transpose()
    }

    pub fn http_validator(&self) -> SuiteResult<HttpValidator> {
        HttpValidator::new(&self.validator_url, self.request_timeout)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunConfigWire {
    #[serde(default)]
    server_url: Option<String>,

    #[serde(default)]
    validator_url: Option<String>,

    #[serde(default)]
    profiles: BTreeMap<String, String>,

    /// Absent means the IPS defaults; an empty list disables filtering.
    #[serde(default)]
    message_filters: Option<Vec<String>>,

    #[serde(default)]
    inputs: BTreeMap<String, String>,

    #[serde(default)]
    request_timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::IPS_BUNDLE_PROFILE;
    use std::io::Write;

    #[test]
    fn defaults_use_local_validator_and_ips_filters() {
        let config = RunConfig::new().expect("defaults");
        assert_eq!(config.validator_url(), DEFAULT_VALIDATOR_URL);
        assert!(config.server_url().is_none());
        assert!(!config.message_filters().is_empty());
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn parses_full_yaml() {
        let yaml = r#"
server_url: https://ips.example.org/fhir
validator_url: http://validator:4567
profiles:
  ips_bundle_profile_url: http://example.org/StructureDefinition/my-bundle
message_filters: []
inputs:
  patient_id: "123"
request_timeout_secs: 5
"#;
        let config = RunConfig::from_yaml_str(yaml).expect("parse");
        assert_eq!(config.server_url(), Some("https://ips.example.org/fhir"));
        assert_eq!(config.validator_url(), "http://validator:4567");
        assert_eq!(
            config
                .profiles()
                .resolve("ips_bundle_profile_url", IPS_BUNDLE_PROFILE),
            "http://example.org/StructureDefinition/my-bundle"
        );
        assert!(config.message_filters().is_empty());
        assert_eq!(config.inputs().get("patient_id").map(String::as_str), Some("123"));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn absent_filters_keep_defaults() {
        let config = RunConfig::from_yaml_str("server_url: http://x/fhir\n").expect("parse");
        assert!(!config.message_filters().is_empty());
    }

    #[test]
    fn unknown_field_names_the_path() {
        let err = RunConfig::from_yaml_str("server_ur1: http://x\n").expect_err("unknown field");
        match err {
            SuiteError::Config(msg) => assert!(msg.contains("server_ur1"), "{msg}"),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_type_names_the_path() {
        let err = RunConfig::from_yaml_str("request_timeout_secs: soon\n").expect_err("bad type");
        match err {
            SuiteError::Config(msg) => assert!(msg.contains("request_timeout_secs"), "{msg}"),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_profile_key_is_rejected() {
        let yaml = "profiles:\n  ips_bundel_profile_url: http://example.org/x\n";
        let err = RunConfig::from_yaml_str(yaml).expect_err("unknown key");
        match err {
            SuiteError::Config(msg) => assert!(msg.contains("ips_bundel_profile_url")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn read_group_profile_keys_are_known() {
        let bindings = ProfileBindings::new()
            .with_override("ips_patient_profile_url", "http://example.org/p")
            .expect("known key");
        assert_eq!(
            bindings.resolve("ips_patient_profile_url", "unused"),
            "http://example.org/p"
        );
    }

    #[test]
    fn relative_profile_url_is_rejected() {
        let err = ProfileBindings::new()
            .with_override("ips_bundle_profile_url", "Bundle-uv-ips")
            .expect_err("relative url");
        assert!(matches!(err, SuiteError::Type(_)));
    }

    #[test]
    fn bad_filter_pattern_is_reported() {
        let err = RunConfig::from_yaml_str("message_filters: ['(']\n").expect_err("bad regex");
        assert!(matches!(err, SuiteError::FilterPattern { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(matches!(
            RunConfig::from_yaml_str("request_timeout_secs: 0\n"),
            Err(SuiteError::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "server_url: http://localhost:8080/fhir").expect("write");
        let config = RunConfig::load(file.path()).expect("load");
        assert_eq!(config.server_url(), Some("http://localhost:8080/fhir"));

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            RunConfig::load(&missing),
            Err(SuiteError::ConfigRead(_))
        ));
    }

    #[test]
    fn run_inputs_override_configured_inputs() {
        let config = RunConfig::new()
            .expect("defaults")
            .with_input("patient_id", "from-config")
            .with_input("bundle_id", "b1");
        let overrides = BTreeMap::from([("patient_id".to_string(), "from-run".to_string())]);
        let merged = config.merged_inputs(&overrides);
        assert_eq!(merged["patient_id"], "from-run");
        assert_eq!(merged["bundle_id"], "b1");
    }

    #[test]
    fn blank_server_url_is_cleared() {
        let config = RunConfig::new()
            .expect("defaults")
            .with_server_url(Some("  ".into()));
        assert!(config.server_url().is_none());
        assert!(config.http_client().expect("client").is_none());
    }
}
