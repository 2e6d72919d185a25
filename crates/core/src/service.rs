//! Suite runs over a resolved [`RunConfig`].
//!
//! [`SuiteService`] is what the front ends hold. It builds the catalogue once from the
//! configuration's profile bindings and, per run, the HTTP collaborators the configuration names.

use crate::catalogue::{
    build_registry, BUNDLE_CONTENT_INPUT, RESOURCE_VALIDATION_GROUP_ID, SUITE_ID,
};
use crate::client::FhirClient;
use crate::config::RunConfig;
use crate::report::SuiteReport;
use crate::suite::{CancellationFlag, GroupOutline, Registry, RunOptions, Runner};
use crate::validator::ResourceValidator;
use crate::SuiteResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runs the IPS suite against the configured collaborators.
#[derive(Clone)]
pub struct SuiteService {
    config: RunConfig,
    registry: Arc<Registry>,
}

impl SuiteService {
    /// Build the catalogue for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalogue cannot be assembled from the configured profiles.
    pub fn new(config: RunConfig) -> SuiteResult<Self> {
        let registry = build_registry(config.profiles())?;
        tracing::debug!(
            "suite catalogue built: {} groups, {} checks",
            registry.group_ids().count(),
            registry.check_ids().count()
        );
        Ok(Self {
            config,
            registry: Arc::new(registry),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The same service pointed at another server. The catalogue is shared.
    pub fn for_server(&self, server_url: Option<String>) -> Self {
        Self {
            config: self.config.clone().with_server_url(server_url),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Tree of `group_id`, or of the whole suite when `None`.
    pub fn outline(&self, group_id: Option<&str>) -> SuiteResult<GroupOutline> {
        self.registry.outline(group_id.unwrap_or(SUITE_ID))
    }

    /// Run `group_id` over HTTP against the configured server and validator.
    ///
    /// `inputs` overlay the configured defaults.
    pub fn run(
        &self,
        group_id: &str,
        inputs: &BTreeMap<String, String>,
        options: RunOptions,
        cancellation: CancellationFlag,
    ) -> SuiteResult<SuiteReport> {
        let client = self.config.http_client()?;
        let validator = self.config.http_validator()?;
        self.run_with(
            client.as_ref().map(|c| c as &dyn FhirClient),
            &validator,
            group_id,
            inputs,
            options,
            cancellation,
        )
    }

    /// Run `group_id` with caller-supplied collaborators.
    pub fn run_with(
        &self,
        client: Option<&dyn FhirClient>,
        validator: &dyn ResourceValidator,
        group_id: &str,
        inputs: &BTreeMap<String, String>,
        options: RunOptions,
        cancellation: CancellationFlag,
    ) -> SuiteResult<SuiteReport> {
        let inputs = self.config.merged_inputs(inputs);
        Runner::new(&self.registry, validator, self.config.message_filters())
            .with_client(client)
            .with_options(options)
            .with_cancellation(cancellation)
            .run(group_id, &inputs)
    }

    /// Validate standalone Bundle JSON. No server is contacted.
    pub fn validate_bundle(&self, content: &str) -> SuiteResult<SuiteReport> {
        let validator = self.config.http_validator()?;
        self.validate_bundle_with(&validator, content)
    }

    pub fn validate_bundle_with(
        &self,
        validator: &dyn ResourceValidator,
        content: &str,
    ) -> SuiteResult<SuiteReport> {
        let inputs = BTreeMap::from([(BUNDLE_CONTENT_INPUT.to_string(), content.to_string())]);
        self.run_with(
            None,
            validator,
            RESOURCE_VALIDATION_GROUP_ID,
            &inputs,
            RunOptions::default(),
            CancellationFlag::default(),
        )
    }
}
