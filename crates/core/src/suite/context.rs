//! What a check body sees while it runs.

use crate::check::Verdict;
use crate::client::{FetchedRecord, FhirClient, OperationMethod};
use crate::conformance::ConformanceChecker;
use fhir::ResourceType;
use ips_types::ResourceId;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Named requests made so far within one group.
pub type RequestCache = BTreeMap<String, FetchedRecord>;

/// Run state lent to a single check.
///
/// Inputs are already resolved (run values over declared defaults). Requests stored here stay
/// visible to later checks of the same group.
pub struct CheckContext<'a> {
    inputs: &'a BTreeMap<String, String>,
    client: Option<&'a dyn FhirClient>,
    checker: ConformanceChecker<'a>,
    requests: &'a mut RequestCache,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        inputs: &'a BTreeMap<String, String>,
        client: Option<&'a dyn FhirClient>,
        checker: ConformanceChecker<'a>,
        requests: &'a mut RequestCache,
    ) -> Self {
        Self {
            inputs,
            client,
            checker,
            requests,
        }
    }

    /// A non-blank input value. Missing input means there is nothing to check.
    pub fn input(&self, name: &str) -> Result<&'a str, Verdict> {
        self.optional_input(name)
            .ok_or_else(|| Verdict::Skip(format!("Input '{name}' was not provided")))
    }

    pub fn optional_input(&self, name: &str) -> Option<&'a str> {
        let inputs: &'a BTreeMap<String, String> = self.inputs;
        inputs
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// A record id input, validated against the FHIR id grammar.
    pub fn id_input(&self, name: &str) -> Result<ResourceId, Verdict> {
        let raw = self.input(name)?;
        ResourceId::new(raw)
            .map_err(|e| Verdict::Fail(format!("Input '{name}' is not a valid resource id: {e}")))
    }

    /// The run's conformance checker. Copied out so it stays usable while a stored request is
    /// borrowed.
    pub fn checker(&self) -> ConformanceChecker<'a> {
        self.checker
    }

    pub fn client(&self) -> Result<&'a dyn FhirClient, Verdict> {
        self.client
            .ok_or_else(|| Verdict::Skip("No FHIR server base URL was provided".into()))
    }

    /// Read a record and store the result under `name`.
    pub fn fetch(
        &mut self,
        name: &str,
        resource_type: ResourceType,
        id: &ResourceId,
    ) -> Result<&FetchedRecord, Verdict> {
        let record = self.client()?.fetch(resource_type, id);
        Ok(self.store(name, record))
    }

    /// Invoke an operation and store the result under `name`.
    pub fn invoke(
        &mut self,
        name: &str,
        operation_path: &str,
        method: OperationMethod,
        body: Option<&serde_json::Value>,
    ) -> Result<&FetchedRecord, Verdict> {
        let record = self.client()?.invoke(operation_path, method, body);
        Ok(self.store(name, record))
    }

    /// Fetch the capability statement under `name`.
    pub fn capability_statement(&mut self, name: &str) -> Result<&FetchedRecord, Verdict> {
        let record = self.client()?.capability_statement();
        Ok(self.store(name, record))
    }

    /// A request made earlier in this group.
    pub fn request(&self, name: &str) -> Option<&FetchedRecord> {
        self.requests.get(name)
    }

    /// Store a record under `name`, replacing any earlier one.
    pub fn store(&mut self, name: &str, record: FetchedRecord) -> &FetchedRecord {
        match self.requests.entry(name.to_owned()) {
            Entry::Occupied(mut slot) => {
                slot.insert(record);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(record),
        }
    }
}
