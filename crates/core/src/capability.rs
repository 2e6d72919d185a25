//! Operation-support detection over a server's CapabilityStatement.

use fhir::CapabilityStatement;

/// An extended operation the suite looks for in a capability manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationSupport {
    /// Resource type the operation is declared on.
    pub resource_type: &'static str,
    /// Canonical OperationDefinition URL.
    pub definition_url: String,
    /// Lower-case operation names accepted as aliases.
    pub accepted_names: Vec<String>,
}

impl OperationSupport {
    pub fn is_declared_by(&self, manifest: &CapabilityStatement) -> bool {
        let names: Vec<&str> = self.accepted_names.iter().map(String::as_str).collect();
        supports_operation(manifest, self.resource_type, &self.definition_url, &names)
    }
}

/// Whether `manifest` declares an operation for `resource_type` matching either the canonical
/// definition URL or, case-insensitively, one of `accepted_names`.
///
/// A type with no entries, or entries without operations, yields `false`.
pub fn supports_operation(
    manifest: &CapabilityStatement,
    resource_type: &str,
    canonical_uri: &str,
    accepted_names: &[&str],
) -> bool {
    manifest.operations_for(resource_type).any(|operation| {
        if operation.definition == canonical_uri {
            return true;
        }
        let name = operation.name.to_lowercase();
        accepted_names
            .iter()
            .any(|accepted| accepted.to_lowercase() == name)
    })
}
