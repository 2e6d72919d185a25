//! FHIR CapabilityStatement wire model.
//!
//! Only the parts needed to answer "which operations does the server declare for type T" are
//! modelled: `rest[].resource[].type` and `rest[].resource[].operation[].{name, definition}`.

use crate::{FhirResult, Resource, ResourceType};
use serde::Deserialize;

/// A declared operation on a resource type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationComponent {
    pub name: String,
    pub definition: String,
}

/// A resource type entry of a `rest` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceComponent {
    pub resource_type: String,
    pub operations: Vec<OperationComponent>,
}

/// Typed view of a server's capability manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilityStatement {
    resources: Vec<ResourceComponent>,
}

impl CapabilityStatement {
    /// Build a typed view from a resource declaring `resourceType: CapabilityStatement`.
    ///
    /// All `rest` blocks are flattened into one list of resource components. Missing `rest`,
    /// `resource` or `operation` arrays are read as empty.
    pub fn from_resource(resource: &Resource) -> FhirResult<Self> {
        resource.expect_type(ResourceType::CapabilityStatement)?;
        let wire: CapabilityStatementWire =
            crate::from_value_with_path(resource.as_json(), "CapabilityStatement")?;

        let resources = wire
            .rest
            .into_iter()
            .flat_map(|rest| rest.resource)
            .map(|r| ResourceComponent {
                resource_type: r.resource_type,
                operations: r
                    .operation
                    .into_iter()
                    .map(|op| OperationComponent {
                        name: op.name,
                        definition: op.definition,
                    })
                    .collect(),
            })
            .collect();

        Ok(Self { resources })
    }

    /// Construct directly from components.
    pub fn from_components(resources: Vec<ResourceComponent>) -> Self {
        Self { resources }
    }

    pub fn resources(&self) -> &[ResourceComponent] {
        &self.resources
    }

    /// All operations declared for `resource_type`, across every matching entry.
    pub fn operations_for<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a OperationComponent> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.resource_type == resource_type)
            .flat_map(|r| r.operations.iter())
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct CapabilityStatementWire {
    #[serde(default)]
    rest: Vec<RestWire>,
}

#[derive(Debug, Deserialize)]
struct RestWire {
    #[serde(default)]
    resource: Vec<ResourceWire>,
}

#[derive(Debug, Deserialize)]
struct ResourceWire {
    #[serde(rename = "type")]
    resource_type: String,

    #[serde(default)]
    operation: Vec<OperationWire>,
}

#[derive(Debug, Deserialize)]
struct OperationWire {
    #[serde(default)]
    name: String,

    #[serde(default)]
    definition: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FhirError;
    use serde_json::json;

    fn statement(value: serde_json::Value) -> FhirResult<CapabilityStatement> {
        let resource = Resource::from_value(value).expect("resource envelope");
        CapabilityStatement::from_resource(&resource)
    }

    #[test]
    fn flattens_operations_across_rest_blocks() {
        let cs = statement(json!({
            "resourceType": "CapabilityStatement",
            "rest": [
                {"mode": "server", "resource": [
                    {"type": "Patient", "operation": [
                        {
                            "name": "summary",
                            "definition": "http://hl7.org/fhir/uv/ips/OperationDefinition/summary"
                        }
                    ]}
                ]},
                {"mode": "server", "resource": [
                    {"type": "Patient", "operation": [
                        {
                            "name": "everything",
                            "definition": "http://hl7.org/fhir/OperationDefinition/Patient-everything"
                        }
                    ]}
                ]}
            ]
        }))
        .expect("parse statement");

        let names: Vec<_> = cs.operations_for("Patient").map(|op| op.name.as_str()).collect();
        assert_eq!(names, vec!["summary", "everything"]);
    }

    #[test]
    fn resource_without_operation_list_contributes_nothing() {
        let cs = statement(json!({
            "resourceType": "CapabilityStatement",
            "rest": [{"resource": [
                {"type": "DocumentReference", "interaction": [{"code": "read"}]}
            ]}]
        }))
        .expect("parse statement");
        assert_eq!(cs.resources().len(), 1);
        assert_eq!(cs.operations_for("DocumentReference").count(), 0);
    }

    #[test]
    fn missing_rest_is_empty() {
        let cs = statement(json!({"resourceType": "CapabilityStatement", "status": "active"}))
            .expect("parse statement");
        assert!(cs.resources().is_empty());
    }

    #[test]
    fn rejects_other_resource_types() {
        let err = statement(json!({"resourceType": "Patient"})).expect_err("wrong type");
        assert!(matches!(err, FhirError::UnexpectedResourceType { .. }));
    }
}
