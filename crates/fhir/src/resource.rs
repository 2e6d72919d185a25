//! Generic FHIR resource envelope.
//!
//! The engine treats most records opaquely: it needs the self-declared type and id, and hands the
//! raw JSON to the external validator. [`Resource`] keeps exactly that and nothing more.

use crate::{FhirError, FhirResult, ResourceType};
use serde_json::Value;

/// A parsed FHIR resource: its `resourceType`, optional `id` and the raw JSON object.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    resource_type: String,
    id: Option<String>,
    json: Value,
}

impl Resource {
    /// Parse a resource from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if the text is not JSON, is not an object, or has no string
    /// `resourceType`.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let value: Value = serde_json::from_str(json_text)?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed JSON value.
    pub fn from_value(json: Value) -> FhirResult<Self> {
        let object = json
            .as_object()
            .ok_or_else(|| FhirError::InvalidInput("resource must be a JSON object".into()))?;

        let resource_type = match object.get("resourceType") {
            Some(Value::String(rt)) if !rt.is_empty() => rt.clone(),
            Some(_) => {
                return Err(FhirError::InvalidInput(
                    "resourceType must be a non-empty string".into(),
                ))
            }
            None => return Err(FhirError::InvalidInput("missing resourceType".into())),
        };

        let id = object
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            resource_type,
            id,
            json,
        })
    }

    /// The self-declared `resourceType` tag.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// The self-declared logical id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether this resource declares the given type.
    pub fn is_a(&self, resource_type: ResourceType) -> bool {
        self.resource_type == resource_type.as_str()
    }

    /// Fail unless this resource declares `expected`.
    pub fn expect_type(&self, expected: ResourceType) -> FhirResult<()> {
        if self.is_a(expected) {
            Ok(())
        } else {
            Err(FhirError::UnexpectedResourceType {
                expected: expected.as_str().to_owned(),
                found: self.resource_type.clone(),
            })
        }
    }

    /// `meta.profile` canonicals claimed by the resource.
    pub fn meta_profiles(&self) -> Vec<&str> {
        self.json
            .pointer("/meta/profile")
            .and_then(Value::as_array)
            .map(|profiles| profiles.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// `Type/id` when an id is present, otherwise just the type.
    pub fn reference_label(&self) -> String {
        match &self.id {
            Some(id) => format!("{}/{}", self.resource_type, id),
            None => self.resource_type.clone(),
        }
    }

    pub fn as_json(&self) -> &Value {
        &self.json
    }

    /// Serialise back to compact JSON text.
    pub fn to_json_string(&self) -> FhirResult<String> {
        Ok(serde_json::to_string(&self.json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_type_and_id() {
        let resource = Resource::parse(r#"{"resourceType":"Patient","id":"abc"}"#)
            .expect("parse patient");
        assert_eq!(resource.resource_type(), "Patient");
        assert_eq!(resource.id(), Some("abc"));
        assert!(resource.is_a(ResourceType::Patient));
        assert_eq!(resource.reference_label(), "Patient/abc");
    }

    #[test]
    fn id_is_optional() {
        let resource = Resource::from_value(json!({"resourceType": "Bundle"})).expect("bundle");
        assert_eq!(resource.id(), None);
        assert_eq!(resource.reference_label(), "Bundle");
    }

    #[test]
    fn rejects_missing_resource_type() {
        let err = Resource::parse(r#"{"id":"abc"}"#).expect_err("no resourceType");
        match err {
            FhirError::InvalidInput(msg) => assert!(msg.contains("resourceType")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(matches!(
            Resource::parse("[1, 2]"),
            Err(FhirError::InvalidInput(_))
        ));
        assert!(matches!(
            Resource::parse("not json"),
            Err(FhirError::InvalidJson(_))
        ));
    }

    #[test]
    fn expect_type_names_both_types() {
        let resource = Resource::from_value(json!({"resourceType": "Condition", "id": "c1"}))
            .expect("condition");
        let err = resource
            .expect_type(ResourceType::Composition)
            .expect_err("wrong type");
        let msg = err.to_string();
        assert!(msg.contains("Composition"));
        assert!(msg.contains("Condition"));
    }

    #[test]
    fn reads_meta_profiles() {
        let resource = Resource::from_value(json!({
            "resourceType": "Patient",
            "meta": {"profile": ["http://hl7.org/fhir/uv/ips/StructureDefinition/Patient-uv-ips"]}
        }))
        .expect("patient");
        assert_eq!(
            resource.meta_profiles(),
            vec!["http://hl7.org/fhir/uv/ips/StructureDefinition/Patient-uv-ips"]
        );
    }
}
