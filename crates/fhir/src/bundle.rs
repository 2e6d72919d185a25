//! FHIR Bundle wire model and typed view.
//!
//! An IPS document is a Bundle of type `document` whose first entry is a Composition. This
//! module exposes the envelope (type and ordered entries); checking the IPS invariants is the
//! job of `ips-core`.

use crate::{FhirError, FhirResult, Resource, ResourceType};
use serde::Deserialize;

/// Bundle type that marks a clinical document.
pub const DOCUMENT_BUNDLE_TYPE: &str = "document";

/// One entry of a bundle. The wrapped resource may be absent on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleEntry {
    pub full_url: Option<String>,
    pub resource: Option<Resource>,
}

/// A parsed Bundle: its declared type and its entries in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct Bundle {
    id: Option<String>,
    bundle_type: Option<String>,
    entries: Vec<BundleEntry>,
}

impl Bundle {
    /// Build a typed view of a resource that declares `resourceType: Bundle`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::UnexpectedResourceType`] for non-bundles, or
    /// [`FhirError::Translation`] naming the failing path when an element has the wrong shape or
    /// an entry's resource has no `resourceType`.
    pub fn from_resource(resource: &Resource) -> FhirResult<Self> {
        resource.expect_type(ResourceType::Bundle)?;
        let wire: BundleWire = crate::from_value_with_path(resource.as_json(), "Bundle")?;

        let entries = wire
            .entry
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let resource = entry
                    .resource
                    .map(Resource::from_value)
                    .transpose()
                    .map_err(|e| {
                        FhirError::Translation(format!("Bundle entry[{index}].resource: {e}"))
                    })?;
                Ok(BundleEntry {
                    full_url: entry.full_url,
                    resource,
                })
            })
            .collect::<FhirResult<Vec<_>>>()?;

        Ok(Self {
            id: wire.id,
            bundle_type: wire.bundle_type,
            entries,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The declared `Bundle.type`, if present.
    pub fn bundle_type(&self) -> Option<&str> {
        self.bundle_type.as_deref()
    }

    pub fn is_document(&self) -> bool {
        self.bundle_type.as_deref() == Some(DOCUMENT_BUNDLE_TYPE)
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The resource wrapped by entry 0, if there is one.
    pub fn first_resource(&self) -> Option<&Resource> {
        self.entries.first().and_then(|e| e.resource.as_ref())
    }

    /// All wrapped resources, skipping entries without a resource.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entries.iter().filter_map(|e| e.resource.as_ref())
    }

    /// Wrapped resources whose declared type equals `resource_type`, in entry order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources()
            .filter(move |r| r.resource_type() == resource_type)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize)]
struct BundleWire {
    #[serde(default)]
    id: Option<String>,

    #[serde(rename = "type", default)]
    bundle_type: Option<String>,

    #[serde(default)]
    entry: Vec<BundleEntryWire>,
}

#[derive(Debug, Deserialize)]
struct BundleEntryWire {
    #[serde(rename = "fullUrl", default)]
    full_url: Option<String>,

    #[serde(default)]
    resource: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(value: serde_json::Value) -> FhirResult<Bundle> {
        let resource = Resource::from_value(value).expect("resource envelope");
        Bundle::from_resource(&resource)
    }

    #[test]
    fn reads_document_entries_in_order() {
        let parsed = bundle(json!({
            "resourceType": "Bundle",
            "id": "ips-1",
            "type": "document",
            "entry": [
                {"fullUrl": "urn:uuid:1", "resource": {"resourceType": "Composition", "id": "c"}},
                {"fullUrl": "urn:uuid:2", "resource": {"resourceType": "Condition", "id": "d1"}},
                {"fullUrl": "urn:uuid:3", "resource": {"resourceType": "Condition", "id": "d2"}}
            ]
        }))
        .expect("parse bundle");

        assert!(parsed.is_document());
        assert_eq!(parsed.id(), Some("ips-1"));
        assert_eq!(parsed.entries().len(), 3);
        assert_eq!(
            parsed.first_resource().map(Resource::resource_type),
            Some("Composition")
        );
        let conditions: Vec<_> = parsed
            .resources_of_type("Condition")
            .filter_map(Resource::id)
            .collect();
        assert_eq!(conditions, vec!["d1", "d2"]);
    }

    #[test]
    fn missing_entry_list_is_empty() {
        let parsed = bundle(json!({"resourceType": "Bundle", "type": "collection"}))
            .expect("parse bundle");
        assert!(parsed.is_empty());
        assert!(!parsed.is_document());
        assert!(parsed.first_resource().is_none());
    }

    #[test]
    fn entry_without_resource_is_kept_but_not_iterated() {
        let parsed = bundle(json!({
            "resourceType": "Bundle",
            "type": "document",
            "entry": [{"fullUrl": "urn:uuid:1"}]
        }))
        .expect("parse bundle");
        assert_eq!(parsed.entries().len(), 1);
        assert_eq!(parsed.resources().count(), 0);
    }

    #[test]
    fn rejects_non_bundle() {
        let err = bundle(json!({"resourceType": "Patient"})).expect_err("not a bundle");
        assert!(matches!(err, FhirError::UnexpectedResourceType { .. }));
    }

    #[test]
    fn reports_path_of_malformed_entry_list() {
        let err = bundle(json!({"resourceType": "Bundle", "entry": "nope"}))
            .expect_err("entry must be an array");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("entry"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn reports_index_of_entry_without_resource_type() {
        let err = bundle(json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Composition"}},
                {"resource": {"id": "x"}}
            ]
        }))
        .expect_err("entry resource without type");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("entry[1]"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }
}
