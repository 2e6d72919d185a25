//! IPS document envelope checks.
//!
//! A missing or non-Bundle document skips rather than fails: the step that produced it already
//! reported the problem.

use crate::check::{CheckOutcome, CheckResult, Verdict};
use crate::conformance::ConformanceChecker;
use fhir::{Bundle, Resource, ResourceType, DOCUMENT_BUNDLE_TYPE};

/// First-entry check: the document is a non-empty `document` Bundle whose entry 0 is a
/// Composition conforming to `composition_profile`.
pub fn validate_structure(
    doc: Option<&Resource>,
    checker: &ConformanceChecker<'_>,
    composition_profile: &str,
) -> CheckResult {
    assert_structure(doc, checker, composition_profile).into()
}

/// Required-member check: at least one entry wraps a `member_type` record, and every such record
/// conforms to `member_profile`.
pub fn validate_required_member(
    doc: Option<&Resource>,
    member_type: ResourceType,
    checker: &ConformanceChecker<'_>,
    member_profile: &str,
) -> CheckResult {
    assert_required_member(doc, member_type, checker, member_profile).into()
}

/// [`validate_structure`] as a check body step.
pub fn assert_structure(
    doc: Option<&Resource>,
    checker: &ConformanceChecker<'_>,
    composition_profile: &str,
) -> CheckOutcome {
    let bundle = document_bundle(doc)?;

    if bundle.is_empty() {
        return Err(Verdict::Fail("Bundle has no entries".into()));
    }

    let composition = match bundle.first_resource() {
        Some(first) if first.is_a(ResourceType::Composition) => first,
        Some(first) => {
            return Err(Verdict::Fail(format!(
                "The first entry in the Bundle is not a Composition (found {})",
                first.resource_type()
            )))
        }
        None => {
            return Err(Verdict::Fail(
                "The first entry in the Bundle is not a Composition (entry has no resource)".into(),
            ))
        }
    };

    if !bundle.is_document() {
        return Err(Verdict::Fail(format!(
            "Bundle type is '{}', expected '{DOCUMENT_BUNDLE_TYPE}'",
            bundle.bundle_type().unwrap_or("<missing>")
        )));
    }

    checker.assert_valid(composition, composition_profile)
}

/// [`validate_required_member`] as a check body step.
pub fn assert_required_member(
    doc: Option<&Resource>,
    member_type: ResourceType,
    checker: &ConformanceChecker<'_>,
    member_profile: &str,
) -> CheckOutcome {
    let bundle = document_bundle(doc)?;

    let members: Vec<&Resource> = bundle.resources_of_type(member_type.as_str()).collect();
    if members.is_empty() {
        return Err(Verdict::Fail(format!(
            "Bundle does not contain any {member_type} resources"
        )));
    }

    let mut failures = Vec::new();
    for member in members {
        match checker.assert_valid(member, member_profile) {
            Ok(()) => {}
            Err(Verdict::Fail(msg)) => failures.push(msg),
            Err(other) => return Err(other),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Verdict::Fail(failures.join("\n")))
    }
}

fn document_bundle(doc: Option<&Resource>) -> Result<Bundle, Verdict> {
    let resource = doc.ok_or_else(|| Verdict::Skip("No Bundle is available to check".into()))?;
    if !resource.is_a(ResourceType::Bundle) {
        return Err(Verdict::Skip(format!(
            "Expected a Bundle, but the available resource is a {}",
            resource.resource_type()
        )));
    }
    Bundle::from_resource(resource)
        .map_err(|e| Verdict::Fail(format!("Bundle could not be read: {e}")))
}
