//! Standalone bundle validation. Needs no server: the Bundle is supplied as input text.

use super::{
    register_required_member_checks, stored_bundle, BUNDLE_PROFILE_KEY, COMPOSITION_PROFILE_KEY,
};
use crate::bundle_structure::assert_structure;
use crate::check::{ensure, Verdict};
use crate::client::FetchedRecord;
use crate::config::ProfileBindings;
use crate::constants::{HTTP_OK, IPS_BUNDLE_PROFILE, IPS_COMPOSITION_PROFILE};
use crate::suite::{CheckDefinition, GroupDefinition, InputSpec, Registry};
use crate::SuiteResult;
use fhir::{Resource, ResourceType};

pub const RESOURCE_VALIDATION_GROUP_ID: &str = "ips_resource_validation";

/// Input carrying the Bundle JSON.
pub const BUNDLE_CONTENT_INPUT: &str = "bundle_content";

const SUPPLIED_STEP: &str = "supplied_bundle";
const NO_SUPPLIED_BUNDLE: &str = "No valid Bundle content was supplied";

pub fn register_resource_validation(
    registry: &mut Registry,
    profiles: &ProfileBindings,
) -> SuiteResult<()> {
    let bundle_profile = profiles.resolve(BUNDLE_PROFILE_KEY, IPS_BUNDLE_PROFILE);
    let composition_profile = profiles.resolve(COMPOSITION_PROFILE_KEY, IPS_COMPOSITION_PROFILE);

    registry.register_check(
        CheckDefinition::new(
            "ips_resource_validation_bundle",
            "Valid IPS Bundle",
            move |ctx| {
                let content = ctx.input(BUNDLE_CONTENT_INPUT)?;
                let resource = Resource::parse(content).map_err(|e| {
                    Verdict::Fail(format!("Bundle content is not a FHIR JSON resource: {e}"))
                })?;
                ensure(
                    resource.is_a(ResourceType::Bundle),
                    format!(
                        "Unexpected resource type: expected Bundle, but received {}",
                        resource.resource_type()
                    ),
                )?;

                let checker = ctx.checker();
                let record =
                    ctx.store(SUPPLIED_STEP, FetchedRecord::from_resource(HTTP_OK, resource));
                let bundle = record
                    .resource()
                    .ok_or_else(|| Verdict::Error("supplied Bundle was not retained".into()))?;
                checker.assert_valid(bundle, &bundle_profile)
            },
        )
        .described("Validate the content of an IPS Bundle against the IPS Bundle profile.")
        .with_input(InputSpec::required(BUNDLE_CONTENT_INPUT).titled("IPS Bundle"))
        .makes_request(SUPPLIED_STEP),
    )?;

    registry.register_check(
        CheckDefinition::new(
            "ips_resource_validation_valid_composition",
            "Bundle contains valid IPS Composition as first entry",
            move |ctx| {
                let document = stored_bundle(ctx.request(SUPPLIED_STEP), NO_SUPPLIED_BUNDLE)?;
                assert_structure(Some(document), &ctx.checker(), &composition_profile)
            },
        )
        .uses_request(SUPPLIED_STEP),
    )?;

    let mut group =
        GroupDefinition::new(RESOURCE_VALIDATION_GROUP_ID, "IPS Resource Validation Tests")
            .described("Validate a standalone IPS Bundle without a server.")
            .check("ips_resource_validation_bundle")
            .check("ips_resource_validation_valid_composition");

    for check_id in register_required_member_checks(
        registry,
        RESOURCE_VALIDATION_GROUP_ID,
        SUPPLIED_STEP,
        NO_SUPPLIED_BUNDLE,
        profiles,
    )? {
        group = group.check(check_id);
    }

    registry.register_group(group)
}
