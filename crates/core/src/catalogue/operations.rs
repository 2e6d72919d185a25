//! `$summary` and `$docref` operation groups.

use super::{
    register_required_member_checks, stored_bundle, BUNDLE_PROFILE_KEY, COMPOSITION_PROFILE_KEY,
    DOCREF_DEFINITION_KEY, SUMMARY_DEFINITION_KEY,
};
use crate::bundle_structure::assert_structure;
use crate::capability::OperationSupport;
use crate::check::{assert_resource_type, assert_response_status, ensure, CheckOutcome, Verdict};
use crate::client::OperationMethod;
use crate::config::ProfileBindings;
use crate::constants::{
    DOCREF_OPERATION_NAMES, HTTP_OK, IPA_DOCREF_OPERATION_DEFINITION, IPS_BUNDLE_PROFILE,
    IPS_COMPOSITION_PROFILE, IPS_SUMMARY_OPERATION_DEFINITION, SUMMARY_OPERATION_NAMES,
};
use crate::suite::{CheckContext, CheckDefinition, GroupDefinition, InputSpec, Registry};
use crate::SuiteResult;
use fhir::{CapabilityStatement, Parameters, ResourceType};

pub const SUMMARY_GROUP_ID: &str = "ips_summary_operation";
pub const DOCREF_GROUP_ID: &str = "ips_docref_operation";

/// Name the `$summary` response is stored under.
pub const SUMMARY_STEP: &str = "summary_operation";
const DOCREF_STEP: &str = "docref_operation";
const CAPABILITY_STEP: &str = "capability_statement";
const NO_SUMMARY_BUNDLE: &str = "No Bundle returned from document operation";

pub fn register_summary_operation(
    registry: &mut Registry,
    profiles: &ProfileBindings,
) -> SuiteResult<()> {
    let support = OperationSupport {
        resource_type: ResourceType::Patient.as_str(),
        definition_url: profiles.resolve(SUMMARY_DEFINITION_KEY, IPS_SUMMARY_OPERATION_DEFINITION),
        accepted_names: SUMMARY_OPERATION_NAMES.iter().map(|s| s.to_string()).collect(),
    };
    let bundle_profile = profiles.resolve(BUNDLE_PROFILE_KEY, IPS_BUNDLE_PROFILE);
    let composition_profile = profiles.resolve(COMPOSITION_PROFILE_KEY, IPS_COMPOSITION_PROFILE);

    registry.register_check(
        CheckDefinition::new(
            "ips_summary_operation_support",
            "IPS Server declares support for $summary operation in CapabilityStatement",
            move |ctx| {
                assert_operation_declared(
                    ctx,
                    &support,
                    "Server CapabilityStatement did not declare support for $summary operation \
                     in Patient resource.",
                )
            },
        )
        .described(
            "The IPS Server declares support for Patient/[id]/$summary operation \
             in its server CapabilityStatement",
        ),
    )?;

    registry.register_check(
        CheckDefinition::new(
            "ips_summary_operation_return_bundle",
            "IPS Server returns Bundle resource for Patient/[id]/$summary GET operation",
            move |ctx| {
                let checker = ctx.checker();
                let patient_id = ctx.id_input("patient_id")?;
                let path = format!("Patient/{patient_id}/$summary");
                let record = ctx.invoke(SUMMARY_STEP, &path, OperationMethod::Get, None)?;
                assert_response_status(record, HTTP_OK)?;
                let bundle = assert_resource_type(record, ResourceType::Bundle)?;
                checker.assert_valid(bundle, &bundle_profile)
            },
        )
        .described(
            "IPS Server returns a valid IPS Bundle resource as successful result of \
             $summary operation.",
        )
        .with_input(InputSpec::required("patient_id").titled("Patient ID"))
        .makes_request(SUMMARY_STEP),
    )?;

    registry.register_check(
        CheckDefinition::new(
            "ips_summary_operation_valid_composition",
            "Bundle contains valid IPS Composition as first entry",
            move |ctx| {
                let document = stored_bundle(ctx.request(SUMMARY_STEP), NO_SUMMARY_BUNDLE)?;
                assert_structure(Some(document), &ctx.checker(), &composition_profile)
            },
        )
        .uses_request(SUMMARY_STEP),
    )?;

    let mut group = GroupDefinition::new(SUMMARY_GROUP_ID, "Summary Operation Tests")
        .described(
            "Verify support for the $summary operation as described in the IPS \
             generation guidance.",
        )
        .check("ips_summary_operation_support")
        .check("ips_summary_operation_return_bundle")
        .check("ips_summary_operation_valid_composition");

    for check_id in register_required_member_checks(
        registry,
        SUMMARY_GROUP_ID,
        SUMMARY_STEP,
        NO_SUMMARY_BUNDLE,
        profiles,
    )? {
        group = group.check(check_id);
    }

    registry.register_group(group)
}

pub fn register_docref_operation(
    registry: &mut Registry,
    profiles: &ProfileBindings,
) -> SuiteResult<()> {
    let support = OperationSupport {
        resource_type: ResourceType::DocumentReference.as_str(),
        definition_url: profiles.resolve(DOCREF_DEFINITION_KEY, IPA_DOCREF_OPERATION_DEFINITION),
        accepted_names: DOCREF_OPERATION_NAMES.iter().map(|s| s.to_string()).collect(),
    };

    registry.register_check(
        CheckDefinition::new(
            "ips_docref_operation_support",
            "IPS Server declares support for $docref operation in CapabilityStatement",
            move |ctx| {
                assert_operation_declared(
                    ctx,
                    &support,
                    "Server CapabilityStatement did not declare support for $docref operation \
                     in DocumentReference resource.",
                )
            },
        ),
    )?;

    registry.register_check(
        CheckDefinition::new(
            "ips_docref_operation_response",
            "Server responds successfully to a $docref operation",
            |ctx| {
                let patient_id = ctx.id_input("patient_id")?;
                let parameters = Parameters::new()
                    .with_id("patient", patient_id.as_str())
                    .to_json();
                let record = ctx.invoke(
                    DOCREF_STEP,
                    "DocumentReference/$docref",
                    OperationMethod::Post,
                    Some(&parameters),
                )?;
                assert_response_status(record, HTTP_OK)
            },
        )
        .described(
            "Request a $docref search for the patient. The returned content is not validated.",
        )
        .with_input(InputSpec::required("patient_id").titled("Patient ID"))
        .makes_request(DOCREF_STEP),
    )?;

    registry.register_group(
        GroupDefinition::new(DOCREF_GROUP_ID, "DocRef Operation Tests")
            .described("Verify support for the $docref operation.")
            .optional()
            .check("ips_docref_operation_support")
            .check("ips_docref_operation_response"),
    )
}

/// Fetch the CapabilityStatement and assert it declares `support`.
fn assert_operation_declared(
    ctx: &mut CheckContext<'_>,
    support: &OperationSupport,
    failure: &str,
) -> CheckOutcome {
    let record = ctx.capability_statement(CAPABILITY_STEP)?;
    assert_response_status(record, HTTP_OK)?;
    let resource = assert_resource_type(record, ResourceType::CapabilityStatement)?;
    let manifest = CapabilityStatement::from_resource(resource)
        .map_err(|e| Verdict::Fail(format!("CapabilityStatement could not be read: {e}")))?;
    ensure(support.is_declared_by(&manifest), failure)
}
