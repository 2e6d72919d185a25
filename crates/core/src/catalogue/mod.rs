//! The IPS v1.1.0 suite.
//!
//! [`build_registry`] registers every check and group with profile URLs resolved from the run's
//! [`ProfileBindings`]. The suite root is [`SUITE_ID`]:
//!
//! - `ips_resource_validation`: standalone Bundle content, no server
//! - `ips_operations`: `$summary` and `$docref`
//! - `ips_read` (optional): one read group per IPS profile

pub mod operations;
pub mod read_groups;
pub mod resource_validation;

use crate::bundle_structure::assert_required_member;
use crate::check::Verdict;
use crate::client::FetchedRecord;
use crate::config::ProfileBindings;
use crate::constants::{
    IPS_ALLERGY_INTOLERANCE_PROFILE, IPS_CONDITION_PROFILE, IPS_MEDICATION_STATEMENT_PROFILE,
};
use crate::suite::{CheckDefinition, GroupDefinition, Registry};
use crate::SuiteResult;
use fhir::{Resource, ResourceType};
use read_groups::{register_read_group, ReadSection, READ_GROUPS};

pub use operations::{DOCREF_GROUP_ID, SUMMARY_GROUP_ID};
pub use resource_validation::{BUNDLE_CONTENT_INPUT, RESOURCE_VALIDATION_GROUP_ID};

pub const SUITE_ID: &str = "ips";
pub const OPERATIONS_GROUP_ID: &str = "ips_operations";
pub const READ_GROUP_ID: &str = "ips_read";
const OBSERVATION_GROUP_ID: &str = "ips_observation_profiles";
const OBSERVATION_RESULT_GROUP_ID: &str = "ips_observation_result_profiles";

pub const BUNDLE_PROFILE_KEY: &str = "ips_bundle_profile_url";
pub const COMPOSITION_PROFILE_KEY: &str = "ips_composition_profile_url";
pub const SUMMARY_DEFINITION_KEY: &str = "ips_summary_operation_definition_url";
pub const DOCREF_DEFINITION_KEY: &str = "ips_docref_operation_definition_url";

/// Section members every IPS document must carry: type, profile key, default profile.
const REQUIRED_MEMBERS: &[(ResourceType, &str, &str)] = &[
    (
        ResourceType::MedicationStatement,
        "ips_medication_statement_profile_url",
        IPS_MEDICATION_STATEMENT_PROFILE,
    ),
    (
        ResourceType::AllergyIntolerance,
        "ips_allergy_intolerance_profile_url",
        IPS_ALLERGY_INTOLERANCE_PROFILE,
    ),
    (
        ResourceType::Condition,
        "ips_condition_profile_url",
        IPS_CONDITION_PROFILE,
    ),
];

/// Profile key read by a read group.
pub fn profile_key(group_id: &str) -> String {
    format!("{group_id}_profile_url")
}

/// Every profile key some check reads. A key may be shared: overriding it affects every check
/// that reads it.
pub fn known_profile_keys() -> Vec<String> {
    let mut keys: Vec<String> = [
        BUNDLE_PROFILE_KEY,
        COMPOSITION_PROFILE_KEY,
        SUMMARY_DEFINITION_KEY,
        DOCREF_DEFINITION_KEY,
    ]
    .iter()
    .map(|key| key.to_string())
    .chain(REQUIRED_MEMBERS.iter().map(|(_, key, _)| key.to_string()))
    .chain(READ_GROUPS.iter().map(|row| row.profile_key()))
    .collect();
    keys.sort();
    keys.dedup();
    keys
}

pub fn is_known_profile_key(key: &str) -> bool {
    known_profile_keys().iter().any(|known| known == key)
}

/// Register the whole IPS suite.
pub fn build_registry(profiles: &ProfileBindings) -> SuiteResult<Registry> {
    let mut registry = Registry::new();

    resource_validation::register_resource_validation(&mut registry, profiles)?;
    operations::register_summary_operation(&mut registry, profiles)?;
    operations::register_docref_operation(&mut registry, profiles)?;

    let mut read =
        GroupDefinition::new(READ_GROUP_ID, "IPS Server Read and Validate Profiles Tests")
            .described("Read individual IPS resources and validate them against their profiles.")
            .optional();
    let mut observations = GroupDefinition::new(OBSERVATION_GROUP_ID, "Observation Profiles");
    let mut results =
        GroupDefinition::new(OBSERVATION_RESULT_GROUP_ID, "Observation Result Profiles");

    for spec in READ_GROUPS {
        register_read_group(&mut registry, spec, profiles)?;
        match spec.section {
            ReadSection::General => read = read.group(spec.group_id),
            ReadSection::Observation => {
                if observations.children.is_empty() {
                    read = read.group(OBSERVATION_GROUP_ID);
                }
                observations = observations.group(spec.group_id);
            }
            ReadSection::ObservationResult => {
                if results.children.is_empty() {
                    read = read.group(OBSERVATION_RESULT_GROUP_ID);
                }
                results = results.group(spec.group_id);
            }
        }
    }

    registry.register_group(observations)?;
    registry.register_group(results)?;
    registry.register_group(read)?;

    registry.register_group(
        GroupDefinition::new(
            OPERATIONS_GROUP_ID,
            "IPS Server Operations for Generating IPS Bundles Tests",
        )
        .described("Generate IPS Bundles through $summary and request documents through $docref.")
        .group(SUMMARY_GROUP_ID)
        .group(DOCREF_GROUP_ID),
    )?;

    registry.register_group(
        GroupDefinition::new(SUITE_ID, "International Patient Summary (IPS) v1.1.0")
            .described(format!(
                "Conformance checks for {}.",
                crate::constants::IPS_IG_PACKAGE
            ))
            .group(RESOURCE_VALIDATION_GROUP_ID)
            .group(OPERATIONS_GROUP_ID)
            .group(READ_GROUP_ID),
    )?;

    registry.validate()?;
    Ok(registry)
}

/// The stored response's resource, when it is a Bundle.
pub(crate) fn stored_bundle<'r>(
    record: Option<&'r FetchedRecord>,
    skip_message: &str,
) -> Result<&'r Resource, Verdict> {
    record
        .and_then(FetchedRecord::resource)
        .filter(|resource| resource.is_a(ResourceType::Bundle))
        .ok_or_else(|| Verdict::Skip(skip_message.to_owned()))
}

/// Register one required-member check per [`REQUIRED_MEMBERS`] entry, reading the Bundle stored
/// under `step`. Returns the new check ids in order.
pub(crate) fn register_required_member_checks(
    registry: &mut Registry,
    prefix: &str,
    step: &'static str,
    skip_message: &'static str,
    profiles: &ProfileBindings,
) -> SuiteResult<Vec<String>> {
    let mut ids = Vec::with_capacity(REQUIRED_MEMBERS.len());

    for &(member_type, key, default) in REQUIRED_MEMBERS {
        let profile = profiles.resolve(key, default);
        let check_id = format!("{prefix}_valid_{}", snake_case(member_type.as_str()));

        registry.register_check(
            CheckDefinition::new(
                check_id.clone(),
                format!("Bundle contains valid IPS {member_type} entries"),
                move |ctx| {
                    let document = stored_bundle(ctx.request(step), skip_message)?;
                    assert_required_member(Some(document), member_type, &ctx.checker(), &profile)
                },
            )
            .uses_request(step),
        )?;
        ids.push(check_id);
    }

    Ok(ids)
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
