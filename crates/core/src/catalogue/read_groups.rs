//! Read-and-validate groups, one per IPS profile.
//!
//! Every row of [`READ_GROUPS`] becomes the same two-check group: read the record by id and
//! confirm its type and id, then validate the stored response against the row's profile.

use super::profile_key;
use crate::check::{assert_resource_type, assert_response_status, prior_resource};
use crate::config::ProfileBindings;
use crate::conformance::assert_identity;
use crate::constants::HTTP_OK;
use crate::suite::{CheckDefinition, GroupDefinition, InputSpec, Registry};
use crate::SuiteResult;
use fhir::ResourceType;

/// Where a read group sits under the `ips_read` group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadSection {
    General,
    Observation,
    ObservationResult,
}

/// One row of the read-group table.
#[derive(Clone, Copy, Debug)]
pub struct ReadGroupSpec {
    pub group_id: &'static str,
    pub title: &'static str,
    pub resource_type: ResourceType,
    /// Input holding the id to read.
    pub input: &'static str,
    pub input_title: &'static str,
    /// Name the read response is stored under.
    pub step: &'static str,
    /// Profile name under the IPS StructureDefinition base.
    pub profile: &'static str,
    pub section: ReadSection,
}

macro_rules! read_group {
    (
        $id:literal,
        $title:literal,
        $rt:ident,
        $input:literal,
        $input_title:literal,
        $step:literal,
        $profile:literal,
        $section:ident $(,)?
    ) => {
        ReadGroupSpec {
            group_id: $id,
            title: $title,
            resource_type: ResourceType::$rt,
            input: $input,
            input_title: $input_title,
            step: $step,
            profile: $profile,
            section: ReadSection::$section,
        }
    };
}

/// The IPS read groups in suite order.
pub const READ_GROUPS: &[ReadGroupSpec] = &[
    read_group!(
        "ips_allergy_intolerance",
        "Allergy Intolerance (IPS) Tests",
        AllergyIntolerance,
        "allergy_intolerance_id",
        "AllergyIntolerance ID",
        "allergy_intolerance",
        "AllergyIntolerance-cross-border-uv-ips",
        General,
    ),
    read_group!(
        "ips_bundle",
        "Bundle (IPS) Tests",
        Bundle,
        "bundle_id",
        "Bundle ID",
        "bundle",
        "Bundle-cross-border-uv-ips",
        General,
    ),
    read_group!(
        "ips_composition",
        "Composition (IPS) Tests",
        Composition,
        "composition_id",
        "Composition ID",
        "composition",
        "Composition-uv-ips",
        General,
    ),
    read_group!(
        "ips_condition",
        "Condition (IPS) Tests",
        Condition,
        "condition_id",
        "Condition ID",
        "condition",
        "Condition-cross-border-uv-ips",
        General,
    ),
    read_group!(
        "ips_diagnostic_report",
        "DiagnosticReport (IPS) Tests",
        DiagnosticReport,
        "diagnostic_report_id",
        "DiagnosticReport ID",
        "diagnostic_report",
        "DiagnosticReport-uv-ips",
        General,
    ),
    read_group!(
        "ips_device",
        "Device (IPS) Tests",
        Device,
        "device_id",
        "Device ID",
        "device",
        "Device-uv-ips",
        General,
    ),
    read_group!(
        "ips_device_observer",
        "Device (performer, observer) Tests",
        Device,
        "device_id",
        "Device ID",
        "device_observer",
        "Device-observer-uv-ips",
        General,
    ),
    read_group!(
        "ips_device_use_statement",
        "Device Use Statement (IPS) Tests",
        DeviceUseStatement,
        "device_use_statement_id",
        "Device Use Statement ID",
        "device_use_statement",
        "DeviceUseStatement-uv-ips",
        General,
    ),
    read_group!(
        "ips_imaging_study",
        "Imaging Study (IPS) Tests",
        ImagingStudy,
        "imaging_study_id",
        "Imaging Study ID",
        "imaging_study",
        "ImagingStudy-uv-ips",
        General,
    ),
    read_group!(
        "ips_immunization",
        "Immunization (IPS) Tests",
        Immunization,
        "immunization_id",
        "Immunization ID",
        "immunization",
        "Immunization-uv-ips",
        General,
    ),
    read_group!(
        "ips_media_observation",
        "Media observation (Results: laboratory, media) Tests",
        Media,
        "media_id",
        "Media ID",
        "media",
        "Media-observation-uv-ips",
        General,
    ),
    read_group!(
        "ips_medication",
        "Medication (IPS) Tests",
        Medication,
        "medication_id",
        "Medication ID",
        "medication",
        "Medication-cross-border-uv-ips",
        General,
    ),
    read_group!(
        "ips_medication_request",
        "MedicationRequest (IPS) Tests",
        MedicationRequest,
        "medication_request_id",
        "MedicationRequest ID",
        "medication_request",
        "MedicationRequest-uv-ips",
        General,
    ),
    read_group!(
        "ips_medication_statement",
        "Medication Statement (IPS) Tests",
        MedicationStatement,
        "medication_statement_id",
        "MedicationStatement ID",
        "medication_statement",
        "MedicationStatement-uv-ips",
        General,
    ),
    read_group!(
        "ips_observation_alcohol_use",
        "Observation (SH: alcohol use) Tests",
        Observation,
        "observation_alcohol_use_id",
        "Alcohol Use Observation ID",
        "observation_alcohol_use",
        "Observation-alcoholuse-uv-ips",
        Observation,
    ),
    read_group!(
        "ips_observation_pregnancy_edd",
        "Observation (Pregnancy: EDD) Tests",
        Observation,
        "observation_pregnancy_edd_id",
        "Pregnancy EDD Observation ID",
        "observation_pregnancy_edd",
        "Observation-pregnancy-edd-uv-ips",
        Observation,
    ),
    read_group!(
        "ips_observation_pregnancy_outcome",
        "Observation (Pregnancy: outcome) Tests",
        Observation,
        "observation_pregnancy_outcome_id",
        "Pregnancy Outcome Observation ID",
        "observation_pregnancy_outcome",
        "Observation-pregnancy-outcome-uv-ips",
        Observation,
    ),
    read_group!(
        "ips_observation_pregnancy_status",
        "Observation (Pregnancy: status) Tests",
        Observation,
        "observation_pregnancy_status_id",
        "Pregnancy Status Observation ID",
        "observation_pregnancy_status",
        "Observation-pregnancy-status-uv-ips",
        Observation,
    ),
    read_group!(
        "ips_observation_tobacco_use",
        "Observation (SH: tobacco use) Tests",
        Observation,
        "observation_tobacco_use_id",
        "Tobacco Use Observation ID",
        "observation_tobacco_use",
        "Observation-tobaccouse-uv-ips",
        Observation,
    ),
    read_group!(
        "ips_observation_results",
        "Observation Results (IPS) Tests",
        Observation,
        "observation_results_id",
        "Results Observation ID",
        "observation",
        "Observation-results-uv-ips",
        ObservationResult,
    ),
    read_group!(
        "ips_observation_results_laboratory",
        "Observation Results: laboratory (IPS) Tests",
        Observation,
        "observation_results_laboratory_id",
        "Laboratory Results ID",
        "observation_lab",
        "Observation-results-laboratory-uv-ips",
        ObservationResult,
    ),
    read_group!(
        "ips_observation_results_pathology",
        "Observation Results: pathology (IPS) Tests",
        Observation,
        "observation_results_pathology_id",
        "Pathology Results ID",
        "observation_pathology",
        "Observation-results-pathology-uv-ips",
        ObservationResult,
    ),
    read_group!(
        "ips_observation_results_radiology",
        "Observation Results: radiology (IPS) Tests",
        Observation,
        "observation_results_radiology_id",
        "Radiology Results ID",
        "observation_radiology",
        "Observation-results-radiology-uv-ips",
        ObservationResult,
    ),
    read_group!(
        "ips_organization",
        "Organization (IPS) Tests",
        Organization,
        "organization_id",
        "Organization ID",
        "organization",
        "Organization-uv-ips",
        General,
    ),
    read_group!(
        "ips_patient",
        "Patient (IPS) Tests",
        Patient,
        "patient_id",
        "Patient ID",
        "patient",
        "Patient-uv-ips",
        General,
    ),
    read_group!(
        "ips_practitioner",
        "Practitioner (IPS) Tests",
        Practitioner,
        "practitioner_id",
        "Practitioner ID",
        "practitioner",
        "Practitioner-uv-ips",
        General,
    ),
    read_group!(
        "ips_practitioner_role",
        "PractitionerRole (IPS) Tests",
        PractitionerRole,
        "practitioner_role_id",
        "PractitionerRole ID",
        "practitioner_role",
        "PractitionerRole-uv-ips",
        General,
    ),
    read_group!(
        "ips_procedure",
        "Procedure (IPS) Tests",
        Procedure,
        "procedure_id",
        "Procedure ID",
        "procedure",
        "Procedure-uv-ips",
        General,
    ),
    read_group!(
        "ips_specimen",
        "Specimen (IPS) Tests",
        Specimen,
        "specimen_id",
        "Specimen ID",
        "specimen",
        "Specimen-uv-ips",
        General,
    ),
];

impl ReadGroupSpec {
    /// Canonical URL of the row's default profile.
    pub fn default_profile_url(&self) -> String {
        format!(
            "{}/{}",
            crate::constants::IPS_STRUCTURE_DEFINITION_BASE,
            self.profile
        )
    }

    pub fn profile_key(&self) -> String {
        profile_key(self.group_id)
    }

    pub fn read_check_id(&self) -> String {
        format!("{}_read", self.group_id)
    }

    pub fn validation_check_id(&self) -> String {
        format!("{}_validation", self.group_id)
    }
}

/// Register the two checks and the group for one row.
pub fn register_read_group(
    registry: &mut Registry,
    spec: &ReadGroupSpec,
    profiles: &ProfileBindings,
) -> SuiteResult<()> {
    let profile_url = profiles.resolve(&spec.profile_key(), &spec.default_profile_url());
    let resource_type = spec.resource_type;
    let input = spec.input;
    let step = spec.step;

    registry.register_check(
        CheckDefinition::new(
            spec.read_check_id(),
            format!(
                "Server returns correct {resource_type} resource from the {resource_type} \
                 read interaction"
            ),
            move |ctx| {
                let id = ctx.id_input(input)?;
                let record = ctx.fetch(step, resource_type, &id)?;
                assert_response_status(record, HTTP_OK)?;
                let resource = assert_resource_type(record, resource_type)?;
                assert_identity(id.as_str(), resource)
            },
        )
        .described(format!(
            "Verify that {resource_type} resources can be read from the server."
        ))
        .with_input(InputSpec::required(input).titled(spec.input_title))
        .makes_request(step),
    )?;

    registry.register_check(
        CheckDefinition::new(
            spec.validation_check_id(),
            format!("{resource_type} resources conform to the {} profile", spec.profile),
            move |ctx| {
                let resource = prior_resource(ctx.request(step), step)?;
                ctx.checker().assert_valid(resource, &profile_url)
            },
        )
        .uses_request(step),
    )?;

    registry.register_group(
        GroupDefinition::new(spec.group_id, spec.title)
            .described(format!(
                "Verify support for the server capabilities required by the {} profile.",
                spec.profile
            ))
            .check(spec.read_check_id())
            .check(spec.validation_check_id()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn group_ids_and_check_ids_are_unique() {
        let ids: BTreeSet<_> = READ_GROUPS.iter().map(|row| row.group_id).collect();
        assert_eq!(ids.len(), READ_GROUPS.len());
    }

    #[test]
    fn cross_border_profiles_are_preferred() {
        for group_id in [
            "ips_allergy_intolerance",
            "ips_bundle",
            "ips_condition",
            "ips_medication",
        ] {
            let row = READ_GROUPS
                .iter()
                .find(|row| row.group_id == group_id)
                .expect("row");
            assert!(row.profile.contains("cross-border"), "{group_id}");
        }
    }

    #[test]
    fn default_profile_urls_are_canonical() {
        let patient = READ_GROUPS
            .iter()
            .find(|row| row.group_id == "ips_patient")
            .expect("patient row");
        assert_eq!(
            patient.default_profile_url(),
            "http://hl7.org/fhir/uv/ips/StructureDefinition/Patient-uv-ips"
        );
        assert_eq!(patient.profile_key(), "ips_patient_profile_url");
    }
}
