//! FHIR resource type tags used by the IPS suite.

use std::fmt;
use std::str::FromStr;

/// Resource types the IPS suite reads, validates or inspects inside bundles.
///
/// Bundles may carry other types; those are compared by their string tag through
/// [`crate::Resource::resource_type`] and never need a variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    AllergyIntolerance,
    Bundle,
    CapabilityStatement,
    Composition,
    Condition,
    Device,
    DeviceUseStatement,
    DiagnosticReport,
    DocumentReference,
    ImagingStudy,
    Immunization,
    Media,
    Medication,
    MedicationRequest,
    MedicationStatement,
    Observation,
    OperationOutcome,
    Organization,
    Parameters,
    Patient,
    Practitioner,
    PractitionerRole,
    Procedure,
    Specimen,
}

impl ResourceType {
    /// Every known variant, in declaration order.
    pub const ALL: &'static [ResourceType] = &[
        ResourceType::AllergyIntolerance,
        ResourceType::Bundle,
        ResourceType::CapabilityStatement,
        ResourceType::Composition,
        ResourceType::Condition,
        ResourceType::Device,
        ResourceType::DeviceUseStatement,
        ResourceType::DiagnosticReport,
        ResourceType::DocumentReference,
        ResourceType::ImagingStudy,
        ResourceType::Immunization,
        ResourceType::Media,
        ResourceType::Medication,
        ResourceType::MedicationRequest,
        ResourceType::MedicationStatement,
        ResourceType::Observation,
        ResourceType::OperationOutcome,
        ResourceType::Organization,
        ResourceType::Parameters,
        ResourceType::Patient,
        ResourceType::Practitioner,
        ResourceType::PractitionerRole,
        ResourceType::Procedure,
        ResourceType::Specimen,
    ];

    /// The `resourceType` tag used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::Bundle => "Bundle",
            ResourceType::CapabilityStatement => "CapabilityStatement",
            ResourceType::Composition => "Composition",
            ResourceType::Condition => "Condition",
            ResourceType::Device => "Device",
            ResourceType::DeviceUseStatement => "DeviceUseStatement",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::DocumentReference => "DocumentReference",
            ResourceType::ImagingStudy => "ImagingStudy",
            ResourceType::Immunization => "Immunization",
            ResourceType::Media => "Media",
            ResourceType::Medication => "Medication",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::MedicationStatement => "MedicationStatement",
            ResourceType::Observation => "Observation",
            ResourceType::OperationOutcome => "OperationOutcome",
            ResourceType::Organization => "Organization",
            ResourceType::Parameters => "Parameters",
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::PractitionerRole => "PractitionerRole",
            ResourceType::Procedure => "Procedure",
            ResourceType::Specimen => "Specimen",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = crate::FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .iter()
            .copied()
            .find(|rt| rt.as_str() == s)
            .ok_or_else(|| crate::FhirError::InvalidInput(format!("unknown resource type '{s}'")))
    }
}
