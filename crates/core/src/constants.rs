//! Constants used throughout the IPS core crate.
//!
//! Canonical URLs for the IPS v1.1.0 profiles and operations, plus collaborator defaults.

/// FHIR package of the Implementation Guide under test.
pub const IPS_IG_PACKAGE: &str = "hl7.fhir.uv.ips#1.1.0";

/// Base of every IPS StructureDefinition canonical.
pub const IPS_STRUCTURE_DEFINITION_BASE: &str = "http://hl7.org/fhir/uv/ips/StructureDefinition";

/// Bundle (IPS) profile.
pub const IPS_BUNDLE_PROFILE: &str = "http://hl7.org/fhir/uv/ips/StructureDefinition/Bundle-uv-ips";

/// Composition (IPS) profile.
pub const IPS_COMPOSITION_PROFILE: &str =
    "http://hl7.org/fhir/uv/ips/StructureDefinition/Composition-uv-ips";

/// MedicationStatement (IPS) profile.
pub const IPS_MEDICATION_STATEMENT_PROFILE: &str =
    "http://hl7.org/fhir/uv/ips/StructureDefinition/MedicationStatement-uv-ips";

/// AllergyIntolerance (IPS) profile.
pub const IPS_ALLERGY_INTOLERANCE_PROFILE: &str =
    "http://hl7.org/fhir/uv/ips/StructureDefinition/AllergyIntolerance-uv-ips";

/// Condition (IPS) profile.
pub const IPS_CONDITION_PROFILE: &str =
    "http://hl7.org/fhir/uv/ips/StructureDefinition/Condition-uv-ips";

/// `$summary` operation definition.
pub const IPS_SUMMARY_OPERATION_DEFINITION: &str =
    "http://hl7.org/fhir/uv/ips/OperationDefinition/summary";

/// Operation names accepted as `$summary` (compared lower-cased).
pub const SUMMARY_OPERATION_NAMES: &[&str] = &["summary", "patient-summary"];

/// `$docref` operation definition (International Patient Access IG).
pub const IPA_DOCREF_OPERATION_DEFINITION: &str =
    "http://hl7.org/fhir/uv/ipa/OperationDefinition/docref";

/// Operation names accepted as `$docref` (compared lower-cased).
pub const DOCREF_OPERATION_NAMES: &[&str] = &["docref"];

/// Status code every read and operation check expects.
pub const HTTP_OK: u16 = 200;

/// Synthetic status recorded when the transport fails before any response arrives.
pub const TRANSPORT_ERROR_STATUS: u16 = 0;

/// Default external validator base URL.
pub const DEFAULT_VALIDATOR_URL: &str = "http://localhost:4567";

/// Default transport timeout for server and validator calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Validator messages suppressed unless a run configures its own list.
///
/// Canonical URLs inside IPS examples do not resolve when validating offline.
pub const DEFAULT_MESSAGE_FILTERS: &[&str] = &[r"\A(\S+: )*URL value '.*' does not resolve"];

/// Media type requested from FHIR servers.
pub const FHIR_JSON_MEDIA_TYPE: &str = "application/fhir+json";
