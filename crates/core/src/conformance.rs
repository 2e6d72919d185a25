//! Profile conformance checking.
//!
//! Delegates records to the external [`ResourceValidator`], filters the returned issues through
//! the run's [`MessageFilterPolicy`] and turns what survives into a verdict: a check fails iff at
//! least one error-level issue remains, and the failure message lists every one of them.

use crate::check::{CheckOutcome, CheckResult, Verdict};
use crate::filter::MessageFilterPolicy;
use crate::validator::{ResourceValidator, ValidationIssue};
use fhir::Resource;
use std::collections::BTreeMap;

/// Validates records against profiles for one run.
#[derive(Clone, Copy)]
pub struct ConformanceChecker<'a> {
    validator: &'a dyn ResourceValidator,
    filters: &'a MessageFilterPolicy,
}

impl<'a> ConformanceChecker<'a> {
    pub fn new(validator: &'a dyn ResourceValidator, filters: &'a MessageFilterPolicy) -> Self {
        Self { validator, filters }
    }

    /// Validate one record against `profile_url`.
    pub fn check_conformance(&self, resource: &Resource, profile_url: &str) -> CheckResult {
        self.assert_valid(resource, profile_url).into()
    }

    /// Validate every record whose type appears in `profiles` against that type's profile.
    ///
    /// Records of unlisted types are ignored. The result fails if any validated record fails;
    /// the message covers all of them.
    pub fn check_conformance_many<'r, I>(
        &self,
        resources: I,
        profiles: &BTreeMap<String, String>,
    ) -> CheckResult
    where
        I: IntoIterator<Item = &'r Resource>,
    {
        self.assert_all_valid(resources, profiles).into()
    }

    /// [`Self::check_conformance`] as a check body step.
    pub fn assert_valid(&self, resource: &Resource, profile_url: &str) -> CheckOutcome {
        let errors = self.surviving_errors(resource, profile_url)?;
        if errors.is_empty() {
            return Ok(());
        }
        Err(Verdict::Fail(format!(
            "{} does not conform to profile {profile_url}:\n{}",
            resource.reference_label(),
            bullet_list(&errors)
        )))
    }

    /// [`Self::check_conformance_many`] as a check body step.
    pub fn assert_all_valid<'r, I>(
        &self,
        resources: I,
        profiles: &BTreeMap<String, String>,
    ) -> CheckOutcome
    where
        I: IntoIterator<Item = &'r Resource>,
    {
        let mut failures = Vec::new();

        for resource in resources {
            let Some(profile_url) = profiles.get(resource.resource_type()) else {
                continue;
            };
            let errors = self.surviving_errors(resource, profile_url)?;
            if !errors.is_empty() {
                failures.push(format!(
                    "{} does not conform to profile {profile_url}:\n{}",
                    resource.reference_label(),
                    bullet_list(&errors)
                ));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Verdict::Fail(failures.join("\n")))
        }
    }

    fn surviving_errors(
        &self,
        resource: &Resource,
        profile_url: &str,
    ) -> Result<Vec<ValidationIssue>, Verdict> {
        let issues = self.validator.validate(resource, profile_url).map_err(|e| {
            tracing::warn!(
                "validation of {} against {profile_url} failed: {e}",
                resource.reference_label()
            );
            Verdict::Error(format!(
                "Unable to validate {} against {profile_url}: {e}",
                resource.reference_label()
            ))
        })?;

        Ok(self
            .filters
            .apply(issues)
            .into_iter()
            .filter(ValidationIssue::is_error)
            .collect())
    }
}

/// Identity check after a read: the returned record must carry the requested id.
pub fn check_identity(requested_id: &str, resource: &Resource) -> CheckResult {
    assert_identity(requested_id, resource).into()
}

/// [`check_identity`] as a check body step.
pub fn assert_identity(requested_id: &str, resource: &Resource) -> CheckOutcome {
    let received = resource.id().unwrap_or("<none>");
    if received == requested_id {
        Ok(())
    } else {
        Err(Verdict::Fail(format!(
            "Requested resource with id {requested_id}, received resource with id {received}"
        )))
    }
}

fn bullet_list(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("- {}: {}", issue.severity, issue.message()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::check::CheckStatus;
    use crate::{SuiteError, SuiteResult};
    use fhir::IssueSeverity;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Validator returning canned issues keyed by `(resource id, profile)`.
    #[derive(Default)]
    pub(crate) struct StubValidator {
        pub issues: HashMap<(String, String), Vec<ValidationIssue>>,
        pub unavailable: bool,
        pub calls: AtomicUsize,
    }

    impl StubValidator {
        pub fn with(mut self, id: &str, profile: &str, issues: Vec<ValidationIssue>) -> Self {
            self.issues
                .insert((id.to_string(), profile.to_string()), issues);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ResourceValidator for StubValidator {
        fn validate(
            &self,
            resource: &Resource,
            profile_url: &str,
        ) -> SuiteResult<Vec<ValidationIssue>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(SuiteError::Validator("connection refused".into()));
            }
            let key = (
                resource.id().unwrap_or_default().to_string(),
                profile_url.to_string(),
            );
            Ok(self.issues.get(&key).cloned().unwrap_or_default())
        }
    }

    pub(crate) fn error(text: &str) -> ValidationIssue {
        ValidationIssue::new(IssueSeverity::Error, Some("Resource"), text)
    }

    fn resource(rt: &str, id: &str) -> Resource {
        Resource::from_value(json!({"resourceType": rt, "id": id})).expect("resource")
    }

    const PROFILE: &str = "http://example.org/StructureDefinition/p";

    #[test]
    fn passes_without_issues() {
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let checker = ConformanceChecker::new(&validator, &filters);
        assert!(checker
            .check_conformance(&resource("Patient", "p1"), PROFILE)
            .is_pass());
    }

    #[test]
    fn warnings_alone_do_not_fail() {
        let validator = StubValidator::default().with(
            "p1",
            PROFILE,
            vec![ValidationIssue::new(IssueSeverity::Warning, None, "style")],
        );
        let filters = MessageFilterPolicy::none();
        let checker = ConformanceChecker::new(&validator, &filters);
        assert!(checker
            .check_conformance(&resource("Patient", "p1"), PROFILE)
            .is_pass());
    }

    #[test]
    fn failure_lists_every_surviving_error() {
        let validator = StubValidator::default().with(
            "p1",
            PROFILE,
            vec![error("first problem"), error("second problem")],
        );
        let filters = MessageFilterPolicy::none();
        let checker = ConformanceChecker::new(&validator, &filters);
        let result = checker.check_conformance(&resource("Patient", "p1"), PROFILE);
        assert_eq!(result.status(), CheckStatus::Fail);
        let msg = result.message().expect("message");
        assert!(msg.contains("first problem"));
        assert!(msg.contains("second problem"));
        assert!(msg.contains("Patient/p1"));
    }

    #[test]
    fn sole_filtered_issue_passes() {
        let validator = StubValidator::default().with(
            "b1",
            PROFILE,
            vec![ValidationIssue::new(
                IssueSeverity::Error,
                Some("Bundle.entry[0].fullUrl"),
                "URL value 'http://example.org/Patient/1' does not resolve",
            )],
        );
        let filters = MessageFilterPolicy::ips_default().expect("default filters");
        let checker = ConformanceChecker::new(&validator, &filters);
        assert!(checker
            .check_conformance(&resource("Bundle", "b1"), PROFILE)
            .is_pass());
    }

    #[test]
    fn validator_outage_is_an_error() {
        let validator = StubValidator {
            unavailable: true,
            ..StubValidator::default()
        };
        let filters = MessageFilterPolicy::none();
        let checker = ConformanceChecker::new(&validator, &filters);
        let result = checker.check_conformance(&resource("Patient", "p1"), PROFILE);
        assert_eq!(result.status(), CheckStatus::Error);
    }

    #[test]
    fn repeated_checks_are_stable() {
        let validator =
            StubValidator::default().with("p1", PROFILE, vec![error("always wrong")]);
        let filters = MessageFilterPolicy::none();
        let checker = ConformanceChecker::new(&validator, &filters);
        let first = checker.check_conformance(&resource("Patient", "p1"), PROFILE);
        let second = checker.check_conformance(&resource("Patient", "p1"), PROFILE);
        assert_eq!(first, second);
    }

    #[test]
    fn many_skips_unmapped_types_and_reports_all_failures() {
        let condition_profile = "http://example.org/StructureDefinition/condition";
        let validator = StubValidator::default()
            .with("c1", condition_profile, vec![error("c1 bad")])
            .with("c2", condition_profile, vec![error("c2 bad")])
            .with("o1", condition_profile, vec![error("never asked")]);
        let filters = MessageFilterPolicy::none();
        let checker = ConformanceChecker::new(&validator, &filters);

        let records = [
            resource("Condition", "c1"),
            resource("Observation", "o1"),
            resource("Condition", "c2"),
        ];
        let profiles = BTreeMap::from([("Condition".to_string(), condition_profile.to_string())]);
        let result = checker.check_conformance_many(records.iter(), &profiles);

        assert_eq!(result.status(), CheckStatus::Fail);
        let msg = result.message().expect("message");
        assert!(msg.contains("c1 bad"));
        assert!(msg.contains("c2 bad"));
        assert!(!msg.contains("never asked"));
        assert_eq!(validator.call_count(), 2);
    }

    #[test]
    fn identity_mismatch_names_both_ids() {
        let result = check_identity("xyz", &resource("Patient", "abc"));
        assert_eq!(result.status(), CheckStatus::Fail);
        let msg = result.message().expect("message");
        assert!(msg.contains("xyz"));
        assert!(msg.contains("abc"));
        assert!(check_identity("abc", &resource("Patient", "abc")).is_pass());
    }
}
