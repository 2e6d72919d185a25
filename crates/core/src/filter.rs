//! Validator message filtering.
//!
//! Some validator findings are known false positives in this context, such as canonical URLs
//! that cannot be resolved while validating offline. A [`MessageFilterPolicy`] is an ordered set
//! of regex rules; an issue whose [`ValidationIssue::message`] matches any rule is dropped before
//! a verdict is computed.

use crate::constants::DEFAULT_MESSAGE_FILTERS;
use crate::validator::ValidationIssue;
use crate::{SuiteError, SuiteResult};
use regex::Regex;

/// Ordered list of suppression rules, configured once per run.
#[derive(Clone, Debug, Default)]
pub struct MessageFilterPolicy {
    rules: Vec<Regex>,
}

impl MessageFilterPolicy {
    /// Compile a policy from regex patterns.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::FilterPattern`] naming the first pattern that does not compile.
    pub fn new<I, S>(patterns: I) -> SuiteResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| SuiteError::FilterPattern {
                    pattern: pattern.to_owned(),
                    source,
                })
            })
            .collect::<SuiteResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// A policy that suppresses nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// The IPS default rules.
    pub fn ips_default() -> SuiteResult<Self> {
        Self::new(DEFAULT_MESSAGE_FILTERS)
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.rules.iter().map(Regex::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any rule matches the issue.
    pub fn is_suppressed(&self, issue: &ValidationIssue) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let message = issue.message();
        self.rules.iter().any(|rule| rule.is_match(&message))
    }

    /// Drop suppressed issues, keeping the order of the rest.
    pub fn apply(&self, issues: Vec<ValidationIssue>) -> Vec<ValidationIssue> {
        issues
            .into_iter()
            .filter(|issue| !self.is_suppressed(issue))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::IssueSeverity;

    fn unresolved_url_issue() -> ValidationIssue {
        ValidationIssue::new(
            IssueSeverity::Error,
            Some("Bundle.entry[1].resource.meta.source"),
            "URL value 'http://example.org/source' does not resolve",
        )
    }

    #[test]
    fn default_policy_suppresses_unresolvable_urls() {
        let policy = MessageFilterPolicy::ips_default().expect("default rules compile");
        assert!(policy.is_suppressed(&unresolved_url_issue()));
        let bare = ValidationIssue::new(
            IssueSeverity::Error,
            None,
            "URL value 'http://x' does not resolve",
        );
        assert!(policy.is_suppressed(&bare));
    }

    #[test]
    fn default_policy_keeps_real_errors() {
        let policy = MessageFilterPolicy::ips_default().expect("default rules compile");
        let real = ValidationIssue::new(
            IssueSeverity::Error,
            Some("Composition.subject"),
            "minimum required = 1, but only found 0",
        );
        assert!(!policy.is_suppressed(&real));
    }

    #[test]
    fn apply_preserves_order_of_survivors() {
        let policy = MessageFilterPolicy::new(["^drop"]).expect("compile");
        let issues = vec![
            ValidationIssue::new(IssueSeverity::Error, None, "first"),
            ValidationIssue::new(IssueSeverity::Error, None, "drop me"),
            ValidationIssue::new(IssueSeverity::Warning, None, "second"),
        ];
        let kept: Vec<_> = policy.apply(issues).into_iter().map(|i| i.text).collect();
        assert_eq!(kept, vec!["first", "second"]);
    }

    #[test]
    fn empty_policy_suppresses_nothing() {
        assert!(!MessageFilterPolicy::none().is_suppressed(&unresolved_url_issue()));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let err = MessageFilterPolicy::new(["(unclosed"]).expect_err("invalid regex");
        match err {
            SuiteError::FilterPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected FilterPattern error, got {other:?}"),
        }
    }
}
