//! Group execution.
//!
//! Checks inside a group run strictly in declaration order and share that group's request cache.
//! Sibling groups share nothing but read-only run state, so they may run on scoped threads when
//! [`RunOptions::parallel_groups`] is set. Cancellation is honoured between checks only.

use super::context::{CheckContext, RequestCache};
use super::definition::{CheckDefinition, GroupChild, GroupDefinition};
use super::registry::Registry;
use crate::check::CheckResult;
use crate::client::FhirClient;
use crate::conformance::ConformanceChecker;
use crate::filter::MessageFilterPolicy;
use crate::report::{CheckReport, GroupReport, ReportNode, ReportStatus, SuiteReport};
use crate::validator::ResourceValidator;
use crate::{SuiteError, SuiteResult};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run sibling groups concurrently.
    pub parallel_groups: bool,
}

/// Run-level abort switch. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reduce child statuses to a group status.
///
/// Any mandatory `fail` or `error` fails the group. Otherwise any `pass` passes it. Otherwise the
/// group is a `skip`, or `not_run` when no child ran at all. Optional children contribute passes
/// and skips but never fail the group.
pub fn aggregate<I>(children: I) -> ReportStatus
where
    I: IntoIterator<Item = (ReportStatus, bool)>,
{
    let mut any_pass = false;
    let mut any_ran = false;
    let mut empty = true;

    for (status, optional) in children {
        empty = false;
        match status {
            ReportStatus::Fail | ReportStatus::Error if !optional => return ReportStatus::Fail,
            ReportStatus::Pass => any_pass = true,
            _ => {}
        }
        if status != ReportStatus::NotRun {
            any_ran = true;
        }
    }

    if any_pass {
        ReportStatus::Pass
    } else if empty || any_ran {
        ReportStatus::Skip
    } else {
        ReportStatus::NotRun
    }
}

/// Executes groups from a [`Registry`] against the configured collaborators.
#[derive(Clone)]
pub struct Runner<'a> {
    registry: &'a Registry,
    client: Option<&'a dyn FhirClient>,
    validator: &'a dyn ResourceValidator,
    filters: &'a MessageFilterPolicy,
    options: RunOptions,
    cancellation: CancellationFlag,
}

impl<'a> Runner<'a> {
    pub fn new(
        registry: &'a Registry,
        validator: &'a dyn ResourceValidator,
        filters: &'a MessageFilterPolicy,
    ) -> Self {
        Self {
            registry,
            client: None,
            validator,
            filters,
            options: RunOptions::default(),
            cancellation: CancellationFlag::default(),
        }
    }

    pub fn with_client(mut self, client: Option<&'a dyn FhirClient>) -> Self {
        self.client = client;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Run `group_id` and wrap the result in a timed [`SuiteReport`].
    pub fn run(
        &self,
        group_id: &str,
        inputs: &BTreeMap<String, String>,
    ) -> SuiteResult<SuiteReport> {
        let started_at = Utc::now();
        let root = self.run_group(group_id, inputs)?;
        let report = SuiteReport::new(started_at, root);
        tracing::info!(
            "run {} finished with status {}",
            report.run_id,
            report.status()
        );
        Ok(report)
    }

    /// Run one group and everything beneath it.
    ///
    /// # Errors
    ///
    /// Only registry problems (unknown ids) are errors. Every finding about the system under
    /// test is recorded in the returned report.
    pub fn run_group(
        &self,
        group_id: &str,
        inputs: &BTreeMap<String, String>,
    ) -> SuiteResult<GroupReport> {
        let group = self.registry.group(group_id)?;
        tracing::info!("group {}: started", group.id);

        let mut nested = self.run_nested_groups(group, inputs)?;
        let mut requests = RequestCache::new();
        let mut children = Vec::with_capacity(group.children.len());

        for (index, child) in group.children.iter().enumerate() {
            let node = match child {
                GroupChild::Check(check_id) => {
                    let check = self.registry.check(check_id)?;
                    ReportNode::Check(self.run_check(check, inputs, &mut requests))
                }
                GroupChild::Group(child_id) => match nested.remove(&index) {
                    Some(report) => ReportNode::Group(report),
                    None => ReportNode::Group(self.run_group(child_id, inputs)?),
                },
            };
            children.push(node);
        }

        let status = aggregate(children.iter().map(|c| (c.status(), c.optional())));
        tracing::info!("group {}: finished with status {status}", group.id);

        Ok(GroupReport {
            id: group.id.clone(),
            title: group.title.clone(),
            optional: group.optional,
            status,
            children,
        })
    }

    /// Child groups run concurrently up front when enabled. Keys are child positions.
    fn run_nested_groups(
        &self,
        group: &GroupDefinition,
        inputs: &BTreeMap<String, String>,
    ) -> SuiteResult<BTreeMap<usize, GroupReport>> {
        let nested: Vec<(usize, &str)> = group
            .children
            .iter()
            .enumerate()
            .filter_map(|(index, child)| match child {
                GroupChild::Group(id) => Some((index, id.as_str())),
                GroupChild::Check(_) => None,
            })
            .collect();

        if !self.options.parallel_groups || nested.len() < 2 {
            return Ok(BTreeMap::new());
        }

        std::thread::scope(|scope| {
            let handles: Vec<_> = nested
                .iter()
                .map(|&(index, id)| (index, id, scope.spawn(move || self.run_group(id, inputs))))
                .collect();

            handles
                .into_iter()
                .map(|(index, id, handle)| -> SuiteResult<(usize, GroupReport)> {
                    let report = handle
                        .join()
                        .map_err(|_| SuiteError::WorkerPanicked(id.to_owned()))??;
                    Ok((index, report))
                })
                .collect()
        })
    }

    fn run_check(
        &self,
        check: &CheckDefinition,
        run_inputs: &BTreeMap<String, String>,
        requests: &mut RequestCache,
    ) -> CheckReport {
        if self.cancellation.is_cancelled() {
            tracing::debug!("check {}: not_run (run cancelled)", check.id);
            return CheckReport::not_run(&check.id, &check.title, check.optional);
        }

        tracing::debug!("check {}: not_run -> running", check.id);
        let result = match resolve_inputs(check, run_inputs) {
            Ok(inputs) => {
                let checker = ConformanceChecker::new(self.validator, self.filters);
                let mut ctx = CheckContext::new(&inputs, self.client, checker, requests);
                CheckResult::from((check.body)(&mut ctx))
            }
            Err(missing) => CheckResult::skip(format!("Input '{missing}' was not provided")),
        };
        tracing::debug!("check {}: running -> {}", check.id, result.status());

        CheckReport::from_result(&check.id, &check.title, check.optional, result)
    }
}

/// Run values over declared defaults. Returns the first missing required input.
fn resolve_inputs(
    check: &CheckDefinition,
    run_inputs: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, String> {
    let mut resolved = run_inputs.clone();

    for spec in &check.inputs {
        let present = resolved
            .get(&spec.name)
            .is_some_and(|value| !value.trim().is_empty());
        if present {
            continue;
        }
        match &spec.default {
            Some(default) => {
                resolved.insert(spec.name.clone(), default.clone());
            }
            None if spec.optional => {}
            None => return Err(spec.name.clone()),
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{ensure, Verdict};
    use crate::client::{FetchedRecord, OperationMethod};
    use crate::conformance::tests::StubValidator;
    use crate::suite::definition::InputSpec;
    use fhir::ResourceType;
    use ips_types::ResourceId;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingClient {
        calls: AtomicUsize,
    }

    impl FhirClient for CountingClient {
        fn fetch(&self, resource_type: ResourceType, id: &ResourceId) -> FetchedRecord {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FetchedRecord::from_response(
                200,
                &json!({"resourceType": resource_type.as_str(), "id": id.as_str()}).to_string(),
            )
        }

        fn invoke(
            &self,
            _operation_path: &str,
            _method: OperationMethod,
            _body: Option<&serde_json::Value>,
        ) -> FetchedRecord {
            self.calls.fetch_add(1, Ordering::SeqCst);
            FetchedRecord::from_response(404, "")
        }
    }

    fn inputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn status_of(report: &GroupReport, id: &str) -> ReportStatus {
        report.find_check(id).map(|c| c.status).expect("check present")
    }

    #[test]
    fn aggregation_rules() {
        use ReportStatus::*;
        assert_eq!(aggregate([(Pass, false), (Fail, false)]), Fail);
        assert_eq!(aggregate([(Pass, false), (Error, false)]), Fail);
        assert_eq!(aggregate([(Pass, false), (Fail, true)]), Pass);
        assert_eq!(aggregate([(Skip, false), (Fail, true)]), Skip);
        assert_eq!(aggregate([(Skip, false), (Pass, false)]), Pass);
        assert_eq!(aggregate(Vec::<(ReportStatus, bool)>::new()), Skip);
        assert_eq!(aggregate([(NotRun, false), (NotRun, false)]), NotRun);
        assert_eq!(aggregate([(Skip, false), (NotRun, false)]), Skip);
    }

    fn read_registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_check(
                CheckDefinition::new("read", "Read patient", |ctx| {
                    let id = ctx.id_input("patient_id")?;
                    let record = ctx.fetch("patient", ResourceType::Patient, &id)?;
                    ensure(record.is_success(), "read failed")
                })
                .with_input(InputSpec::required("patient_id"))
                .makes_request("patient"),
            )
            .expect("read");
        registry
            .register_check(
                CheckDefinition::new("reuse", "Reuse patient", |ctx| {
                    let record = ctx
                        .request("patient")
                        .ok_or_else(|| Verdict::Skip("no patient".into()))?;
                    ensure(record.record_id() == Some("abc"), "wrong id")
                })
                .uses_request("patient"),
            )
            .expect("reuse");
        registry
            .register_group(GroupDefinition::new("g", "Group").check("read").check("reuse"))
            .expect("group");
        registry
    }

    #[test]
    fn later_checks_reuse_the_cached_request() {
        let registry = read_registry();
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let client = CountingClient::default();
        let runner = Runner::new(&registry, &validator, &filters).with_client(Some(&client));

        let report = runner
            .run_group("g", &inputs(&[("patient_id", "abc")]))
            .expect("run");
        assert_eq!(report.status, ReportStatus::Pass);
        assert_eq!(status_of(&report, "reuse"), ReportStatus::Pass);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_input_skips_and_dependants_skip_too() {
        let registry = read_registry();
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let client = CountingClient::default();
        let runner = Runner::new(&registry, &validator, &filters).with_client(Some(&client));

        let report = runner.run_group("g", &BTreeMap::new()).expect("run");
        let read = report.find_check("read").expect("read");
        assert_eq!(read.status, ReportStatus::Skip);
        assert!(read.message.as_deref().unwrap_or_default().contains("patient_id"));
        assert_eq!(status_of(&report, "reuse"), ReportStatus::Skip);
        assert_eq!(report.status, ReportStatus::Skip);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn declared_default_fills_missing_input() {
        let mut registry = Registry::new();
        registry
            .register_check(
                CheckDefinition::new("echo", "Echo", |ctx| {
                    ensure(ctx.input("mode")? == "strict", "unexpected mode")
                })
                .with_input(InputSpec::required("mode").with_default("strict")),
            )
            .expect("check");
        registry
            .register_group(GroupDefinition::new("g", "G").check("echo"))
            .expect("group");
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let runner = Runner::new(&registry, &validator, &filters);

        let report = runner.run_group("g", &BTreeMap::new()).expect("run");
        assert_eq!(report.status, ReportStatus::Pass);
    }

    #[test]
    fn failure_does_not_stop_siblings() {
        let mut registry = Registry::new();
        registry
            .register_check(CheckDefinition::new("bad", "Bad", |_| {
                Err(Verdict::Fail("broken".into()))
            }))
            .expect("bad");
        registry
            .register_check(CheckDefinition::new("good", "Good", |_| Ok(())))
            .expect("good");
        registry
            .register_group(GroupDefinition::new("g", "G").check("bad").check("good"))
            .expect("group");
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let runner = Runner::new(&registry, &validator, &filters);

        let report = runner.run_group("g", &BTreeMap::new()).expect("run");
        assert_eq!(report.status, ReportStatus::Fail);
        assert_eq!(status_of(&report, "good"), ReportStatus::Pass);
    }

    #[test]
    fn no_server_means_skip() {
        let registry = read_registry();
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let runner = Runner::new(&registry, &validator, &filters);

        let report = runner
            .run_group("g", &inputs(&[("patient_id", "abc")]))
            .expect("run");
        assert_eq!(status_of(&report, "read"), ReportStatus::Skip);
    }

    #[test]
    fn cancelled_run_reports_not_run() {
        let registry = read_registry();
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let cancellation = CancellationFlag::new();
        cancellation.cancel();
        let runner =
            Runner::new(&registry, &validator, &filters).with_cancellation(cancellation.clone());

        let report = runner
            .run_group("g", &inputs(&[("patient_id", "abc")]))
            .expect("run");
        assert!(cancellation.is_cancelled());
        assert_eq!(status_of(&report, "read"), ReportStatus::NotRun);
        assert_eq!(report.status, ReportStatus::NotRun);
    }

    #[test]
    fn parallel_groups_match_sequential_results() {
        let mut registry = read_registry();
        registry
            .register_group(GroupDefinition::new("g2", "Second").check("read").check("reuse"))
            .expect("g2");
        registry
            .register_group(GroupDefinition::new("root", "Root").group("g").group("g2"))
            .expect("root");
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let client = CountingClient::default();
        let run_inputs = inputs(&[("patient_id", "abc")]);

        let sequential = Runner::new(&registry, &validator, &filters)
            .with_client(Some(&client))
            .run_group("root", &run_inputs)
            .expect("sequential");
        let parallel = Runner::new(&registry, &validator, &filters)
            .with_client(Some(&client))
            .with_options(RunOptions {
                parallel_groups: true,
            })
            .run_group("root", &run_inputs)
            .expect("parallel");

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.status, ReportStatus::Pass);
        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn unknown_group_is_an_engine_error() {
        let registry = Registry::new();
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let runner = Runner::new(&registry, &validator, &filters);
        assert!(matches!(
            runner.run_group("nope", &BTreeMap::new()),
            Err(SuiteError::UnknownGroup(_))
        ));
    }

    #[test]
    fn suite_report_wraps_group() {
        let registry = read_registry();
        let validator = StubValidator::default();
        let filters = MessageFilterPolicy::none();
        let client = CountingClient::default();
        let runner = Runner::new(&registry, &validator, &filters).with_client(Some(&client));

        let report = runner
            .run("g", &inputs(&[("patient_id", "abc")]))
            .expect("run");
        assert_eq!(report.root.id, "g");
        assert!(report.finished_at >= report.started_at);
        assert_eq!(report.totals().pass, 2);
    }
}
