//! Run reports.
//!
//! A [`SuiteReport`] is the tree of group and check outcomes for one run, with the run's id and
//! timing. It serialises to JSON and renders as indented text.

use crate::check::{CheckResult, CheckStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Status shown in a report. Adds `not_run` for checks a cancelled run never reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pass,
    Fail,
    Skip,
    Error,
    NotRun,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pass => "pass",
            ReportStatus::Fail => "fail",
            ReportStatus::Skip => "skip",
            ReportStatus::Error => "error",
            ReportStatus::NotRun => "not_run",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CheckStatus> for ReportStatus {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Pass => ReportStatus::Pass,
            CheckStatus::Fail => ReportStatus::Fail,
            CheckStatus::Skip => ReportStatus::Skip,
            CheckStatus::Error => ReportStatus::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub id: String,
    pub title: String,
    pub optional: bool,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl CheckReport {
    pub fn from_result(id: &str, title: &str, optional: bool, result: CheckResult) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            optional,
            status: result.status().into(),
            message: result.message().map(str::to_owned),
        }
    }

    pub fn not_run(id: &str, title: &str, optional: bool) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            optional,
            status: ReportStatus::NotRun,
            message: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReport {
    pub id: String,
    pub title: String,
    pub optional: bool,
    pub status: ReportStatus,
    pub children: Vec<ReportNode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportNode {
    Check(CheckReport),
    Group(GroupReport),
}

impl ReportNode {
    pub fn status(&self) -> ReportStatus {
        match self {
            ReportNode::Check(check) => check.status,
            ReportNode::Group(group) => group.status,
        }
    }

    pub fn optional(&self) -> bool {
        match self {
            ReportNode::Check(check) => check.optional,
            ReportNode::Group(group) => group.optional,
        }
    }
}

impl GroupReport {
    /// Find a check anywhere in the tree by id (first match in document order).
    pub fn find_check(&self, id: &str) -> Option<&CheckReport> {
        self.children.iter().find_map(|child| match child {
            ReportNode::Check(check) if check.id == id => Some(check),
            ReportNode::Check(_) => None,
            ReportNode::Group(group) => group.find_check(id),
        })
    }

    /// Find a nested group by id, including this one.
    pub fn find_group(&self, id: &str) -> Option<&GroupReport> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            ReportNode::Group(group) => group.find_group(id),
            ReportNode::Check(_) => None,
        })
    }
}

/// Number of checks per status across a report tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub error: usize,
    pub not_run: usize,
}

impl StatusTotals {
    fn add(&mut self, status: ReportStatus) {
        match status {
            ReportStatus::Pass => self.pass += 1,
            ReportStatus::Fail => self.fail += 1,
            ReportStatus::Skip => self.skip += 1,
            ReportStatus::Error => self.error += 1,
            ReportStatus::NotRun => self.not_run += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.skip + self.error + self.not_run
    }
}

/// The outcome of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub root: GroupReport,
}

impl SuiteReport {
    pub fn new(started_at: DateTime<Utc>, root: GroupReport) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            root,
        }
    }

    pub fn status(&self) -> ReportStatus {
        self.root.status
    }

    /// Check counts per status. Groups are not counted.
    pub fn totals(&self) -> StatusTotals {
        fn walk(group: &GroupReport, totals: &mut StatusTotals) {
            for child in &group.children {
                match child {
                    ReportNode::Check(check) => totals.add(check.status),
                    ReportNode::Group(nested) => walk(nested, totals),
                }
            }
        }

        let mut totals = StatusTotals::default();
        walk(&self.root, &mut totals);
        totals
    }

    /// Indented plain-text rendering, one line per node, followed by the totals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run {} ({})", self.run_id, self.started_at.to_rfc3339());
        render_group(&self.root, 0, &mut out);

        let totals = self.totals();
        let _ = writeln!(
            out,
            "\n{} checks: {} pass, {} fail, {} skip, {} error, {} not run",
            totals.total(),
            totals.pass,
            totals.fail,
            totals.skip,
            totals.error,
            totals.not_run
        );
        let _ = writeln!(out, "Result: {}", self.status());
        out
    }
}

fn render_group(group: &GroupReport, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(
        out,
        "{indent}[{}] {}{}",
        group.status,
        group.title,
        optional_marker(group.optional)
    );

    for child in &group.children {
        match child {
            ReportNode::Group(nested) => render_group(nested, depth + 1, out),
            ReportNode::Check(check) => {
                let inner = "  ".repeat(depth + 1);
                let _ = writeln!(
                    out,
                    "{inner}[{}] {}{}",
                    check.status,
                    check.title,
                    optional_marker(check.optional)
                );
                if let Some(message) = &check.message {
                    for line in message.lines() {
                        let _ = writeln!(out, "{inner}    {line}");
                    }
                }
            }
        }
    }
}

fn optional_marker(optional: bool) -> &'static str {
    if optional {
        " (optional)"
    } else {
        ""
    }
}
