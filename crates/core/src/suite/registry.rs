//! Lookup table of check and group definitions keyed by id.

use super::definition::{CheckDefinition, GroupChild, GroupDefinition, InputSpec};
use crate::{SuiteError, SuiteResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Every check and group known to a suite.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    checks: BTreeMap<String, Arc<CheckDefinition>>,
    groups: BTreeMap<String, Arc<GroupDefinition>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns [`SuiteError::DuplicateId`] when a check with the same id is already registered.
    pub fn register_check(&mut self, check: CheckDefinition) -> SuiteResult<()> {
        if self.checks.contains_key(&check.id) {
            return Err(SuiteError::DuplicateId {
                kind: "check",
                id: check.id,
            });
        }
        self.checks.insert(check.id.clone(), Arc::new(check));
        Ok(())
    }

    /// Register a group. Children may be registered later; [`Self::validate`] checks the wiring.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::DuplicateId`] when a group with the same id is already registered.
    pub fn register_group(&mut self, group: GroupDefinition) -> SuiteResult<()> {
        if self.groups.contains_key(&group.id) {
            return Err(SuiteError::DuplicateId {
                kind: "group",
                id: group.id,
            });
        }
        self.groups.insert(group.id.clone(), Arc::new(group));
        Ok(())
    }

    pub fn check(&self, id: &str) -> SuiteResult<&Arc<CheckDefinition>> {
        self.checks
            .get(id)
            .ok_or_else(|| SuiteError::UnknownCheck(id.to_owned()))
    }

    pub fn group(&self, id: &str) -> SuiteResult<&Arc<GroupDefinition>> {
        self.groups
            .get(id)
            .ok_or_else(|| SuiteError::UnknownGroup(id.to_owned()))
    }

    pub fn group_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn check_ids(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }

    /// Confirm every child reference resolves and no group contains itself.
    pub fn validate(&self) -> SuiteResult<()> {
        for group in self.groups.values() {
            for child in &group.children {
                match child {
                    GroupChild::Check(id) => {
                        self.check(id)?;
                    }
                    GroupChild::Group(id) => {
                        self.group(id)?;
                    }
                }
            }
        }

        let mut done = BTreeSet::new();
        for id in self.groups.keys() {
            self.visit(id, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    fn visit<'r>(
        &'r self,
        id: &'r str,
        path: &mut Vec<&'r str>,
        done: &mut BTreeSet<&'r str>,
    ) -> SuiteResult<()> {
        if done.contains(id) {
            return Ok(());
        }
        if path.contains(&id) {
            return Err(SuiteError::CyclicGroup(id.to_owned()));
        }

        path.push(id);
        let group = self.group(id)?;
        for child in &group.children {
            if let GroupChild::Group(child_id) = child {
                self.visit(child_id, path, done)?;
            }
        }
        path.pop();
        done.insert(id);
        Ok(())
    }

    /// Describe the tree under `group_id` without running anything.
    pub fn outline(&self, group_id: &str) -> SuiteResult<GroupOutline> {
        let group = self.group(group_id)?;
        let children = group
            .children
            .iter()
            .map(|child| match child {
                GroupChild::Check(id) => self.check(id).map(|check| {
                    OutlineNode::Check(CheckOutline {
                        id: check.id.clone(),
                        title: check.title.clone(),
                        optional: check.optional,
                        inputs: check.inputs.iter().map(InputOutline::from).collect(),
                    })
                }),
                GroupChild::Group(id) => self.outline(id).map(OutlineNode::Group),
            })
            .collect::<SuiteResult<Vec<_>>>()?;

        Ok(GroupOutline {
            id: group.id.clone(),
            title: group.title.clone(),
            description: group.description.clone(),
            optional: group.optional,
            children,
        })
    }
}

// ============================================================================
// Outline (static description of a group tree)
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupOutline {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub optional: bool,
    pub children: Vec<OutlineNode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlineNode {
    Check(CheckOutline),
    Group(GroupOutline),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckOutline {
    pub id: String,
    pub title: String,
    pub optional: bool,
    pub inputs: Vec<InputOutline>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputOutline {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub optional: bool,
}

impl From<&InputSpec> for InputOutline {
    fn from(input: &InputSpec) -> Self {
        Self {
            name: input.name.clone(),
            title: input.title.clone(),
            optional: input.optional || input.default.is_some(),
        }
    }
}

impl GroupOutline {
    /// Every input name used anywhere in the tree, sorted and de-duplicated.
    pub fn input_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_inputs(&mut names);
        names
    }

    fn collect_inputs<'o>(&'o self, names: &mut BTreeSet<&'o str>) {
        for child in &self.children {
            match child {
                OutlineNode::Check(check) => {
                    names.extend(check.inputs.iter().map(|input| input.name.as_str()));
                }
                OutlineNode::Group(group) => group.collect_inputs(names),
            }
        }
    }
}
