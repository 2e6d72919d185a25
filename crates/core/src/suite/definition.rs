//! Check and group definitions.
//!
//! Definitions are immutable once registered. A group lists its children by id, so the same check
//! or group can be placed under several parents.

use super::context::CheckContext;
use crate::check::CheckOutcome;
use std::fmt;
use std::sync::Arc;

/// Body of a check: one synchronous unit that performs at most one network call.
pub type CheckBody = Arc<dyn Fn(&mut CheckContext<'_>) -> CheckOutcome + Send + Sync>;

/// A named input a check reads from the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputSpec {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<String>,
    pub optional: bool,
}

impl InputSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            default: None,
            optional: false,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// One check: its identity, declared inputs and request dependencies, and its body.
#[derive(Clone)]
pub struct CheckDefinition {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub inputs: Vec<InputSpec>,
    /// Name under which this check stores the record it fetches.
    pub makes_request: Option<String>,
    /// Names of earlier requests this check reads.
    pub uses_requests: Vec<String>,
    /// A failing optional check does not fail its group.
    pub optional: bool,
    pub body: CheckBody,
}

impl CheckDefinition {
    pub fn new<F>(id: impl Into<String>, title: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut CheckContext<'_>) -> CheckOutcome + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            inputs: Vec::new(),
            makes_request: None,
            uses_requests: Vec::new(),
            optional: false,
            body: Arc::new(body),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn makes_request(mut self, name: impl Into<String>) -> Self {
        self.makes_request = Some(name.into());
        self
    }

    pub fn uses_request(mut self, name: impl Into<String>) -> Self {
        self.uses_requests.push(name.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("inputs", &self.inputs)
            .field("makes_request", &self.makes_request)
            .field("uses_requests", &self.uses_requests)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

/// A reference from a group to a registered check or group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupChild {
    Check(String),
    Group(String),
}

impl GroupChild {
    pub fn id(&self) -> &str {
        match self {
            GroupChild::Check(id) | GroupChild::Group(id) => id,
        }
    }
}

/// An ordered, named collection of checks and nested groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupDefinition {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub optional: bool,
    pub children: Vec<GroupChild>,
}

impl GroupDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            optional: false,
            children: Vec::new(),
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn check(mut self, id: impl Into<String>) -> Self {
        self.children.push(GroupChild::Check(id.into()));
        self
    }

    pub fn group(mut self, id: impl Into<String>) -> Self {
        self.children.push(GroupChild::Group(id.into()));
        self
    }
}
