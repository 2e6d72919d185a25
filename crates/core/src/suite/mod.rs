//! Test group composition and execution.
//!
//! Checks and groups are registered once, by id, in a [`Registry`]. Groups refer to their
//! children by id, which lets one definition appear under several parents. A [`Runner`] walks a
//! group tree, running each check body against a [`CheckContext`] and reducing the results into
//! a [`crate::report::GroupReport`].

pub mod context;
pub mod definition;
pub mod registry;
pub mod runner;

pub use context::{CheckContext, RequestCache};
pub use definition::{CheckBody, CheckDefinition, GroupChild, GroupDefinition, InputSpec};
pub use registry::{CheckOutline, GroupOutline, InputOutline, OutlineNode, Registry};
pub use runner::{aggregate, CancellationFlag, RunOptions, Runner};
