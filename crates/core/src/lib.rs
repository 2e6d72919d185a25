//! # IPS Core
//!
//! Conformance evaluation engine for the HL7 FHIR International Patient Summary (IPS) v1.1.0.
//!
//! This crate contains the decision logic of the suite:
//! - fetching records and invoking operations through a [`FhirClient`]
//! - detecting declared operations in a server CapabilityStatement
//! - structural checks over IPS document Bundles
//! - profile conformance through an external [`ResourceValidator`], with message filtering
//! - composing checks into groups, running them and aggregating a [`SuiteReport`]
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `ips-cli`.

pub mod bundle_structure;
pub mod capability;
pub mod catalogue;
pub mod check;
pub mod client;
pub mod config;
pub mod conformance;
pub mod constants;
pub mod error;
pub mod filter;
pub mod report;
pub mod service;
pub mod suite;
pub mod validator;

pub use check::{CheckOutcome, CheckResult, CheckStatus, Verdict};
pub use client::{FetchedRecord, FhirClient, HttpFhirClient, OperationMethod};
pub use config::{ProfileBindings, RunConfig};
pub use conformance::ConformanceChecker;
pub use error::{SuiteError, SuiteResult};
pub use filter::MessageFilterPolicy;
pub use report::{CheckReport, GroupReport, ReportNode, ReportStatus, StatusTotals, SuiteReport};
pub use service::SuiteService;
pub use suite::{CancellationFlag, GroupOutline, OutlineNode, Registry, RunOptions, Runner};
pub use validator::{HttpValidator, ResourceValidator, ValidationIssue};
