//! # Declarative
//!
//! A framework for declarative reconciliation of remote entities.
//!
//! Operators declare the attributes an entity should have; the engine
//! compares each declaration with the last canonical state read from the
//! remote system and converges the two through create, read, update and
//! delete calls.
//!
//! ## Core Concepts
//!
//! - **Schema**: per resource kind, every attribute's type, who may set it,
//!   and whether changing it forces replacement
//! - **ManagedResource**: a resource kind; translators between canonical
//!   state and remote requests/records, plus the remote calls
//! - **Lifecycle**: create/read/update/delete/import, written once for all kinds
//! - **ResourceDiff**: what reconciling one declaration will do
//! - **ExecutionPlan**: changes grouped into stages that run in order
//! - **Executor**: runs each stage's changes in parallel
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, Registry, execute_simple};
//!
//! let registry = Registry::new()
//!     .with(OrganizationResource::new(client.clone()))
//!     .with(DeviceResource::new(client.clone()));
//!
//! let diff = registry.diff(
//!     "iotcentral_organization.contoso",
//!     "iotcentral_organization",
//!     Some(&serde_json::json!({ "id": "contoso", "display_name": "Contoso" })),
//!     None,
//! )?;
//!
//! let report = execute_simple(
//!     ExecutionPlan::from_diffs([diff]),
//!     &registry,
//!     ExecuteOptions::default(),
//! )?;
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod context;
pub mod data_source;
pub mod diff;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod planner;
pub mod resource;
pub mod schema;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use data_source::DataSource;
pub use diff::{
    AttributeChange, DiffSummary, PlannedValues, ResourceDiff, compute_diff, group_by_type,
};
pub use error::{Error, Operation, Result};
pub use executor::{ExecuteReport, Outcome, RefreshTarget, execute, execute_simple, refresh_all};
pub use planner::{ExecutionPlan, Stage, split_address};
pub use resource::{BoxedResource, ManagedResource, Registry, Resource, boxed};
pub use schema::{Attribute, AttributeType, Diagnostic, Mutability, Schema};
pub use types::{Action, ApplyResult, ExecuteOptions, ExecuteSummary, MissingPolicy, StateUpdate};
