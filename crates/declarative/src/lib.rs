//! # Declarative
//!
//! A framework for declarative resource management.
//!
//! This crate provides the core abstractions for declaring desired state,
//! observing current state through a target handle, and converging the
//! target to match.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be managed (a remote source, an entry)
//! - **Target**: The handle a resource is observed and changed through
//! - **Attribute**: A `(name, accessor)` pair in a static table, used for field-level diffs
//! - **ExecutionPlan**: An ordered list of resources sharing one target
//! - **Executor**: Applies resources sequentially with dry-run and confirmation
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, ExecutionPlan, execute_simple};
//!
//! let mut plan = ExecutionPlan::new();
//! plan.add_resource(Box::new(my_resource));
//!
//! let summary = execute_simple(plan, &ExecuteOptions::default(), &mut target)?;
//! println!("{} changes", summary.total_changes());
//! ```
//!
//! ## Callback Traits
//!
//! - [`ProgressCallback`]: Receives the plan and per-resource progress
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

pub mod attribute;
pub mod context;
pub mod diff;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use attribute::{AttrValue, Attribute, AttributeChange, describe_changes, diff_attributes};
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use diff::{DiffSummary, ResourceDiff, compute_diffs};
pub use executor::{execute, execute_simple};
pub use planner::ExecutionPlan;
pub use resource::{BoxedResource, Resource};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary, ResourceState};
