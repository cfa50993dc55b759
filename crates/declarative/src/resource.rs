//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state. State lives behind a
//! `Target` (a remote API handle, a local store, ...) which is passed
//! explicitly into every call instead of being shared globally.

use crate::attribute::AttributeChange;
use crate::context::ApplyContext;
use crate::types::{ApplyResult, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (id, description, type)
/// - State detection (current vs desired, plus attribute-level changes)
/// - State convergence (apply)
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
///
/// #[derive(Debug)]
/// struct Entry { key: String }
///
/// impl Resource for Entry {
///     type Target = std::collections::HashSet<String>;
///
///     fn id(&self) -> String { self.key.clone() }
///     fn description(&self) -> String { format!("Ensure {} is present", self.key) }
///     fn resource_type(&self) -> &'static str { "entry" }
///
///     fn current_state(&self, set: &mut Self::Target) -> anyhow::Result<ResourceState> {
///         Ok(if set.contains(&self.key) {
///             ResourceState::Present { details: None }
///         } else {
///             ResourceState::Absent
///         })
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::Present { details: None }
///     }
///
///     fn apply(&self, set: &mut Self::Target, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
///         if ctx.dry_run {
///             return Ok(ApplyResult::Skipped { reason: "Dry run".into() });
///         }
///         Ok(if set.insert(self.key.clone()) { ApplyResult::Created } else { ApplyResult::NoChange })
///     }
/// }
/// ```
pub trait Resource: fmt::Debug {
    /// Handle through which state is observed and changed
    type Target;

    /// Unique identifier for this resource within its type
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Detect the current state of this resource
    fn current_state(&self, target: &mut Self::Target) -> Result<ResourceState>;

    /// Get the desired state for this resource
    fn desired_state(&self) -> ResourceState;

    /// Attribute-level differences between current and desired state
    ///
    /// Only meaningful when the resource is present on both sides. The
    /// default reports none, so presence alone decides convergence.
    fn changes(&self, _target: &mut Self::Target) -> Result<Vec<AttributeChange>> {
        Ok(Vec::new())
    }

    /// Check if the resource needs changes to reach desired state
    fn needs_apply(&self, target: &mut Self::Target) -> Result<bool> {
        let current = self.current_state(target)?;
        if current != self.desired_state() {
            return Ok(true);
        }
        Ok(!self.changes(target)?.is_empty())
    }

    /// Apply changes to reach the desired state
    ///
    /// This method should:
    /// 1. Check if already in desired state (return NoChange)
    /// 2. Respect ctx.dry_run (return Skipped if true)
    /// 3. Make the necessary changes
    /// 4. Return the appropriate ApplyResult
    fn apply(&self, target: &mut Self::Target, ctx: &mut ApplyContext) -> Result<ApplyResult>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource<T> = Box<dyn Resource<Target = T>>;
