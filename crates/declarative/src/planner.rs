//! Execution planner - builds ordered resource execution plans

use crate::resource::{BoxedResource, Resource};

/// An ordered list of resources converged against a single target
///
/// Resources are applied in insertion order, one at a time.
pub struct ExecutionPlan<T> {
    pub resources: Vec<BoxedResource<T>>,
}

impl<T> ExecutionPlan<T> {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    /// Append a resource to the plan
    pub fn add_resource(&mut self, resource: BoxedResource<T>) {
        self.resources.push(resource);
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource<Target = T>) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type", "type.name" or a bare name fragment
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<T> Default for ExecutionPlan<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
///
/// Only the first dot separates type from name, so names may contain dots.
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        Some((rt, name)) => (Some(rt.to_string()), Some(name.to_string())),
        None => (Some(target.to_string()), None),
    }
}

/// Check if a resource matches the filter criteria
///
/// A lone word is accepted either as a type or as a name fragment.
fn matches_filter<T>(
    resource: &dyn Resource<Target = T>,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    let type_matches = |rt: &str| match rt {
        "sources" | "source" => resource.resource_type().ends_with("source"),
        _ => resource.resource_type() == rt,
    };

    match (resource_type, name) {
        (Some(rt), None) => type_matches(rt) || resource.id().contains(rt),
        (Some(rt), Some(n)) => type_matches(rt) && resource.id().contains(n),
        (None, Some(n)) => resource.id().contains(n),
        (None, None) => true,
    }
}
