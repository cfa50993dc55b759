//! Execution engine - applies resources sequentially against one target

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::diff::compute_diffs;
use crate::planner::ExecutionPlan;
use crate::types::{ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};

/// Execute a plan with the given options and callbacks
///
/// Diffs are computed first and handed to `progress.on_plan`. A dry run
/// stops there and reports the changes as pending. Otherwise the caller is
/// asked to confirm, and every resource that differs is applied in order.
///
/// Any failure while observing or applying a resource aborts the run; no
/// further resources are touched.
pub fn execute<T, P, C>(
    plan: ExecutionPlan<T>,
    opts: &ExecuteOptions,
    target: &mut T,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteSummary>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let diffs = compute_diffs(&plan.resources, target)?;
    progress.on_plan(&diffs);

    let unchanged = plan.total_resources() - diffs.len();

    if diffs.is_empty() {
        return Ok(ExecuteSummary {
            no_change: unchanged,
            ..Default::default()
        });
    }

    if opts.dry_run {
        return Ok(ExecuteSummary {
            no_change: unchanged,
            pending: diffs.len(),
            ..Default::default()
        });
    }

    if !confirm.confirm("Apply changes?")? {
        return Ok(ExecuteSummary {
            no_change: unchanged,
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    let mut summary = ExecuteSummary {
        no_change: unchanged,
        ..Default::default()
    };
    let mut ctx = ApplyContext::new(false, opts.verbose);

    for resource in &plan.resources {
        let id = resource.id();
        if !diffs.iter().any(|d| d.resource_id == id) {
            continue;
        }

        progress.on_resource_start(&id, &resource.description());
        let result = resource
            .apply(target, &mut ctx)
            .with_context(|| format!("Failed to apply {} '{}'", resource.resource_type(), id))?;
        log::debug!("{} {}: {:?}", resource.resource_type(), id, result);
        progress.on_resource_complete(&id, &result);
        summary.add_result(&result);
    }

    Ok(summary)
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<T>(
    plan: ExecutionPlan<T>,
    opts: &ExecuteOptions,
    target: &mut T,
) -> Result<ExecuteSummary> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, target, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoDecline, NoProgress};
    use crate::resource::Resource;
    use crate::types::{ApplyResult, ResourceState};
    use std::collections::HashSet;

    #[derive(Debug)]
    struct Entry {
        key: String,
        fail: bool,
    }

    impl Entry {
        fn new(key: &str) -> Self {
            Self {
                key: key.to_string(),
                fail: false,
            }
        }
    }

    impl Resource for Entry {
        type Target = HashSet<String>;

        fn id(&self) -> String {
            self.key.clone()
        }

        fn description(&self) -> String {
            format!("Test entry {}", self.key)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn current_state(&self, set: &mut HashSet<String>) -> Result<ResourceState> {
            if set.contains(&self.key) {
                Ok(ResourceState::Present { details: None })
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::Present { details: None }
        }

        fn apply(&self, set: &mut HashSet<String>, ctx: &mut ApplyContext) -> Result<ApplyResult> {
            if ctx.dry_run {
                return Ok(ApplyResult::Skipped {
                    reason: "Dry run".into(),
                });
            }
            if self.fail {
                anyhow::bail!("boom");
            }
            if set.insert(self.key.clone()) {
                Ok(ApplyResult::Created)
            } else {
                Ok(ApplyResult::NoChange)
            }
        }
    }

    struct Recorder(Vec<String>);

    impl ProgressCallback for Recorder {
        fn on_plan(&mut self, diffs: &[crate::diff::ResourceDiff]) {
            self.0.push(format!("plan:{}", diffs.len()));
        }
        fn on_resource_start(&mut self, id: &str, _description: &str) {
            self.0.push(format!("start:{id}"));
        }
        fn on_resource_complete(&mut self, id: &str, _result: &ApplyResult) {
            self.0.push(format!("done:{id}"));
        }
    }

    fn plan_of(entries: Vec<Entry>) -> ExecutionPlan<HashSet<String>> {
        let mut plan = ExecutionPlan::new();
        for e in entries {
            plan.add_resource(Box::new(e));
        }
        plan
    }

    #[test]
    fn test_execute_empty_plan() {
        let mut set: HashSet<String> = HashSet::new();
        let result =
            execute_simple(ExecutionPlan::new(), &ExecuteOptions::default(), &mut set).unwrap();
        assert_eq!(result.total(), 0);
    }

    #[test]
    fn test_execute_no_changes() {
        let mut set: HashSet<String> = ["a".to_string()].into_iter().collect();
        let result =
            execute_simple(plan_of(vec![Entry::new("a")]), &ExecuteOptions::default(), &mut set)
                .unwrap();
        assert_eq!(result.no_change, 1);
        assert_eq!(result.total_changes(), 0);
    }

    #[test]
    fn test_execute_with_changes_in_order() {
        let mut set: HashSet<String> = ["b".to_string()].into_iter().collect();
        let mut progress = Recorder(Vec::new());
        let result = execute(
            plan_of(vec![Entry::new("a"), Entry::new("b"), Entry::new("c")]),
            &ExecuteOptions::default(),
            &mut set,
            &mut progress,
            &mut crate::context::AutoConfirm,
        )
        .unwrap();

        assert_eq!(result.created, 2);
        assert_eq!(result.no_change, 1);
        assert_eq!(
            progress.0,
            vec!["plan:2", "start:a", "done:a", "start:c", "done:c"]
        );
    }

    #[test]
    fn test_dry_run_makes_no_changes() {
        let mut set = HashSet::new();
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = execute_simple(plan_of(vec![Entry::new("a")]), &opts, &mut set).unwrap();
        assert_eq!(result.pending, 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_declined_confirmation_skips() {
        let mut set = HashSet::new();
        let result = execute(
            plan_of(vec![Entry::new("a")]),
            &ExecuteOptions::default(),
            &mut set,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();
        assert_eq!(result.skipped, 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_failure_aborts_remaining_resources() {
        let mut set = HashSet::new();
        let failing = Entry {
            key: "a".into(),
            fail: true,
        };
        let err = execute_simple(
            plan_of(vec![failing, Entry::new("b")]),
            &ExecuteOptions::default(),
            &mut set,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Failed to apply test 'a'"));
        assert!(set.is_empty());
    }
}
