//! Source reconciliation
//!
//! Compares a declared [`SourceDefinition`] with what the collector reports
//! and issues the single API call needed to converge:
//!
//! | intent   | observed        | status                     | action |
//! |----------|-----------------|----------------------------|--------|
//! | create   | absent          | `Absent`                   | add    |
//! | create   | equal           | `PresentMatching`          | none   |
//! | create   | differs         | `PresentDivergent`         | update |
//! | delete   | present         | `MarkedForDeletionPresent` | delete |
//! | delete   | absent          | `MarkedForDeletionAbsent`  | none   |
//!
//! Every mutation is followed by a refresh of the collector cache. A
//! collector in `Json` sync mode is switched to `UI` just before its first
//! mutation. When reconciliation is disabled nothing is called at all.

use crate::collector::Collector;
use crate::error::{Error, Result};
use crate::types::{DEFAULT_TIMEOUT, RemoteSource, SOURCE_ATTRIBUTES, SourceDefinition};
use declarative::{
    ApplyContext, ApplyResult, AttrValue, AttributeChange, ConfirmCallback, ExecuteOptions,
    ExecuteSummary, ExecutionPlan, ProgressCallback, Resource, ResourceState, describe_changes,
    execute,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Resource type name used in plans and target filters.
pub const RESOURCE_TYPE: &str = "sumo_source";

/// What the declaration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Create the source, or update it in place.
    #[default]
    Create,
    /// Remove the source if it exists.
    Delete,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Where a declared source stands relative to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Disabled,
    Absent,
    PresentMatching,
    PresentDivergent,
    MarkedForDeletionPresent,
    MarkedForDeletionAbsent,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "disabled",
            Self::Absent => "absent",
            Self::PresentMatching => "in sync",
            Self::PresentDivergent => "out of sync",
            Self::MarkedForDeletionPresent => "pending removal",
            Self::MarkedForDeletionAbsent => "removed",
        };
        write!(f, "{s}")
    }
}

/// The API call a plan resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    None,
    Add,
    Update { source_id: u64 },
    Delete { source_id: u64 },
}

/// Planned reconciliation of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePlan {
    pub name: String,
    pub status: SourceStatus,
    pub action: Action,
    /// Differing attributes; only set for updates.
    pub changes: Vec<AttributeChange>,
    /// Operator-facing description of the action; empty for no-ops.
    pub description: String,
}

impl SourcePlan {
    /// Whether applying this plan calls the API.
    pub fn is_noop(&self) -> bool {
        self.action == Action::None
    }
}

/// Result of reconciling one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Reconciliation is disabled.
    Skipped,
    /// Already converged.
    Unchanged,
    Added,
    Updated,
    Deleted,
    /// Dry run; the plan that would have been applied.
    Planned(SourcePlan),
}

impl From<&Outcome> for ApplyResult {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Skipped => ApplyResult::Skipped {
                reason: "reconciliation disabled".to_string(),
            },
            Outcome::Unchanged => ApplyResult::NoChange,
            Outcome::Added => ApplyResult::Created,
            Outcome::Updated => ApplyResult::Modified,
            Outcome::Deleted => ApplyResult::Removed,
            Outcome::Planned(_) => ApplyResult::Skipped {
                reason: "dry run".to_string(),
            },
        }
    }
}

/// Run-wide reconciliation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Skip everything without touching the API.
    pub disabled: bool,
    /// Report changes without making them.
    pub dry_run: bool,
    /// Timeout for add and update calls.
    pub timeout: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            disabled: false,
            dry_run: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Render the attributes sent when adding a source, one per line.
fn describe_payload(definition: &SourceDefinition) -> String {
    let mut payload = format!("name: '{}'\n", definition.name);
    for attr in SOURCE_ATTRIBUTES {
        let value = (attr.get)(definition);
        if value != AttrValue::Text(None) {
            payload.push_str(&format!("{}: '{}'\n", attr.name, value));
        }
    }
    payload
}

/// Decide what to do with one source given what the collector reports.
pub fn classify(
    observed: Option<&RemoteSource>,
    desired: &SourceDefinition,
    intent: Intent,
) -> SourcePlan {
    let (status, action, changes, description) = match (intent, observed) {
        (Intent::Create, None) => (
            SourceStatus::Absent,
            Action::Add,
            Vec::new(),
            format!(
                "add {} via sumologic api\n{}",
                desired.name,
                describe_payload(desired)
            ),
        ),
        (Intent::Create, Some(current)) => {
            let changes = current.definition.changes_to(desired);
            if changes.is_empty() {
                (SourceStatus::PresentMatching, Action::None, changes, String::new())
            } else {
                let description =
                    format!("replace {} via api\n{}", desired.name, describe_changes(&changes));
                let action = Action::Update {
                    source_id: current.id,
                };
                (SourceStatus::PresentDivergent, action, changes, description)
            }
        }
        (Intent::Delete, Some(current)) => (
            SourceStatus::MarkedForDeletionPresent,
            Action::Delete {
                source_id: current.id,
            },
            Vec::new(),
            format!("removing sumo source {}", desired.name),
        ),
        (Intent::Delete, None) => (
            SourceStatus::MarkedForDeletionAbsent,
            Action::None,
            Vec::new(),
            String::new(),
        ),
    };

    SourcePlan {
        name: desired.name.clone(),
        status,
        action,
        changes,
        description,
    }
}

/// Carry out a plan, refreshing the collector after any mutation.
fn converge(
    collector: &mut Collector,
    plan: &SourcePlan,
    desired: &SourceDefinition,
    timeout: Duration,
) -> Result<Outcome> {
    if plan.is_noop() {
        log::debug!("sumo_source[{}] is up to date", plan.name);
        return Ok(Outcome::Unchanged);
    }
    log::debug!("{}", plan.description.trim_end());
    ensure_api_managed(collector)?;

    let outcome = match plan.action {
        Action::None => Outcome::Unchanged,
        Action::Add => {
            collector.add_source(desired, timeout)?;
            collector.refresh()?;
            log::info!("sumo_source[{}] added sumo_source entry", plan.name);
            Outcome::Added
        }
        Action::Update { source_id } => {
            collector.update_source(source_id, desired, timeout)?;
            collector.refresh()?;
            log::info!("sumo_source[{}] replaced sumo_source entry", plan.name);
            Outcome::Updated
        }
        Action::Delete { source_id } => {
            collector.delete_source(source_id)?;
            collector.refresh()?;
            log::info!("sumo_source[{}] deleted sumo_source entry", plan.name);
            Outcome::Deleted
        }
    };
    Ok(outcome)
}

/// Switch a `Json` collector to `UI` ahead of its first source mutation.
fn ensure_api_managed(collector: &mut Collector) -> Result<()> {
    if collector.metadata()?.is_file_synced() {
        log::warn!("Setting sumo collector sourceSyncMode to UI.");
        collector.set_ui_sync_mode()?;
    }
    Ok(())
}

/// Check a batch of declarations before anything is sent.
pub fn validate_all<'a>(definitions: impl IntoIterator<Item = &'a SourceDefinition>) -> Result<()> {
    let mut seen = HashSet::new();
    for definition in definitions {
        definition.validate()?;
        if !seen.insert(definition.name.as_str()) {
            return Err(Error::validation(
                "name",
                format!("source '{}' is declared more than once", definition.name),
            ));
        }
    }
    Ok(())
}

/// Reconciles declared sources against one collector.
///
/// # Example
///
/// ```
/// use sumokit::backend::MockBackend;
/// use sumokit::{Collector, Intent, Outcome, ReconcileOptions, Reconciler, SourceDefinition};
///
/// let mock = MockBackend::new();
/// mock.add_collector("web-01");
/// let mut collector = Collector::with_backend("web-01", Box::new(mock.clone()));
///
/// let reconciler = Reconciler::new(ReconcileOptions::default());
/// let desired = SourceDefinition::new("app-logs", "/var/log/app/*.log");
///
/// let outcome = reconciler.apply(&mut collector, &desired, Intent::Create).unwrap();
/// assert_eq!(outcome, Outcome::Added);
/// assert!(collector.source_exists("app-logs").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    /// Make sure the collector exists, and report whether it is still in
    /// `Json` sync mode.
    ///
    /// Nothing is changed here. A `Json` collector is switched to `UI` right
    /// before the first source mutation, so a declined or dry run leaves it
    /// as it was.
    pub fn prepare(&self, collector: &mut Collector) -> Result<bool> {
        if !collector.exists()? {
            return Err(collector.not_found());
        }

        let file_synced = collector.metadata()?.is_file_synced();
        if file_synced {
            if self.options.dry_run {
                log::warn!("Would set sumo collector sourceSyncMode to UI.");
            } else {
                log::warn!(
                    "sumo collector sourceSyncMode will be set to UI before the first change."
                );
            }
        }
        Ok(file_synced)
    }

    /// The collector's current view of a source, if it has one.
    pub fn load_current_state(
        &self,
        collector: &mut Collector,
        name: &str,
    ) -> Result<Option<RemoteSource>> {
        if !collector.source_exists(name)? {
            return Ok(None);
        }
        collector.source(name).map(Some)
    }

    /// Work out what [`apply`](Self::apply) would do, without changing anything.
    pub fn plan(
        &self,
        collector: &mut Collector,
        desired: &SourceDefinition,
        intent: Intent,
    ) -> Result<SourcePlan> {
        desired.validate()?;
        if self.options.disabled {
            return Ok(SourcePlan {
                name: desired.name.clone(),
                status: SourceStatus::Disabled,
                action: Action::None,
                changes: Vec::new(),
                description: String::new(),
            });
        }

        let observed = self.load_current_state(collector, &desired.name)?;
        Ok(classify(observed.as_ref(), desired, intent))
    }

    /// Converge one source.
    pub fn apply(
        &self,
        collector: &mut Collector,
        desired: &SourceDefinition,
        intent: Intent,
    ) -> Result<Outcome> {
        desired.validate()?;
        if self.options.disabled {
            log::debug!(
                "Skipping sumo source {} as sumologic disabled is set to true",
                desired.name
            );
            return Ok(Outcome::Skipped);
        }

        self.prepare(collector)?;
        let plan = self.plan(collector, desired, intent)?;
        if self.options.dry_run {
            return Ok(Outcome::Planned(plan));
        }
        converge(collector, &plan, desired, self.options.timeout)
    }

    /// Converge a list of declared sources in order.
    ///
    /// `target` narrows the run to matching sources (`sumo_source.<name>`,
    /// or a name fragment). Declarations are validated as a whole first.
    pub fn run<P, C>(
        &self,
        collector: &mut Collector,
        sources: Vec<SourceResource>,
        target: Option<&str>,
        progress: &mut P,
        confirm: &mut C,
    ) -> anyhow::Result<ExecuteSummary>
    where
        P: ProgressCallback,
        C: ConfirmCallback,
    {
        validate_all(sources.iter().map(|s| &s.definition))?;

        if self.options.disabled {
            log::debug!(
                "Skipping {} sumo source declarations as sumologic disabled is set to true",
                sources.len()
            );
            return Ok(ExecuteSummary {
                skipped: sources.len(),
                ..Default::default()
            });
        }

        self.prepare(collector)?;

        let mut plan = ExecutionPlan::new();
        for source in sources {
            plan.add_resource(Box::new(source));
        }
        let plan = plan.filter_by_target(target);

        let opts = ExecuteOptions {
            dry_run: self.options.dry_run,
            verbose: false,
        };
        execute(plan, &opts, collector, progress, confirm)
    }
}

/// A declared source as a declarative resource over a [`Collector`].
#[derive(Debug, Clone)]
pub struct SourceResource {
    pub definition: SourceDefinition,
    pub intent: Intent,
    pub timeout: Duration,
}

impl SourceResource {
    pub fn new(definition: SourceDefinition, intent: Intent) -> Self {
        Self {
            definition,
            intent,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Resource for SourceResource {
    type Target = Collector;

    fn id(&self) -> String {
        self.definition.name.clone()
    }

    fn description(&self) -> String {
        match self.intent {
            Intent::Create => format!(
                "Ensure source {} collects {}",
                self.definition.name, self.definition.path
            ),
            Intent::Delete => format!("Remove source {}", self.definition.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn current_state(&self, collector: &mut Collector) -> anyhow::Result<ResourceState> {
        if collector.source_exists(&self.definition.name)? {
            Ok(ResourceState::Present { details: None })
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn desired_state(&self) -> ResourceState {
        match self.intent {
            Intent::Create => ResourceState::Present { details: None },
            Intent::Delete => ResourceState::Absent,
        }
    }

    fn changes(&self, collector: &mut Collector) -> anyhow::Result<Vec<AttributeChange>> {
        if self.intent == Intent::Delete {
            return Ok(Vec::new());
        }
        let current = collector.source(&self.definition.name)?;
        Ok(current.definition.changes_to(&self.definition))
    }

    fn apply(&self, collector: &mut Collector, ctx: &mut ApplyContext) -> anyhow::Result<ApplyResult> {
        let observed = if collector.source_exists(&self.definition.name)? {
            Some(collector.source(&self.definition.name)?)
        } else {
            None
        };
        let plan = classify(observed.as_ref(), &self.definition, self.intent);

        if ctx.dry_run {
            return Ok((&Outcome::Planned(plan)).into());
        }

        let outcome = converge(collector, &plan, &self.definition, self.timeout)?;
        Ok((&outcome).into())
    }
}
