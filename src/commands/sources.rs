//! Source commands
//!
//! - `status` - Show the collector and how declared sources compare to it
//! - `diff` - Preview what apply would change
//! - `apply` - Make the collector's sources match the config

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use sumokit::{
    Collector, CollectorMetadata, Intent, Reconciler, RemoteSource, SourceStatus,
};

use crate::Context;
use crate::config::{self, Config};
use crate::engine::{PromptConfirm, UiProgress, print_summary};
use crate::progress;
use crate::ui;

/// Load the config, or `None` when reconciliation is disabled
fn load_enabled(explicit: Option<&Path>) -> Result<Option<Config>> {
    let path = config::config_path(explicit)?;
    let config = Config::load(&path)?;

    if config.sumologic.disabled {
        log::debug!("Skipping sumo source declarations as sumologic disabled is set to true");
        ui::info("Reconciliation is disabled (sumologic.disabled = true); nothing to do");
        return Ok(None);
    }
    Ok(Some(config))
}

fn connect(config: &Config) -> Result<Collector> {
    let client = config.client_config()?;
    log::info!(
        "Using collector '{}' at {}",
        client.collector,
        client.endpoint
    );
    Ok(Collector::connect(&client))
}

// ============================================================================
// Status Command
// ============================================================================

#[derive(Serialize)]
struct StatusView<'a> {
    collector: &'a CollectorMetadata,
    sources: &'a [RemoteSource],
    declared: Vec<DeclaredView>,
}

#[derive(Serialize)]
struct DeclaredView {
    name: String,
    action: Intent,
    status: SourceStatus,
}

pub fn status(ctx: &Context, explicit: Option<&Path>, json: bool) -> Result<()> {
    let Some(config) = load_enabled(explicit)? else {
        return Ok(());
    };
    let mut collector = connect(&config)?;
    let reconciler = Reconciler::new(config.reconcile_options(true));

    let pb = (!json && !ctx.quiet).then(|| progress::spinner("Querying collector..."));
    let declared = declared_status(&reconciler, &mut collector, &config);
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let declared = declared?;

    let metadata = collector.metadata()?.clone();
    let sources = collector.sources()?;

    if json {
        let view = StatusView {
            collector: &metadata,
            sources,
            declared,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("Failed to serialize status")?
        );
        return Ok(());
    }

    ui::header(&format!("Collector {}", metadata.name));
    ui::kv("id", &metadata.id.to_string());
    if let Some(kind) = &metadata.collector_type {
        ui::kv("type", kind);
    }
    if let Some(alive) = metadata.alive {
        ui::kv("alive", if alive { "yes" } else { "no" });
    }
    ui::kv(
        "sync mode",
        &metadata
            .source_sync_mode
            .map_or_else(|| "n/a".to_string(), |m| m.to_string()),
    );
    if metadata.is_file_synced() {
        ui::warn("Collector uses local (Json) source sync; apply will switch it to UI");
    }

    ui::section(&format!("Declared sources ({})", declared.len()));
    for entry in &declared {
        let status = match entry.status {
            SourceStatus::PresentMatching | SourceStatus::MarkedForDeletionAbsent => {
                entry.status.to_string().green()
            }
            SourceStatus::Absent | SourceStatus::PresentDivergent => {
                entry.status.to_string().yellow()
            }
            SourceStatus::MarkedForDeletionPresent => entry.status.to_string().red(),
            SourceStatus::Disabled => entry.status.to_string().dimmed(),
        };
        ui::row(&entry.name, &status.to_string());
    }

    let unmanaged: Vec<_> = sources
        .iter()
        .filter(|s| !declared.iter().any(|d| d.name == s.name()))
        .collect();
    if !unmanaged.is_empty() {
        ui::section(&format!("Other sources on collector ({})", unmanaged.len()));
        for source in unmanaged {
            ui::dim(&format!("{} {}", source.name(), source.definition.path));
        }
    }

    Ok(())
}

fn declared_status(
    reconciler: &Reconciler,
    collector: &mut Collector,
    config: &Config,
) -> Result<Vec<DeclaredView>> {
    if !collector.exists()? {
        return Err(collector.not_found().into());
    }

    config
        .sources
        .iter()
        .map(|entry| {
            let plan = reconciler.plan(collector, &entry.definition, entry.action)?;
            Ok(DeclaredView {
                name: plan.name,
                action: entry.action,
                status: plan.status,
            })
        })
        .collect()
}

// ============================================================================
// Diff / Apply Commands
// ============================================================================

pub fn diff(ctx: &Context, explicit: Option<&Path>, target: Option<&str>) -> Result<()> {
    apply(ctx, explicit, target, true, true)
}

pub fn apply(
    ctx: &Context,
    explicit: Option<&Path>,
    target: Option<&str>,
    dry_run: bool,
    yes: bool,
) -> Result<()> {
    let Some(config) = load_enabled(explicit)? else {
        return Ok(());
    };

    if !ctx.quiet {
        ui::header(if dry_run {
            "Sumo Source Diff"
        } else {
            "Sumo Source Apply"
        });
    }

    let mut collector = connect(&config)?;
    let reconciler = Reconciler::new(config.reconcile_options(dry_run));

    let summary = reconciler.run(
        &mut collector,
        config.resources(),
        target,
        &mut UiProgress::new(),
        &mut PromptConfirm::new(yes),
    )?;

    if ctx.verbose > 0 {
        ui::dim(&format!("{} sources unchanged", summary.no_change));
    }
    print_summary(&summary, dry_run);
    Ok(())
}
