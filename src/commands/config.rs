//! `validate` - check the config file without contacting the API

use anyhow::{Result, bail};
use std::path::Path;

use crate::Context;
use crate::config::{self, Config};
use crate::ui;

pub fn validate(ctx: &Context, explicit: Option<&Path>) -> Result<()> {
    let path = config::config_path(explicit)?;

    if !ctx.quiet {
        ui::header("Validating Configuration");
        ui::kv("file", &path.display().to_string());
    }

    let config = match Config::load(&path) {
        Ok(config) => config,
        Err(e) => {
            ui::error(&format!("Invalid - {e:#}"));
            bail!("Configuration is invalid");
        }
    };

    if ctx.quiet {
        return Ok(());
    }

    let sumologic = &config.sumologic;
    ui::kv("endpoint", &sumologic.endpoint);
    ui::kv(
        "collector",
        sumologic.collector.as_deref().unwrap_or("(host name)"),
    );
    ui::kv("api timeout", &format!("{}s", sumologic.api_timeout));
    ui::kv(
        "collector query limit",
        &sumologic.collector_query_limit.to_string(),
    );
    if sumologic.disabled {
        ui::warn("Reconciliation is disabled (sumologic.disabled = true)");
    }

    ui::section(&format!("Sources ({})", config.sources.len()));
    for entry in &config.sources {
        ui::row(
            &entry.definition.name,
            &format!("{} {}", entry.action, entry.definition.path),
        );
    }

    println!();
    ui::success("Configuration is valid!");
    Ok(())
}
