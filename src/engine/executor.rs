//! Execution callbacks - progress spinner, confirmation prompt, summary

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, ExecuteSummary, ProgressCallback, ResourceDiff,
};
use indicatif::ProgressBar;

use super::differ::display_diff;
use crate::progress;

/// Renders the plan and a spinner per source while it is applied
#[derive(Default)]
pub struct UiProgress {
    pb: Option<ProgressBar>,
}

impl UiProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressCallback for UiProgress {
    fn on_plan(&mut self, diffs: &[ResourceDiff]) {
        display_diff(diffs);
    }

    fn on_resource_start(&mut self, _id: &str, description: &str) {
        self.pb = Some(progress::spinner(description));
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }

        let (symbol, verb) = match result {
            ApplyResult::NoChange => ("○".dimmed(), "unchanged".to_string()),
            ApplyResult::Created => ("✓".green(), "added".to_string()),
            ApplyResult::Modified => ("✓".green(), "replaced".to_string()),
            ApplyResult::Removed => ("✓".green(), "deleted".to_string()),
            ApplyResult::Skipped { reason } => ("⊘".yellow(), format!("skipped ({reason})")),
        };
        println!("    {} {} {}", symbol, id, verb.dimmed());
    }
}

/// Asks before applying, unless `--yes` was given
pub struct PromptConfirm {
    yes: bool,
}

impl PromptConfirm {
    pub fn new(yes: bool) -> Self {
        Self { yes }
    }
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        println!();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        if !confirmed {
            println!();
            println!("  {} Aborted", "✗".red());
        }
        Ok(confirmed)
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        if summary.pending > 0 {
            println!("    • {} sources would change", summary.pending);
        }
        return;
    }

    if summary.total_changes() > 0 {
        println!("  {} Sources applied successfully!", "✓".green().bold());
    } else if summary.skipped == 0 {
        println!("  {} Collector already matches the config", "✓".green().bold());
    }

    for line in summary_lines(summary) {
        println!("    • {line}");
    }
}

fn summary_lines(summary: &ExecuteSummary) -> Vec<String> {
    let mut lines = Vec::new();
    if summary.created > 0 {
        lines.push(format!("{} sources added", summary.created));
    }
    if summary.modified > 0 {
        lines.push(format!("{} sources replaced", summary.modified));
    }
    if summary.removed > 0 {
        lines.push(format!("{} sources deleted", summary.removed));
    }
    if summary.skipped > 0 {
        lines.push(format!("{} sources skipped", summary.skipped));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines() {
        let summary = ExecuteSummary {
            created: 1,
            removed: 2,
            no_change: 3,
            ..Default::default()
        };
        assert_eq!(
            summary_lines(&summary),
            vec!["1 sources added".to_string(), "2 sources deleted".to_string()]
        );
        assert!(summary_lines(&ExecuteSummary::default()).is_empty());
    }

    #[test]
    fn test_yes_skips_prompt() {
        let mut confirm = PromptConfirm::new(true);
        assert!(confirm.confirm("Apply changes?").unwrap());
    }
}
