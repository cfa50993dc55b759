//! Diff display - sumo-source specific UI

use colored::{ColoredString, Colorize};
use declarative::{DiffSummary, ResourceDiff};
use std::collections::BTreeMap;

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    // Group by resource type
    let mut by_type: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        by_type
            .entry(diff.resource_type.as_str())
            .or_default()
            .push(diff);
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Source Diff".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in &by_type {
        let type_name = match *resource_type {
            sumokit::RESOURCE_TYPE => "Log sources",
            _ => resource_type,
        };
        println!("│ {}", type_name.bold());

        for diff in type_diffs {
            println!(
                "│   {} {:<30} {}",
                symbol(diff),
                diff.resource_id,
                state_description(diff).dimmed()
            );
            for change in &diff.changes {
                println!("│       {}", change.to_string().yellow());
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to replace, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn symbol(diff: &ResourceDiff) -> ColoredString {
    if diff.is_addition() {
        "+".green()
    } else if diff.is_removal() {
        "-".red()
    } else if diff.is_modification() {
        "~".yellow()
    } else {
        "?".dimmed()
    }
}

fn state_description(diff: &ResourceDiff) -> String {
    if diff.is_addition() {
        "(not on collector)".to_string()
    } else if diff.is_removal() {
        "(will remove)".to_string()
    } else if diff.is_modification() {
        let n = diff.changes.len();
        format!("({} attribute{} changed)", n, if n == 1 { "" } else { "s" })
    } else {
        String::new()
    }
}
