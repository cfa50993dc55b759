use anyhow::{Context, Result};
use std::process::Command;

/// Run a command and capture output
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(cmd)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}", stderr.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_capture_trims_output() {
        assert_eq!(run_capture("echo", &["  web-01  "]).unwrap(), "web-01");
    }

    #[test]
    fn test_run_capture_missing_command() {
        let err = run_capture("definitely-not-a-command-xyz", &[]).unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
    }
}
