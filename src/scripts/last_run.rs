// src/scripts/last_run.rs
use anyhow::Result;
use std::path::Path;

use crate::config::state_dir;
use crate::report::{RunReport, StepStatus};

pub fn run(manifest_path: &Path) -> Result<()> {
    let Some(report) = RunReport::load_last(&state_dir(manifest_path))? else {
        println!("📭 No deploy has been recorded yet");
        println!("💡 Run one with: deploy-bootstrap deploy");
        return Ok(());
    };

    println!("📋 Last run of '{}'", report.project);
    println!("   Run id:   {}", report.run_id);
    println!("   Started:  {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    match report.finished_at {
        Some(finished) => {
            let secs = (finished - report.started_at).num_seconds();
            println!("   Finished: {} ({}s)", finished.format("%Y-%m-%d %H:%M:%S UTC"), secs);
        }
        None => println!("   Finished: never (interrupted)"),
    }
    println!();

    for record in &report.steps {
        let (icon, detail) = match &record.result {
            StepStatus::Succeeded => ("✅", String::new()),
            StepStatus::AlreadySatisfied => ("✅", " (already done)".to_string()),
            StepStatus::Skipped => ("⏭️ ", " (skipped)".to_string()),
            StepStatus::Failed { code: Some(code) } => ("❌", format!(" (exit code {})", code)),
            StepStatus::Failed { code: None } => ("❌", " (did not complete)".to_string()),
        };
        println!("   {} {}{}", icon, record.description, detail);
        if let Some(command) = &record.command {
            println!("        $ {}", command);
        }
    }

    if let Some(first) = report.first_failure() {
        println!();
        println!("💡 Resume with: deploy-bootstrap deploy --start-at {}", first.kind);
    }
    Ok(())
}
