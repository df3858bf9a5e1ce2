// src/scripts/plan.rs
use anyhow::{Context, Result};
use std::path::Path;

use crate::config::PlatformConfig;
use crate::plan::{DeployPlan, Step};
use crate::secrets::{self, ValueOrigin};

pub fn run(manifest_path: &Path, json: bool) -> Result<()> {
    let (manifest, resolved) = super::load_context(manifest_path)?;
    let plan = DeployPlan::build(&manifest, &resolved.config, secrets::env_lookup)?;

    if json {
        let out = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{}", out);
        return Ok(());
    }

    print_plan(&plan, &resolved.config);
    Ok(())
}

pub fn print_plan(plan: &DeployPlan, platform: &PlatformConfig) {
    println!("📋 Deploy plan for '{}' ({} steps)", plan.project, plan.len());
    println!();

    let total = plan.len();
    for (i, planned) in plan.steps.iter().enumerate() {
        println!("{:>3}/{} {}", i + 1, total, planned.step.description(platform));
        match &planned.step {
            Step::EnsureCli => {
                println!("        install from {} if missing", plan.install_script);
            }
            Step::SetVariable { origin, .. } => {
                if let Some(command) = &planned.command {
                    println!("        $ {}", command);
                }
                let marker = match origin {
                    ValueOrigin::Placeholder => "⚠️ ",
                    _ => "✅",
                };
                println!("        {} value from {}", marker, origin);
            }
            _ => {
                if let Some(command) = &planned.command {
                    println!("        $ {}", command);
                }
            }
        }
    }

    let placeholders = plan.placeholders();
    println!();
    if placeholders.is_empty() {
        println!("✅ No placeholders: every variable has a real value");
    } else {
        println!(
            "⚠️  {} variable(s) would be set to placeholders: {}",
            placeholders.len(),
            placeholders.join(", ")
        );
    }
}
