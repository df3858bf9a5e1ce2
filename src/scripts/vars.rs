// src/scripts/vars.rs
use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{is_valid_variable_name, DeployManifest};
use crate::manifest_updater::{self, VariableUpdate};

pub fn set(manifest_path: &Path, name: &str, update: VariableUpdate, secret: Option<bool>) -> Result<()> {
    if !DeployManifest::exists(manifest_path) {
        anyhow::bail!(
            "No manifest at {}. Run 'deploy-bootstrap init' first",
            manifest_path.display()
        );
    }

    if !is_valid_variable_name(name) {
        anyhow::bail!("Invalid variable name '{}'", name);
    }
    if let VariableUpdate::FromEnv(env) = &update {
        if !is_valid_variable_name(env) {
            anyhow::bail!("Invalid environment variable name '{}'", env);
        }
    }

    let created = manifest_updater::set_variable(manifest_path, name, &update, secret)?;

    let manifest = DeployManifest::load(manifest_path)?;
    manifest
        .validate()
        .with_context(|| format!("{} is invalid after updating {}", manifest_path.display(), name))?;

    let what = match &update {
        VariableUpdate::Value(_) => "literal value",
        VariableUpdate::FromEnv(env) => {
            println!("🔑 {} will be read from ${} at deploy time", name, env);
            "environment source"
        }
        VariableUpdate::Placeholder(_) => "placeholder",
    };
    if created {
        println!("✅ Added {} with a {}", name, what);
    } else {
        println!("✅ Updated {} {}", name, what);
    }
    Ok(())
}

pub fn unset(manifest_path: &Path, name: &str) -> Result<()> {
    if manifest_updater::remove_variable(manifest_path, name)? {
        println!("🗑️  Removed {} from {}", name, manifest_path.display());
    } else {
        println!("⚠️  {} is not declared in {}", name, manifest_path.display());
    }
    Ok(())
}
