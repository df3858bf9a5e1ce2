// src/scripts/init.rs
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

use crate::config::{DeployManifest, MANIFEST_FILE};
use crate::templates::Templates;

pub fn run(manifest_path: &Path, name: Option<String>, repo: Option<String>, force: bool) -> Result<()> {
    if DeployManifest::exists(manifest_path) && !force {
        println!("⚠️  Manifest already exists ({})", manifest_path.display());
        println!("💡 Use other commands to work with it:");
        println!("   deploy-bootstrap plan                # Preview the commands");
        println!("   deploy-bootstrap check               # Check CLI and variables");
        println!("   deploy-bootstrap init --force        # Overwrite with a fresh template");
        return Ok(());
    }

    let project_dir = match manifest_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir().context("Failed to get current directory")?,
    };

    let project_name = match name {
        Some(provided_name) => {
            println!("🚀 Initializing deploy manifest for: {}", provided_name);
            provided_name
        }
        None => {
            let dir_name = project_dir
                .canonicalize()
                .unwrap_or_else(|_| project_dir.clone())
                .file_name()
                .context("Failed to get directory name")?
                .to_string_lossy()
                .to_string();
            println!("🚀 Initializing deploy manifest for: {} (from directory name)", dir_name);
            dir_name
        }
    };

    let defaults = DeployManifest::new_default(project_name.clone(), repo);
    let content = Templates::manifest_template(
        &defaults.project.name,
        defaults.project.repo.as_deref(),
        &defaults.variables,
    );

    // Never write something we could not load back.
    DeployManifest::parse(&content)
        .and_then(|m| m.validate().map(|_| m))
        .context("Generated manifest is invalid")?;

    fs::write(manifest_path, content)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;
    info!("Wrote manifest to {}", manifest_path.display());
    println!("✅ Created {}", manifest_path.display());

    let gitignore_path = project_dir.join(".gitignore");
    if gitignore_path.exists() {
        let mut gitignore_content = fs::read_to_string(&gitignore_path)
            .context("Failed to read .gitignore")?;
        if !gitignore_content.contains("# deploy-bootstrap") {
            gitignore_content.push_str(Templates::gitignore_additions());
            fs::write(&gitignore_path, gitignore_content)
                .context("Failed to update .gitignore")?;
            println!("✅ Updated .gitignore with deploy-bootstrap entries");
        } else {
            println!("📄 .gitignore already contains deploy-bootstrap entries - skipping");
        }
    } else {
        fs::write(&gitignore_path, Templates::gitignore_additions().trim_start())
            .context("Failed to create .gitignore")?;
        println!("✅ Created .gitignore");
    }

    println!();
    println!("🎉 Manifest for '{}' is ready!", project_name);
    println!();
    println!("🎯 Next steps:");
    println!("   1. Review {} and export your real secrets, e.g.", MANIFEST_FILE);
    println!("      export STRIPE_SECRET_KEY=sk_live_...");
    println!("   2. deploy-bootstrap check            # Verify CLI and variables");
    println!("   3. deploy-bootstrap deploy           # Run the bootstrap");

    Ok(())
}
