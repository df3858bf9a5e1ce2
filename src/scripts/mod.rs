// src/scripts/mod.rs
pub mod init;
pub mod plan;
pub mod check;
pub mod deploy;
pub mod vars;
pub mod last_run;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{resolve_platform, DeployManifest, GlobalConfig, ResolvedPlatform};

/// Loads and validates everything a command needs from the manifest and the
/// global config.
pub fn load_context(manifest_path: &Path) -> Result<(DeployManifest, ResolvedPlatform)> {
    if !DeployManifest::exists(manifest_path) {
        anyhow::bail!(
            "No manifest at {}. Run 'deploy-bootstrap init' first",
            manifest_path.display()
        );
    }

    let manifest = DeployManifest::load(manifest_path)?;
    manifest.validate().context("Manifest validation failed")?;

    let global = GlobalConfig::load().context("Failed to load global deploy-bootstrap configuration")?;
    let resolved = resolve_platform(&manifest.platform, global.platform.as_ref());
    resolved
        .config
        .validate(manifest.project.repo.as_deref())
        .context("Platform configuration is invalid")?;

    Ok((manifest, resolved))
}
