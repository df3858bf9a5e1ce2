// src/installer.rs
//! Makes sure the platform CLI is on PATH, installing it from the vendor's
//! install script when it is missing.

use anyhow::{Context, Result};
use log::{debug, error, info};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::PlatformConfig;
use crate::shell::Shell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliStatus {
    AlreadyInstalled(PathBuf),
    Installed(PathBuf),
}

/// Downloads the install script body.
pub async fn download_script(url: &str, timeout_ms: u64) -> Result<String> {
    info!("Downloading install script from {}", url);
    let client = Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .context("Failed to build HTTP client")?;

    let res = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download install script from {}", url))?;

    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_else(|_| "N/A".to_string());
        error!("Install script download returned HTTP {} and body: {}", status, text);
        anyhow::bail!("Install script download failed with HTTP {}", status);
    }

    let body = res
        .text()
        .await
        .context("Failed to read install script body")?;
    debug!("Downloaded install script: {} bytes", body.len());

    if body.trim().is_empty() {
        anyhow::bail!("Install script at {} is empty", url);
    }
    Ok(body)
}

/// Installs only when the CLI cannot be located.
pub async fn ensure_cli<S: Shell>(
    shell: &mut S,
    platform: &PlatformConfig,
    allow_install: bool,
) -> Result<CliStatus> {
    if let Some(path) = shell.locate(&platform.cli) {
        debug!("{} found at {}", platform.cli, path.display());
        return Ok(CliStatus::AlreadyInstalled(path));
    }

    if !allow_install {
        anyhow::bail!(
            "'{}' is not installed and installation was disabled (--skip-install)",
            platform.cli
        );
    }

    println!("   📦 '{}' not found, installing from {}", platform.cli, platform.install_script);
    let script = shell
        .fetch_script(&platform.install_script, platform.install_timeout_ms)
        .await?;

    let outcome = shell.run_script(&script).await?;
    if !outcome.success() {
        anyhow::bail!("Install script failed ({})", outcome.describe());
    }

    let path = shell.locate(&platform.cli).with_context(|| {
        format!(
            "Install script finished but '{}' is still not on PATH. Open a new shell or add its install directory to PATH",
            platform.cli
        )
    })?;
    info!("Installed {} at {}", platform.cli, path.display());
    Ok(CliStatus::Installed(path))
}
