// src/shell.rs
//! Everything that touches the outside world: locating binaries, downloading
//! the install script and running child processes.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A fully rendered external command. `display` has secrets masked and is the
/// only form that may be printed or logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub display: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Shell {
    fn locate(&self, program: &str) -> Option<PathBuf>;

    async fn fetch_script(&self, url: &str, timeout_ms: u64) -> Result<String>;

    /// Runs with the terminal attached so interactive commands work.
    async fn run(&mut self, invocation: &Invocation) -> Result<CommandOutcome>;

    /// Feeds `script` to `sh` on stdin.
    async fn run_script(&mut self, script: &str) -> Result<CommandOutcome>;

    /// Runs without a terminal and returns trimmed stdout on success.
    async fn capture(&mut self, invocation: &Invocation) -> Result<Option<String>>;
}

pub struct SystemShell;

impl Shell for SystemShell {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    async fn fetch_script(&self, url: &str, timeout_ms: u64) -> Result<String> {
        crate::installer::download_script(url, timeout_ms).await
    }

    async fn run(&mut self, invocation: &Invocation) -> Result<CommandOutcome> {
        info!("Running: {}", invocation.display);
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .await
            .with_context(|| format!("Failed to start '{}'", invocation.program))?;
        debug!("'{}' finished with {:?}", invocation.display, status);
        Ok(CommandOutcome {
            code: status.code(),
        })
    }

    async fn run_script(&mut self, script: &str) -> Result<CommandOutcome> {
        info!("Running install script ({} bytes) with sh", script.len());
        let mut child = Command::new("sh")
            .arg("-s")
            .stdin(Stdio::piped())
            .spawn()
            .context("Failed to start 'sh' for the install script")?;

        let mut stdin = child
            .stdin
            .take()
            .context("Failed to open stdin of 'sh'")?;
        stdin
            .write_all(script.as_bytes())
            .await
            .context("Failed to pass the install script to 'sh'")?;
        drop(stdin);

        let status = child
            .wait()
            .await
            .context("Failed to wait for the install script")?;
        Ok(CommandOutcome {
            code: status.code(),
        })
    }

    async fn capture(&mut self, invocation: &Invocation) -> Result<Option<String>> {
        debug!("Capturing output of: {}", invocation.display);
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to start '{}'", invocation.program))?;

        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
        } else {
            debug!(
                "'{}' failed: {}",
                invocation.display,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            Ok(None)
        }
    }
}
