// src/test_support.rs
//! In-memory shell used by the tests.

use anyhow::Result;
use std::path::PathBuf;

use crate::shell::{CommandOutcome, Invocation, Shell};

pub struct FakeShell {
    pub cli_installed: bool,
    pub install_provides_cli: bool,
    /// Commands whose rendered args contain this text exit with code 1.
    pub fail_on: Option<String>,
    pub whoami: Option<String>,
    pub calls: Vec<String>,
}

impl FakeShell {
    pub fn with_cli_installed() -> Self {
        Self {
            cli_installed: true,
            install_provides_cli: true,
            fail_on: None,
            whoami: Some("dev@example.com".to_string()),
            calls: Vec::new(),
        }
    }

    pub fn without_cli() -> Self {
        Self {
            cli_installed: false,
            ..Self::with_cli_installed()
        }
    }

    pub fn failing_on(text: &str) -> Self {
        Self {
            fail_on: Some(text.to_string()),
            ..Self::with_cli_installed()
        }
    }
}

fn command_line(invocation: &Invocation) -> String {
    let mut line = invocation.program.clone();
    for arg in &invocation.args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

impl Shell for FakeShell {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.cli_installed
            .then(|| PathBuf::from("/usr/local/bin").join(program))
    }

    async fn fetch_script(&self, url: &str, _timeout_ms: u64) -> Result<String> {
        // recorded by run_script, this only has &self
        Ok(format!("# fetched from {}\n", url))
    }

    async fn run(&mut self, invocation: &Invocation) -> Result<CommandOutcome> {
        let line = command_line(invocation);
        let failed = self
            .fail_on
            .as_deref()
            .is_some_and(|text| line.contains(text));
        self.calls.push(line);
        Ok(CommandOutcome {
            code: Some(if failed { 1 } else { 0 }),
        })
    }

    async fn run_script(&mut self, script: &str) -> Result<CommandOutcome> {
        if let Some(url) = script
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("# fetched from "))
        {
            self.calls.push(format!("fetch {}", url));
        }
        self.calls.push("sh <install script>".to_string());
        if self.install_provides_cli {
            self.cli_installed = true;
        }
        Ok(CommandOutcome { code: Some(0) })
    }

    async fn capture(&mut self, invocation: &Invocation) -> Result<Option<String>> {
        self.calls.push(command_line(invocation));
        Ok(self.whoami.clone())
    }
}
