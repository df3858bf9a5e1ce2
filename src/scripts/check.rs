// src/scripts/check.rs
use anyhow::Result;
use std::path::Path;

use crate::config::{ConfigSource, DeployManifest, GlobalConfig, ResolvedPlatform};
use crate::plan::{self, Substitutions};
use crate::secrets;
use crate::shell::{Invocation, Shell, SystemShell};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub cli_found: bool,
    pub logged_in_as: Option<String>,
    pub placeholders: Vec<String>,
}

impl Readiness {
    pub fn ready(&self) -> bool {
        self.cli_found && self.placeholders.is_empty()
    }
}

pub async fn run(manifest_path: &Path) -> Result<()> {
    let (manifest, resolved) = super::load_context(manifest_path)?;
    let mut shell = SystemShell;
    let readiness = inspect(&mut shell, &manifest, &resolved, secrets::env_lookup).await?;

    println!();
    if readiness.ready() {
        match &readiness.logged_in_as {
            Some(user) => println!("✅ Ready to deploy as {}: deploy-bootstrap deploy", user),
            None => println!("✅ Ready to deploy: deploy-bootstrap deploy"),
        }
    } else {
        println!("💡 Not fully ready:");
        if !readiness.cli_found {
            println!("   - '{}' will be installed on the first deploy", resolved.config.cli);
        }
        if !readiness.placeholders.is_empty() {
            println!(
                "   - export real values for: {}",
                readiness.placeholders.join(", ")
            );
        }
    }
    Ok(())
}

fn source_label(resolved: &ResolvedPlatform, field: &str) -> String {
    resolved
        .source_of(field)
        .unwrap_or(ConfigSource::Default)
        .to_string()
}

pub async fn inspect<S, F>(
    shell: &mut S,
    manifest: &DeployManifest,
    resolved: &ResolvedPlatform,
    lookup: F,
) -> Result<Readiness>
where
    S: Shell,
    F: Fn(&str) -> Option<String>,
{
    let platform = &resolved.config;
    let mut readiness = Readiness::default();

    println!("📋 Project: {}", manifest.project.name);
    if let Some(repo) = &manifest.project.repo {
        println!("🔗 Repository: {}", repo);
    }
    println!();

    println!("🛠️  Platform CLI (resolved):");
    println!("   CLI:            {} (Source: {})", platform.cli, source_label(resolved, "cli"));
    println!(
        "   Install script: {} (Source: {})",
        platform.install_script,
        source_label(resolved, "install_script")
    );
    for (field, template) in platform.templates() {
        println!(
            "   {:<15} {} (Source: {})",
            format!("{}:", field),
            template.join(" "),
            source_label(resolved, field)
        );
    }
    if let Some(path) = GlobalConfig::path() {
        println!("   Global config:  {}", path.display());
    }

    match shell.locate(&platform.cli) {
        Some(path) => {
            readiness.cli_found = true;
            println!("   Status: ✅ Installed at {}", path.display());

            let subs = Substitutions {
                project: &manifest.project.name,
                repo: manifest.project.repo.as_deref(),
                ..Default::default()
            };
            let args = plan::render_args(&platform.whoami, &subs)?;
            let whoami = Invocation {
                program: platform.cli.clone(),
                display: format!("{} {}", platform.cli, args.join(" ")),
                args,
            };
            match shell.capture(&whoami).await {
                Ok(Some(user)) if !user.is_empty() => {
                    println!("   Login:  ✅ {}", user);
                    readiness.logged_in_as = Some(user);
                }
                _ => println!("   Login:  ⚠️  Not logged in (the deploy will prompt you)"),
            }
        }
        None => println!("   Status: ❌ Not installed"),
    }
    println!();

    println!("🔑 Variables ({}):", manifest.variables.len());
    for spec in &manifest.variables {
        let resolved_value = secrets::resolve(spec, &lookup)?;
        let marker = if resolved_value.is_placeholder() {
            readiness.placeholders.push(spec.name.clone());
            "⚠️ "
        } else {
            "✅"
        };
        println!(
            "   {} {:<28} {} ({})",
            marker,
            spec.name,
            secrets::display_value(spec, &resolved_value),
            resolved_value.origin
        );
    }

    Ok(readiness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_platform, PlatformOverrides};
    use crate::test_support::FakeShell;

    #[tokio::test]
    async fn test_inspect_reports_cli_login_and_placeholders() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let resolved = resolve_platform(&PlatformOverrides::default(), None);
        let mut shell = FakeShell::with_cli_installed();

        let readiness = inspect(&mut shell, &manifest, &resolved, |_| None)
            .await
            .unwrap();

        assert!(readiness.cli_found);
        assert_eq!(readiness.logged_in_as.as_deref(), Some("dev@example.com"));
        assert_eq!(readiness.placeholders.len(), 9);
        assert!(!readiness.ready());
        assert_eq!(shell.calls, vec!["railway whoami"]);
    }

    #[tokio::test]
    async fn test_inspect_without_cli_never_runs_it() {
        let mut manifest = DeployManifest::new_default("shop".to_string(), None);
        manifest.variables.retain(|v| v.value.is_some());
        let resolved = resolve_platform(&PlatformOverrides::default(), None);
        let mut shell = FakeShell::without_cli();

        let readiness = inspect(&mut shell, &manifest, &resolved, |_| None)
            .await
            .unwrap();

        assert!(!readiness.cli_found);
        assert!(readiness.placeholders.is_empty());
        assert!(shell.calls.is_empty());
    }
}
