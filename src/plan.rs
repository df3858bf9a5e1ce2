// src/plan.rs
//! Builds the ordered list of platform commands for one bootstrap run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{DeployManifest, PlatformConfig};
use crate::secrets::{self, ValueOrigin};
use crate::shell::Invocation;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    EnsureCli,
    Login,
    CreateProject,
    LinkRepo,
    SetVariables,
    Deploy,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::EnsureCli => "ensure-cli",
            StepKind::Login => "login",
            StepKind::CreateProject => "create-project",
            StepKind::LinkRepo => "link-repo",
            StepKind::SetVariables => "set-variables",
            StepKind::Deploy => "deploy",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    EnsureCli,
    Login,
    CreateProject,
    LinkRepo,
    SetVariable {
        name: String,
        display_value: String,
        origin: ValueOrigin,
    },
    Deploy,
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Step::EnsureCli => StepKind::EnsureCli,
            Step::Login => StepKind::Login,
            Step::CreateProject => StepKind::CreateProject,
            Step::LinkRepo => StepKind::LinkRepo,
            Step::SetVariable { .. } => StepKind::SetVariables,
            Step::Deploy => StepKind::Deploy,
        }
    }

    pub fn description(&self, platform: &PlatformConfig) -> String {
        match self {
            Step::EnsureCli => format!("Check that '{}' is installed", platform.cli),
            Step::Login => format!("Log in to {}", platform.cli),
            Step::CreateProject => "Create project".to_string(),
            Step::LinkRepo => "Link source repository".to_string(),
            Step::SetVariable { name, .. } => format!("Set {}", name),
            Step::Deploy => "Deploy".to_string(),
        }
    }
}

/// Values available to `{...}` tokens in argument templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Substitutions<'a> {
    pub project: &'a str,
    pub repo: Option<&'a str>,
    pub name: Option<&'a str>,
    pub value: Option<&'a str>,
}

impl<'a> Substitutions<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        match key {
            "project" => Some(self.project),
            "repo" => self.repo,
            "name" => self.name,
            "value" => self.value,
            _ => None,
        }
    }
}

fn render_arg(arg: &str, subs: &Substitutions) -> Result<String> {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed '{{' in argument template '{}'", arg))?;
        let key = &after[..end];
        let replacement = subs.get(key).with_context(|| {
            format!("Unknown or unavailable '{{{}}}' in argument template '{}'", key, arg)
        })?;
        out.push_str(replacement);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Expands `{project}`, `{repo}`, `{name}` and `{value}` in every argument.
/// Substituted text is not rescanned.
pub fn render_args(template: &[String], subs: &Substitutions) -> Result<Vec<String>> {
    template.iter().map(|arg| render_arg(arg, subs)).collect()
}

fn quote_for_display(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=./:@,+".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn invocation(
    platform: &PlatformConfig,
    template: &[String],
    real: &Substitutions,
    shown: &Substitutions,
) -> Result<Invocation> {
    let args = render_args(template, real)?;
    let mut display = platform.cli.clone();
    for arg in render_args(template, shown)? {
        display.push(' ');
        display.push_str(&quote_for_display(&arg));
    }
    Ok(Invocation {
        program: platform.cli.clone(),
        args,
        display,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub step: Step,
    pub command: Option<String>,
    #[serde(skip)]
    pub invocation: Option<Invocation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployPlan {
    pub project: String,
    pub repo: Option<String>,
    pub cli: String,
    pub install_script: String,
    pub steps: Vec<PlannedStep>,
}

impl DeployPlan {
    /// Steps come out in the fixed order: ensure CLI, login, create project,
    /// link repo, one assignment per variable in manifest order, deploy.
    /// An empty `link_repo` command drops the link step.
    pub fn build<F>(manifest: &DeployManifest, platform: &PlatformConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Substitutions {
            project: &manifest.project.name,
            repo: manifest.project.repo.as_deref(),
            ..Default::default()
        };

        let mut steps = vec![PlannedStep {
            step: Step::EnsureCli,
            command: None,
            invocation: None,
        }];

        let mut fixed = |step: Step, template: &[String]| -> Result<()> {
            let inv = invocation(platform, template, &base, &base)?;
            steps.push(PlannedStep {
                step,
                command: Some(inv.display.clone()),
                invocation: Some(inv),
            });
            Ok(())
        };
        fixed(Step::Login, platform.login.as_slice()).context("Invalid 'login' command")?;
        fixed(Step::CreateProject, platform.create_project.as_slice())
            .context("Invalid 'create_project' command")?;
        if !platform.link_repo.is_empty() {
            fixed(Step::LinkRepo, platform.link_repo.as_slice()).context("Invalid 'link_repo' command")?;
        }

        for spec in &manifest.variables {
            let resolved = secrets::resolve(spec, &lookup)?;
            let shown_value = secrets::display_value(spec, &resolved);
            let real = Substitutions {
                name: Some(spec.name.as_str()),
                value: Some(resolved.value.as_str()),
                ..base
            };
            let shown = Substitutions {
                value: Some(shown_value.as_str()),
                ..real
            };
            let inv = invocation(platform, &platform.set_variable, &real, &shown)
                .with_context(|| format!("Invalid 'set_variable' command for {}", spec.name))?;
            steps.push(PlannedStep {
                step: Step::SetVariable {
                    name: spec.name.clone(),
                    display_value: shown_value.clone(),
                    origin: resolved.origin,
                },
                command: Some(inv.display.clone()),
                invocation: Some(inv),
            });
        }

        let deploy = invocation(platform, &platform.deploy, &base, &base)
            .context("Invalid 'deploy' command")?;
        steps.push(PlannedStep {
            step: Step::Deploy,
            command: Some(deploy.display.clone()),
            invocation: Some(deploy),
        });

        Ok(Self {
            project: manifest.project.name.clone(),
            repo: manifest.project.repo.clone(),
            cli: platform.cli.clone(),
            install_script: platform.install_script.clone(),
            steps,
        })
    }

    /// Variables that would be set to their placeholder.
    pub fn placeholders(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|planned| match &planned.step {
                Step::SetVariable {
                    name,
                    origin: ValueOrigin::Placeholder,
                    ..
                } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Masked command for a variable assignment, used in follow-up hints.
pub fn set_variable_hint(platform: &PlatformConfig, project: &str, name: &str) -> String {
    let subs = Substitutions {
        project,
        repo: None,
        name: Some(name),
        value: Some("<real value>"),
    };
    match invocation(platform, &platform.set_variable, &subs, &subs) {
        Ok(inv) => inv.display,
        Err(_) => format!("{} <set {}>", platform.cli, name),
    }
}
