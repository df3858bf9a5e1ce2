// src/scripts/deploy.rs
//! The bootstrap run: install, login, create, link, set variables, deploy.

use anyhow::Result;
use log::{error, info, warn};
use std::path::PathBuf;

use crate::config::{state_dir, DeployManifest, PlatformConfig};
use crate::installer::{self, CliStatus};
use crate::plan::{DeployPlan, Step, StepKind};
use crate::report::{RunReport, StepStatus};
use crate::secrets::{self, ValueOrigin};
use crate::shell::{Shell, SystemShell};
use crate::templates::Templates;

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub manifest: PathBuf,
    pub dry_run: bool,
    pub keep_going: bool,
    pub start_at: Option<StepKind>,
    pub require_secrets: bool,
    pub skip_install: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Run every step even after a failure.
    pub keep_going: bool,
    pub start_at: Option<StepKind>,
    pub allow_install: bool,
}

pub async fn run(options: DeployOptions) -> Result<()> {
    let mut shell = SystemShell;
    run_with(&mut shell, &options, secrets::env_lookup).await
}

/// Everything `deploy` does after argument parsing, against any shell and
/// environment lookup.
pub async fn run_with<S, F>(shell: &mut S, options: &DeployOptions, lookup: F) -> Result<()>
where
    S: Shell,
    F: Fn(&str) -> Option<String>,
{
    let (manifest, resolved) = super::load_context(&options.manifest)?;
    let platform = resolved.config;
    let plan = DeployPlan::build(&manifest, &platform, lookup)?;

    let placeholders = plan.placeholders();
    if options.require_secrets && !placeholders.is_empty() {
        println!("❌ Refusing to deploy: these variables have no real value:");
        for name in &placeholders {
            println!("   {:<28} {}", name, secret_hint(&manifest, name));
        }
        anyhow::bail!(
            "{} variable(s) would fall back to placeholders (--require-secrets)",
            placeholders.len()
        );
    }

    if options.dry_run {
        super::plan::print_plan(&plan, &platform);
        println!();
        println!("🔍 Dry run: nothing was executed");
        return Ok(());
    }

    println!("🚀 Bootstrapping '{}' with {}", plan.project, platform.cli);
    println!();

    let exec = ExecuteOptions {
        keep_going: options.keep_going,
        start_at: options.start_at,
        allow_install: !options.skip_install,
    };
    let report = execute(shell, &plan, &platform, exec).await;

    let state = state_dir(&options.manifest);
    match report.save(&state) {
        Ok(path) => info!("Run report written to {}", path.display()),
        Err(e) => warn!("Could not save run report: {:#}", e),
    }

    println!();
    print!("{}", summary(&report, &plan, &platform, options.keep_going));

    if report.failures().is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Bootstrap of '{}' did not complete", plan.project)
    }
}

/// How the operator gives `name` a real value. Exporting only helps when the
/// variable reads from the environment.
fn secret_hint(manifest: &DeployManifest, name: &str) -> String {
    match manifest.variable(name).and_then(|v| v.from_env.as_deref()) {
        Some(env) => format!("export {}=...", env),
        None => format!("deploy-bootstrap set-var {} --from-env {}", name, name),
    }
}

/// Closing text of a run. Follow-up instructions are printed whenever every
/// step got its chance to run, so with `keep_going` they come before the
/// resume hint.
fn summary(report: &RunReport, plan: &DeployPlan, platform: &PlatformConfig, keep_going: bool) -> String {
    let mut out = String::new();
    let failures = report.failures();

    if failures.is_empty() {
        out.push_str(&format!("🎉 Deploy of '{}' finished\n\n", plan.project));
        out.push_str(&Templates::follow_up_instructions(plan, platform));
        return out;
    }

    out.push_str(&format!("❌ {} step(s) failed:\n", failures.len()));
    for failure in &failures {
        out.push_str(&format!(
            "   {} ({})\n",
            failure.description,
            describe_status(&failure.result)
        ));
    }
    if keep_going {
        out.push('\n');
        out.push_str(&Templates::follow_up_instructions(plan, platform));
    }
    if let Some(first) = report.first_failure() {
        out.push_str("\n💡 Fix the problem, then resume with:\n");
        out.push_str(&format!("   deploy-bootstrap deploy --start-at {}\n", first.kind));
    }
    out
}

fn describe_status(status: &StepStatus) -> String {
    match status {
        StepStatus::Failed { code: Some(code) } => format!("exit code {}", code),
        StepStatus::Failed { code: None } => "did not run to completion".to_string(),
        StepStatus::Succeeded => "ok".to_string(),
        StepStatus::AlreadySatisfied => "already done".to_string(),
        StepStatus::Skipped => "skipped".to_string(),
    }
}

/// Runs the plan in order. Without `keep_going` the first failure stops the
/// run; the failure is in the returned report either way.
pub async fn execute<S: Shell>(
    shell: &mut S,
    plan: &DeployPlan,
    platform: &PlatformConfig,
    options: ExecuteOptions,
) -> RunReport {
    let mut report = RunReport::new(&plan.project);
    let total = plan.len();

    for (i, planned) in plan.steps.iter().enumerate() {
        let kind = planned.step.kind();
        let description = planned.step.description(platform);
        println!("▶ [{}/{}] {}", i + 1, total, description);

        if options.start_at.is_some_and(|start| kind < start) {
            println!("   ⏭️  Skipped");
            report.record(kind, description, planned.command.clone(), StepStatus::Skipped);
            continue;
        }

        let status = match &planned.step {
            Step::EnsureCli => match installer::ensure_cli(shell, platform, options.allow_install).await {
                Ok(CliStatus::AlreadyInstalled(path)) => {
                    println!("   ✅ Found {}", path.display());
                    StepStatus::AlreadySatisfied
                }
                Ok(CliStatus::Installed(path)) => {
                    println!("   ✅ Installed {}", path.display());
                    StepStatus::Succeeded
                }
                Err(e) => {
                    error!("CLI check failed: {:#}", e);
                    println!("   ❌ {:#}", e);
                    StepStatus::Failed { code: None }
                }
            },
            step => {
                if let Step::SetVariable {
                    origin: ValueOrigin::Placeholder,
                    name,
                    ..
                } = step
                {
                    println!("   ⚠️  {} has no real value, using its placeholder", name);
                }
                run_invocation(shell, planned.invocation.as_ref()).await
            }
        };

        let failed = matches!(status, StepStatus::Failed { .. });
        report.record(kind, description, planned.command.clone(), status);

        if failed && !options.keep_going {
            warn!("Stopping after failed step {}/{}", i + 1, total);
            break;
        }
    }

    report.finish();
    report
}

async fn run_invocation<S: Shell>(
    shell: &mut S,
    invocation: Option<&crate::shell::Invocation>,
) -> StepStatus {
    let Some(invocation) = invocation else {
        return StepStatus::Skipped;
    };
    println!("   $ {}", invocation.display);

    match shell.run(invocation).await {
        Ok(outcome) if outcome.success() => {
            println!("   ✅ Done");
            StepStatus::Succeeded
        }
        Ok(outcome) => {
            println!("   ❌ Failed ({})", outcome.describe());
            StepStatus::Failed { code: outcome.code }
        }
        Err(e) => {
            error!("{:#}", e);
            println!("   ❌ {:#}", e);
            StepStatus::Failed { code: None }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeShell;
    use std::path::Path;

    fn plan_for(manifest: &DeployManifest) -> DeployPlan {
        DeployPlan::build(manifest, &PlatformConfig::default(), |name| {
            (name == "SECRET_KEY").then(|| "super-secret-value-123".to_string())
        })
        .unwrap()
    }

    fn run_all() -> ExecuteOptions {
        ExecuteOptions {
            allow_install: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_commands_are_issued_in_documented_order() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let plan = plan_for(&manifest);
        let mut shell = FakeShell::with_cli_installed();

        let report = execute(&mut shell, &plan, &PlatformConfig::default(), run_all()).await;

        assert!(report.failures().is_empty());
        assert_eq!(shell.calls.len(), 3 + 11 + 1);
        assert_eq!(shell.calls[0], "railway login");
        assert_eq!(shell.calls[1], "railway init --name shop");
        assert_eq!(shell.calls[2], "railway link");
        assert_eq!(shell.calls[3], "railway variables --set SECRET_KEY=super-secret-value-123");
        assert_eq!(shell.calls[4], "railway variables --set STRIPE_SECRET_KEY=sk_test_your_stripe_secret_key");
        assert_eq!(shell.calls[12], "railway variables --set FLASK_ENV=production");
        assert_eq!(shell.calls[13], "railway variables --set DATABASE_PATH=/app/data/app.db");
        assert_eq!(shell.calls[14], "railway up");

        assert_eq!(report.steps[0].result, StepStatus::AlreadySatisfied);
        assert!(report.steps[1..].iter().all(|s| s.result == StepStatus::Succeeded));
    }

    #[tokio::test]
    async fn test_install_runs_before_login_when_cli_missing() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let plan = plan_for(&manifest);
        let mut shell = FakeShell::without_cli();

        let report = execute(&mut shell, &plan, &PlatformConfig::default(), run_all()).await;

        assert!(report.failures().is_empty());
        assert_eq!(shell.calls[0], "fetch https://railway.app/install.sh");
        assert_eq!(shell.calls[1], "sh <install script>");
        assert_eq!(shell.calls[2], "railway login");
        assert_eq!(report.steps[0].result, StepStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_first_failure() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let plan = plan_for(&manifest);
        let mut shell = FakeShell::failing_on("init --name");

        let report = execute(&mut shell, &plan, &PlatformConfig::default(), run_all()).await;

        assert_eq!(shell.calls, vec!["railway login", "railway init --name shop"]);
        assert_eq!(report.steps.len(), 3);
        let failure = report.first_failure().unwrap();
        assert_eq!(failure.kind, StepKind::CreateProject);
        assert_eq!(failure.result, StepStatus::Failed { code: Some(1) });
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_keep_going_runs_every_step_and_reports_failures() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let plan = plan_for(&manifest);
        let mut shell = FakeShell::failing_on("STRIPE_");

        let options = ExecuteOptions {
            keep_going: true,
            ..run_all()
        };
        let report = execute(&mut shell, &plan, &PlatformConfig::default(), options).await;

        assert_eq!(shell.calls.len(), 15);
        assert_eq!(shell.calls.last().map(String::as_str), Some("railway up"));
        assert_eq!(report.failures().len(), 4);
        assert_eq!(report.first_failure().unwrap().description, "Set STRIPE_SECRET_KEY");
    }

    #[tokio::test]
    async fn test_start_at_skips_earlier_steps() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let plan = plan_for(&manifest);
        let mut shell = FakeShell::without_cli();

        let options = ExecuteOptions {
            start_at: Some(StepKind::SetVariables),
            ..run_all()
        };
        let report = execute(&mut shell, &plan, &PlatformConfig::default(), options).await;

        assert_eq!(shell.calls.len(), 12);
        assert!(shell.calls[0].starts_with("railway variables --set SECRET_KEY="));
        let skipped: Vec<StepKind> = report
            .steps
            .iter()
            .filter(|s| s.result == StepStatus::Skipped)
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            skipped,
            vec![StepKind::EnsureCli, StepKind::Login, StepKind::CreateProject, StepKind::LinkRepo]
        );
    }

    #[tokio::test]
    async fn test_report_never_contains_raw_secrets() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let plan = plan_for(&manifest);
        let mut shell = FakeShell::with_cli_installed();

        let report = execute(&mut shell, &plan, &PlatformConfig::default(), run_all()).await;
        let json = serde_json::to_string(&report).unwrap();

        assert!(shell.calls.iter().any(|c| c.contains("super-secret-value-123")));
        assert!(!json.contains("super-secret-value-123"));
        assert!(json.contains("SECRET_KEY=****-123"));
    }

    #[tokio::test]
    async fn test_missing_cli_with_install_disabled_fails_first_step() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let plan = plan_for(&manifest);
        let mut shell = FakeShell::without_cli();

        let report = execute(&mut shell, &plan, &PlatformConfig::default(), ExecuteOptions::default()).await;

        assert!(shell.calls.is_empty());
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.first_failure().unwrap().kind, StepKind::EnsureCli);
    }

    fn manifest_on_disk(dir: &Path) -> PathBuf {
        let path = dir.join("deploy.toml");
        crate::scripts::init::run(&path, Some("shop".to_string()), None, false).unwrap();
        path
    }

    fn deploy_options(manifest: PathBuf) -> DeployOptions {
        DeployOptions {
            manifest,
            dry_run: false,
            keep_going: false,
            start_at: None,
            require_secrets: false,
            skip_install: false,
        }
    }

    fn last_run_exists(manifest: &Path) -> bool {
        RunReport::path(&state_dir(manifest)).exists()
    }

    #[tokio::test]
    async fn test_require_secrets_refuses_to_start_with_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_on_disk(dir.path());
        let options = DeployOptions {
            require_secrets: true,
            ..deploy_options(path.clone())
        };
        let mut shell = FakeShell::with_cli_installed();

        let err = run_with(&mut shell, &options, |_| None).await.unwrap_err();

        assert!(err.to_string().contains("9 variable(s)"));
        assert!(shell.calls.is_empty());
        assert!(!last_run_exists(&path));
    }

    #[tokio::test]
    async fn test_require_secrets_passes_when_everything_is_exported() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_on_disk(dir.path());
        let options = DeployOptions {
            require_secrets: true,
            ..deploy_options(path.clone())
        };
        let mut shell = FakeShell::with_cli_installed();

        run_with(&mut shell, &options, |name| Some(format!("real-{}-value", name)))
            .await
            .unwrap();

        assert_eq!(shell.calls.len(), 15);
        assert!(last_run_exists(&path));
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing_and_writes_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_on_disk(dir.path());
        let options = DeployOptions {
            dry_run: true,
            ..deploy_options(path.clone())
        };
        let mut shell = FakeShell::without_cli();

        run_with(&mut shell, &options, |_| None).await.unwrap();

        assert!(shell.calls.is_empty());
        assert!(!last_run_exists(&path));
    }

    #[tokio::test]
    async fn test_failed_run_saves_report_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = manifest_on_disk(dir.path());
        let options = DeployOptions {
            keep_going: true,
            ..deploy_options(path.clone())
        };
        let mut shell = FakeShell::failing_on("init --name");

        assert!(run_with(&mut shell, &options, |_| None).await.is_err());

        assert_eq!(shell.calls.last().map(String::as_str), Some("railway up"));
        let report = RunReport::load_last(&state_dir(&path)).unwrap().unwrap();
        assert_eq!(report.first_failure().unwrap().kind, StepKind::CreateProject);
    }

    #[tokio::test]
    async fn test_keep_going_summary_prints_follow_up_before_resume_hint() {
        let manifest = DeployManifest::new_default("shop".to_string(), None);
        let platform = PlatformConfig::default();
        let plan = DeployPlan::build(&manifest, &platform, |_| None).unwrap();
        let mut shell = FakeShell::failing_on("init --name");

        let options = ExecuteOptions {
            keep_going: true,
            ..run_all()
        };
        let report = execute(&mut shell, &plan, &platform, options).await;
        let text = summary(&report, &plan, &platform, true);

        let next_steps = text.find("🎯 Next steps").unwrap();
        let resume = text.find("--start-at create-project").unwrap();
        assert!(next_steps < resume);
        assert!(text.contains("SECRET_KEY"));

        let fail_fast = summary(&report, &plan, &platform, false);
        assert!(!fail_fast.contains("Next steps"));
        assert!(fail_fast.contains("--start-at create-project"));
    }

    #[test]
    fn test_secret_hint_points_at_the_right_fix() {
        let mut manifest = DeployManifest::new_default("shop".to_string(), None);
        assert_eq!(secret_hint(&manifest, "SECRET_KEY"), "export SECRET_KEY=...");

        manifest.variables[0].from_env = None;
        assert_eq!(
            secret_hint(&manifest, "SECRET_KEY"),
            "deploy-bootstrap set-var SECRET_KEY --from-env SECRET_KEY"
        );
    }
}
