// src/templates.rs
use crate::config::{PlatformConfig, VariableSpec};
use crate::plan::{self, DeployPlan};

pub struct Templates;

fn quoted(s: &str) -> String {
    toml_edit::Value::from(s).to_string()
}

fn quoted_list(list: &[String]) -> String {
    let items: Vec<String> = list.iter().map(|s| quoted(s)).collect();
    format!("[{}]", items.join(", "))
}

impl Templates {
    /// Commented `deploy.toml` written by `init`.
    pub fn manifest_template(
        project_name: &str,
        repo: Option<&str>,
        variables: &[VariableSpec],
    ) -> String {
        let defaults = PlatformConfig::default();
        let mut out = String::new();

        out.push_str("# deploy-bootstrap manifest\n");
        out.push_str("#\n");
        out.push_str("# Each variable is resolved in this order:\n");
        out.push_str("#   1. from_env     read from your shell when that variable is set\n");
        out.push_str("#   2. value        a literal value\n");
        out.push_str("#   3. placeholder  a stand-in you must replace after the first deploy\n");
        out.push_str("# Export real secrets before running `deploy-bootstrap deploy` so they\n");
        out.push_str("# never have to be written to this file.\n\n");

        out.push_str("[project]\n");
        out.push_str(&format!("name = {}\n", quoted(project_name)));
        match repo {
            Some(repo) => out.push_str(&format!("repo = {}\n", quoted(repo))),
            None => out.push_str("# repo = \"owner/name\"\n"),
        }
        out.push('\n');

        out.push_str("[platform]\n");
        out.push_str("# All optional. Defaults drive the Railway CLI; uncomment to override.\n");
        out.push_str("# Command templates may use {project}, {repo}, {name} and {value}.\n");
        out.push_str(&format!("# cli = {}\n", quoted(&defaults.cli)));
        out.push_str(&format!("# install_script = {}\n", quoted(&defaults.install_script)));
        out.push_str(&format!("# install_timeout_ms = {}\n", defaults.install_timeout_ms));
        for (field, template) in defaults.templates() {
            out.push_str(&format!("# {} = {}\n", field, quoted_list(template)));
        }

        for var in variables {
            out.push('\n');
            out.push_str("[[variables]]\n");
            out.push_str(&format!("name = {}\n", quoted(&var.name)));
            if let Some(description) = &var.description {
                out.push_str(&format!("description = {}\n", quoted(description)));
            }
            if let Some(env) = &var.from_env {
                out.push_str(&format!("from_env = {}\n", quoted(env)));
            }
            if let Some(value) = &var.value {
                out.push_str(&format!("value = {}\n", quoted(value)));
            }
            if let Some(placeholder) = &var.placeholder {
                out.push_str(&format!("placeholder = {}\n", quoted(placeholder)));
            }
            if var.secret {
                out.push_str("secret = true\n");
            }
        }

        out
    }

    pub fn gitignore_additions() -> &'static str {
        r#"

# deploy-bootstrap
.deploy-bootstrap/
"#
    }

    /// Printed after a run: what still needs a human.
    pub fn follow_up_instructions(plan: &DeployPlan, platform: &PlatformConfig) -> String {
        let mut out = String::new();
        let placeholders = plan.placeholders();

        out.push_str("🎯 Next steps:\n");
        if placeholders.is_empty() {
            out.push_str("   ✅ Every variable was set from your environment or a literal value\n");
        } else {
            out.push_str(&format!(
                "   ⚠️  {} variable(s) were set to placeholders. Replace them with real values:\n",
                placeholders.len()
            ));
            for name in &placeholders {
                out.push_str(&format!(
                    "   {}\n",
                    plan::set_variable_hint(platform, &plan.project, name)
                ));
            }
            out.push_str("   💡 Or export them in your shell and run `deploy-bootstrap deploy --start-at set-variables`\n");
        }
        out.push('\n');
        out.push_str("📚 Useful commands:\n");
        out.push_str(&format!("   {} logs      # Follow deploy logs\n", platform.cli));
        out.push_str(&format!("   {} open      # Open the project dashboard\n", platform.cli));
        out.push_str(&format!("   {} status    # Show the linked project\n", platform.cli));
        out.push_str("   deploy-bootstrap last-run   # Review this run\n");
        out
    }
}
