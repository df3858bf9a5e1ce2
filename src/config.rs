// src/config.rs
//! Deploy manifest, global defaults and platform resolution

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "deploy.toml";
pub const STATE_DIR: &str = ".deploy-bootstrap";

pub const DEFAULT_CLI: &str = "railway";
pub const DEFAULT_INSTALL_SCRIPT: &str = "https://railway.app/install.sh";
pub const DEFAULT_INSTALL_TIMEOUT_MS: u64 = 60000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployManifest {
    pub project: ProjectSection,
    #[serde(default)]
    pub platform: PlatformOverrides,
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

/// Platform settings as written by the user. Every field is optional so the
/// manifest and the global config can each override only what they need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_project: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_repo: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_variable: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whoami: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub secret: bool,
}

/// User-level defaults (~/.config/deploy-bootstrap/config.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub platform: Option<PlatformOverrides>,
}

/// Fully resolved platform settings used to build commands.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformConfig {
    pub cli: String,
    pub install_script: String,
    pub install_timeout_ms: u64,
    pub login: Vec<String>,
    pub create_project: Vec<String>,
    pub link_repo: Vec<String>,
    pub set_variable: Vec<String>,
    pub deploy: Vec<String>,
    pub whoami: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Manifest,
    Global,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Manifest => write!(f, "Manifest ({})", MANIFEST_FILE),
            ConfigSource::Global => write!(f, "Global (~/.config/deploy-bootstrap/config.toml)"),
            ConfigSource::Default => write!(f, "Default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPlatform {
    pub config: PlatformConfig,
    pub sources: Vec<(&'static str, ConfigSource)>,
}

impl ResolvedPlatform {
    pub fn source_of(&self, field: &str) -> Option<ConfigSource> {
        self.sources
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, source)| *source)
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            cli: DEFAULT_CLI.to_string(),
            install_script: DEFAULT_INSTALL_SCRIPT.to_string(),
            install_timeout_ms: DEFAULT_INSTALL_TIMEOUT_MS,
            login: args(&["login"]),
            create_project: args(&["init", "--name", "{project}"]),
            link_repo: args(&["link"]),
            set_variable: args(&["variables", "--set", "{name}={value}"]),
            deploy: args(&["up"]),
            whoami: args(&["whoami"]),
        }
    }
}

impl PlatformConfig {
    /// Argument templates keyed by their manifest field name.
    pub fn templates(&self) -> [(&'static str, &[String]); 6] {
        [
            ("login", self.login.as_slice()),
            ("create_project", self.create_project.as_slice()),
            ("link_repo", self.link_repo.as_slice()),
            ("set_variable", self.set_variable.as_slice()),
            ("deploy", self.deploy.as_slice()),
            ("whoami", self.whoami.as_slice()),
        ]
    }

    pub fn validate(&self, repo: Option<&str>) -> Result<()> {
        if self.cli.trim().is_empty() {
            anyhow::bail!("Platform CLI binary name cannot be empty");
        }

        if !self.install_script.starts_with("https://") {
            anyhow::bail!(
                "Install script URL must use https:// (got '{}')",
                self.install_script
            );
        }

        if self.install_timeout_ms == 0 {
            anyhow::bail!("install_timeout_ms must be greater than 0");
        }

        for (field, template) in self.templates() {
            if template.is_empty() && field != "link_repo" {
                anyhow::bail!("Platform command '{}' cannot be empty", field);
            }
            if repo.is_none() && template.iter().any(|arg| arg.contains("{repo}")) {
                anyhow::bail!(
                    "Platform command '{}' uses {{repo}} but [project] has no 'repo' set",
                    field
                );
            }
        }

        Ok(())
    }
}

fn pick<T: Clone>(
    field: &'static str,
    manifest: &Option<T>,
    global: &Option<T>,
    default: T,
    sources: &mut Vec<(&'static str, ConfigSource)>,
) -> T {
    let (value, source) = match (manifest, global) {
        (Some(v), _) => (v.clone(), ConfigSource::Manifest),
        (None, Some(v)) => (v.clone(), ConfigSource::Global),
        (None, None) => (default, ConfigSource::Default),
    };
    sources.push((field, source));
    value
}

/// Merge manifest overrides over global overrides over built-in defaults.
pub fn resolve_platform(
    manifest: &PlatformOverrides,
    global: Option<&PlatformOverrides>,
) -> ResolvedPlatform {
    let global = global.cloned().unwrap_or_default();
    let defaults = PlatformConfig::default();
    let mut sources = Vec::new();

    let config = PlatformConfig {
        cli: pick("cli", &manifest.cli, &global.cli, defaults.cli, &mut sources),
        install_script: pick(
            "install_script",
            &manifest.install_script,
            &global.install_script,
            defaults.install_script,
            &mut sources,
        ),
        install_timeout_ms: pick(
            "install_timeout_ms",
            &manifest.install_timeout_ms,
            &global.install_timeout_ms,
            defaults.install_timeout_ms,
            &mut sources,
        ),
        login: pick("login", &manifest.login, &global.login, defaults.login, &mut sources),
        create_project: pick(
            "create_project",
            &manifest.create_project,
            &global.create_project,
            defaults.create_project,
            &mut sources,
        ),
        link_repo: pick(
            "link_repo",
            &manifest.link_repo,
            &global.link_repo,
            defaults.link_repo,
            &mut sources,
        ),
        set_variable: pick(
            "set_variable",
            &manifest.set_variable,
            &global.set_variable,
            defaults.set_variable,
            &mut sources,
        ),
        deploy: pick("deploy", &manifest.deploy, &global.deploy, defaults.deploy, &mut sources),
        whoami: pick("whoami", &manifest.whoami, &global.whoami, defaults.whoami, &mut sources),
    };

    debug!("Resolved platform config: {:?}", config);
    ResolvedPlatform { config, sources }
}

impl GlobalConfig {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deploy-bootstrap").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No global config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read global config {}", path.display()))?;
        let config: GlobalConfig = toml_edit::de::from_str(&content)
            .with_context(|| format!("Failed to parse global config {}", path.display()))?;
        info!("Loaded global config from {}", path.display());
        Ok(config)
    }
}

pub fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn secret_var(name: &str, description: &str, placeholder: &str) -> VariableSpec {
    VariableSpec {
        name: name.to_string(),
        description: Some(description.to_string()),
        value: None,
        from_env: Some(name.to_string()),
        placeholder: Some(placeholder.to_string()),
        secret: true,
    }
}

fn plain_var(name: &str, description: &str, placeholder: &str) -> VariableSpec {
    VariableSpec {
        secret: false,
        ..secret_var(name, description, placeholder)
    }
}

fn literal_var(name: &str, description: &str, value: &str) -> VariableSpec {
    VariableSpec {
        name: name.to_string(),
        description: Some(description.to_string()),
        value: Some(value.to_string()),
        from_env: None,
        placeholder: None,
        secret: false,
    }
}

/// The eleven variables the web app expects, in the order they are set.
pub fn default_variables() -> Vec<VariableSpec> {
    vec![
        secret_var("SECRET_KEY", "Application secret", "your-secret-key-here"),
        secret_var("STRIPE_SECRET_KEY", "Stripe secret key", "sk_test_your_stripe_secret_key"),
        secret_var(
            "STRIPE_PUBLISHABLE_KEY",
            "Stripe publishable key",
            "pk_test_your_stripe_publishable_key",
        ),
        secret_var("STRIPE_WEBHOOK_SECRET", "Stripe webhook signing secret", "whsec_your_webhook_secret"),
        secret_var("STRIPE_PRICE_ID", "Stripe price id for the subscription", "price_your_price_id"),
        plain_var(
            "FIREBASE_CREDENTIALS_PATH",
            "Path to the Firebase service account JSON",
            "firebase-credentials.json",
        ),
        plain_var(
            "FIREBASE_DATABASE_URL",
            "Firebase realtime database URL",
            "https://your-project-id.firebaseio.com",
        ),
        secret_var("SENDGRID_API_KEY", "SendGrid API key", "SG.your_sendgrid_api_key"),
        plain_var("FROM_EMAIL", "Sender address for outbound email", "noreply@yourdomain.com"),
        literal_var("FLASK_ENV", "Runtime environment of the app", "production"),
        literal_var("DATABASE_PATH", "Local database file inside the container", "/app/data/app.db"),
    ]
}

impl DeployManifest {
    pub fn new_default(name: String, repo: Option<String>) -> Self {
        Self {
            project: ProjectSection { name, repo },
            platform: PlatformOverrides::default(),
            variables: default_variables(),
        }
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read {}. Run 'deploy-bootstrap init' first",
                path.display()
            )
        })?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: DeployManifest = toml_edit::de::from_str(content)?;
        Ok(manifest)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            anyhow::bail!("Project name cannot be empty");
        }

        if let Some(repo) = &self.project.repo {
            if repo.trim().is_empty() {
                anyhow::bail!("Project repo cannot be an empty string (remove the key instead)");
            }
        }

        let mut seen = HashSet::new();
        for var in &self.variables {
            if !is_valid_variable_name(&var.name) {
                anyhow::bail!("Invalid variable name '{}'", var.name);
            }
            if !seen.insert(var.name.as_str()) {
                anyhow::bail!("Variable '{}' is declared more than once", var.name);
            }
            if var.value.is_none() && var.from_env.is_none() && var.placeholder.is_none() {
                anyhow::bail!(
                    "Variable '{}' needs at least one of 'value', 'from_env' or 'placeholder'",
                    var.name
                );
            }
            if let Some(env) = &var.from_env {
                if !is_valid_variable_name(env) {
                    anyhow::bail!("Variable '{}' has invalid from_env '{}'", var.name, env);
                }
            }
        }

        Ok(())
    }
}

/// Directory holding run reports, next to the manifest.
pub fn state_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(STATE_DIR)
}
