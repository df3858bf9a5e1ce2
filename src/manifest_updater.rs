// src/manifest_updater.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use toml_edit::{value as toml_value, ArrayOfTables, DocumentMut, Item, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableUpdate {
    /// Literal value. Drops any `from_env` so the literal is what gets set.
    Value(String),
    FromEnv(String),
    /// Drops any literal `value`, which would otherwise win over the placeholder.
    Placeholder(String),
}

fn read_document(path: &Path) -> Result<DocumentMut> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    content
        .parse::<DocumentMut>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn variables_mut(doc: &mut DocumentMut) -> Result<&mut ArrayOfTables> {
    doc.entry("variables")
        .or_insert_with(|| Item::ArrayOfTables(ArrayOfTables::new()))
        .as_array_of_tables_mut()
        .ok_or_else(|| anyhow!("'variables' in the manifest is not an array of [[variables]] tables"))
}

fn has_name(table: &Table, name: &str) -> bool {
    table.get("name").and_then(|item| item.as_str()) == Some(name)
}

fn apply(table: &mut Table, update: &VariableUpdate, secret: Option<bool>) {
    match update {
        VariableUpdate::Value(v) => {
            table.remove("from_env");
            table["value"] = toml_value(v.as_str());
        }
        VariableUpdate::FromEnv(env) => {
            table["from_env"] = toml_value(env.as_str());
        }
        VariableUpdate::Placeholder(p) => {
            table.remove("value");
            table["placeholder"] = toml_value(p.as_str());
        }
    }
    if let Some(secret) = secret {
        table["secret"] = toml_value(secret);
    }
}

/// Updates or appends a `[[variables]]` entry, keeping comments and layout of
/// the rest of the file. Returns true when a new entry was appended.
pub fn set_variable(
    path: &Path,
    name: &str,
    update: &VariableUpdate,
    secret: Option<bool>,
) -> Result<bool> {
    let mut doc = read_document(path)?;
    let variables = variables_mut(&mut doc)?;

    let found = variables.iter().position(|t| has_name(t, name));
    let created = match found.and_then(|i| variables.get_mut(i)) {
        Some(table) => {
            apply(table, update, secret);
            false
        }
        None => {
            let mut table = Table::new();
            table["name"] = toml_value(name);
            apply(&mut table, update, secret);
            variables.push(table);
            true
        }
    };

    fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(created)
}

/// Returns false when no entry had that name.
pub fn remove_variable(path: &Path, name: &str) -> Result<bool> {
    let mut doc = read_document(path)?;
    let variables = variables_mut(&mut doc)?;

    let Some(index) = variables.iter().position(|t| has_name(t, name)) else {
        return Ok(false);
    };
    variables.remove(index);

    fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
