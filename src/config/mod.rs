use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::frame::ColumnType;

/// Shipped defaults used to seed a config file on first run.
const TEMPLATE: &str = include_str!("../../config_template.yaml");

/// Process-wide settings, loaded once and read-only for the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: General,
    pub file_types: BTreeMap<String, ColumnType>,
    pub keys: SurrogateKeys,
    pub database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct General {
    pub process_file: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Surrogate-key column names for the four keyed dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurrogateKeys {
    pub customer: String,
    pub device: String,
    pub network: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub host: String,
    pub name: String,
    pub user: String,
    /// When true, `password_val` holds the password itself; otherwise
    /// `password_var` names the environment variable holding it.
    pub plain_pwd: bool,
    #[serde(default)]
    pub password_val: Option<String>,
    #[serde(default)]
    pub password_var: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Load the config, or walk the user through first-run setup when the
    /// file does not exist yet.
    pub fn load_or_bootstrap(path: &Path) -> Result<Config> {
        if path.exists() {
            Config::load(path)
        } else {
            bootstrap(path)
        }
    }
}

impl Database {
    pub fn password(&self) -> Result<String> {
        if self.plain_pwd {
            match &self.password_val {
                Some(pwd) if !pwd.is_empty() => Ok(pwd.clone()),
                _ => bail!("plain_pwd is set but password_val is empty"),
            }
        } else {
            let var = self
                .password_var
                .as_deref()
                .filter(|v| !v.is_empty())
                .context("password_var is not set")?;
            std::env::var(var)
                .with_context(|| format!("reading password from environment variable `{}`", var))
        }
    }

    pub fn url(&self) -> Result<String> {
        Ok(format!(
            "mysql://{}:{}@{}:3306/{}",
            self.user,
            self.password()?,
            self.host,
            self.name
        ))
    }
}

/// First-run setup: prompt for the fields that differ per installation,
/// merge them into the shipped template, and write the file.
fn bootstrap(path: &Path) -> Result<Config> {
    let mut config: Config =
        serde_yaml::from_str(TEMPLATE).context("parsing embedded config template")?;

    println!("No config file at {}; setting one up.", path.display());
    config.general.log_file = match prompt("Name of the log file (empty for stdout)")? {
        s if s.is_empty() => None,
        s => Some(s),
    };
    config.general.process_file = prompt("Name of the file to process")?;
    config.database.host = prompt("Database host")?;
    config.database.name = prompt("Name of the target database")?;
    config.database.user = prompt("Username for this process")?;

    let env_backed = prompt("Is the password stored in an environment variable? [y/N]")?;
    if env_backed.eq_ignore_ascii_case("y") || env_backed.eq_ignore_ascii_case("yes") {
        config.database.plain_pwd = false;
        config.database.password_var = Some(prompt("Name of the environment variable")?);
        config.database.password_val = None;
    } else {
        config.database.plain_pwd = true;
        config.database.password_val = Some(prompt("Password")?);
        config.database.password_var = None;
    }

    let rendered = serde_yaml::to_string(&config).context("serializing config")?;
    std::fs::write(path, rendered)
        .with_context(|| format!("writing config file {}", path.display()))?;
    info!(path = %path.display(), "config file written");
    Ok(config)
}

fn prompt(label: &str) -> Result<String> {
    print!("{}:\t", label);
    io::stdout().flush().context("flushing prompt")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("reading setup input")?;
    Ok(line.trim().to_string())
}
