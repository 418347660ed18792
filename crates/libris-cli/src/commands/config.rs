//! Config commands
//!
//! Commands for managing the CLI configuration file.

use anyhow::Result;
use clap::Subcommand;
use libris_core::config::config_path;
use libris_core::AppConfig;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_info, print_output, print_success, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Reset a key to its default
    Unset {
        key: String,
    },

    /// Print the config file location
    Path,
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

/// Environment variables that override a key at run time
fn env_override(key: &str) -> Option<&'static str> {
    let var = match key {
        "api_url" => "LIBRIS_API_URL",
        "token" => "LIBRIS_TOKEN",
        _ => return None,
    };
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|_| var)
}

fn config_rows(config: &AppConfig) -> Vec<ConfigRow> {
    let defaults = AppConfig::default();
    config
        .entries()
        .into_iter()
        .map(|(key, value)| {
            let source = match env_override(key) {
                Some(var) => format!("env ({})", var),
                None if defaults.get(key).ok().as_deref() == Some(value.as_str()) => {
                    "default".to_string()
                }
                None => "file".to_string(),
            };
            ConfigRow {
                key: key.to_string(),
                value,
                source,
            }
        })
        .collect()
}

pub fn execute(action: ConfigAction, format: OutputFormat, quiet: bool) -> Result<()> {
    let path = config_path()?;

    match action {
        ConfigAction::Show => {
            let config = AppConfig::load_from(&path)?;
            print_output(&config_rows(&config), format)
        }

        ConfigAction::Get { key } => {
            let config = AppConfig::load_from(&path)?;
            let value = config.get(&key)?;
            match format {
                OutputFormat::Json => {
                    let mut map = serde_json::Map::new();
                    map.insert(key, serde_json::Value::String(value));
                    println!("{}", serde_json::Value::Object(map));
                }
                OutputFormat::Table => println!("{}", value),
            }
            Ok(())
        }

        ConfigAction::Set { key, value } => {
            // A broken file is replaced rather than blocking the fix
            let mut config = AppConfig::load_from(&path).unwrap_or_else(|e| {
                log::warn!("{}; starting from defaults", e);
                AppConfig::default()
            });
            config.set(&key, &value)?;
            config.save_to(&path)?;
            print_success(&format!("{} = {}", key, config.get(&key)?), quiet);
            Ok(())
        }

        ConfigAction::Unset { key } => {
            let mut config = AppConfig::load_from(&path)?;
            config.unset(&key)?;
            config.save_to(&path)?;
            print_success(&format!("{} reset to {}", key, config.get(&key)?), quiet);
            Ok(())
        }

        ConfigAction::Path => {
            print_info(&path.display().to_string(), false);
            Ok(())
        }
    }
}
