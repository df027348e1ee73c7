//! Configuration paths and effective settings
//!
//! All paths are under ~/.geoaudit/ (or `$GEOAUDIT_HOME`).

use crate::cli::error::HelpfulError;
use anyhow::{Context, Result};
use geoaudit_core::AuditConfig;
use geoaudit_logging::{geoaudit_home, logs_dir};
use std::path::{Path, PathBuf};

/// Get the default config file: ~/.geoaudit/config.toml
pub fn default_config_path() -> PathBuf {
    geoaudit_home().join("config.toml")
}

/// Load settings from `explicit`, else from the default file when present,
/// else defaults. An explicit path that does not exist is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<AuditConfig> {
    let path = match explicit {
        Some(path) if !path.is_file() => return Err(HelpfulError::config_not_found(path).into()),
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = default_config_path();
            if !default_path.is_file() {
                return Ok(AuditConfig::default());
            }
            default_path
        }
    };

    AuditConfig::load(&path)
        .map_err(|e| HelpfulError::invalid_config(&e.to_string()))
        .with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Config file to read instead of ~/.geoaudit/config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show paths and settings in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run the config command - shows paths and the effective settings
pub fn run(args: ConfigArgs) -> Result<()> {
    let home = geoaudit_home();
    let logs = logs_dir();
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(args.config.as_deref())?;

    if args.json {
        let value = serde_json::json!({
            "home": home.to_string_lossy(),
            "logs": {
                "path": logs.to_string_lossy(),
                "exists": logs.exists(),
            },
            "config_file": {
                "path": config_path.to_string_lossy(),
                "exists": config_path.exists(),
            },
            "settings": config,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("GEOAUDIT CONFIGURATION");
        println!("======================");
        println!();
        println!("Home:     {}", home.display());
        println!(
            "Logs:     {} ({})",
            logs.display(),
            if logs.exists() { "exists" } else { "not found" }
        );
        println!(
            "Config:   {} ({})",
            config_path.display(),
            if config_path.exists() { "exists" } else { "using defaults" }
        );
        println!();
        print!("{}", config.to_toml()?);
    }

    Ok(())
}
