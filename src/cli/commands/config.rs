//! Config Command
//!
//! Usage:
//!   docscribe config show [-f json]
//!   docscribe config path
//!   docscribe config init [-g] [--force]

use crate::cli::Output;
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Show the merged configuration
pub fn show(config: &Config, format: &str) -> Result<()> {
    ConfigLoader::show_config(config, format == "json")
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file
pub fn init(global: bool, force: bool) -> Result<()> {
    let existed = if global {
        ConfigLoader::global_config_path().is_some_and(|p| p.exists())
    } else {
        ConfigLoader::project_config_path().exists()
    };

    let path = ConfigLoader::init(global, force)?;
    let out = Output::new();
    let scope = if global { "global" } else { "project" };

    if existed && !force {
        out.warning(&format!(
            "{} config already exists: {} (use --force to overwrite)",
            scope,
            path.display()
        ));
    } else {
        out.success(&format!("Initialized {} configuration", scope));
        out.field("Config", path.display());
    }
    Ok(())
}
