//! Command implementations for the scss-modules CLI
//!
//! Each command module handles the CLI interface and delegates to the
//! scss-modules crate for the actual work.

pub mod build;
pub mod bundle;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};

use scss_modules::{PluginConfigFile, PluginOptions};
use scss_modules_runtime::SystemRuntime;

/// Flags shared by every command.
#[derive(Debug, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub no_inject: bool,
    pub minify: bool,
    pub no_cache: bool,
}

impl GlobalArgs {
    /// Plugin options: defaults, then the config file, then command-line flags.
    pub fn plugin_options(&self, runtime: &dyn SystemRuntime) -> Result<PluginOptions> {
        let mut options = match &self.config {
            Some(path) => PluginConfigFile::load(path, runtime)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
                .into_options(),
            None => PluginOptions::default(),
        };

        if self.no_inject {
            options.inject = false;
        }
        if self.minify {
            options.minify = true;
        }
        if self.no_cache {
            options.cache = false;
        }
        Ok(options)
    }
}
