//! Error types for stylesheet module resolution and loading.

use std::path::PathBuf;

use scss_modules_runtime::RuntimeError;
use thiserror::Error;

/// Boxed error returned by user-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving or loading a stylesheet module.
///
/// Every variant is fatal for the stylesheet being processed; nothing is
/// retried.
#[derive(Debug, Error)]
pub enum ScssModulesError {
    /// The stylesheet compiler rejected the source (syntax error, missing import, ...)
    #[error("Failed to compile {}: {message}", path.display())]
    Compile { path: PathBuf, message: String },

    /// The class-name scoping transform failed
    #[error("Failed to scope class names in {}: {message}", path.display())]
    Scope { path: PathBuf, message: String },

    /// The minifier could not re-print the scoped CSS
    #[error("Failed to minify CSS for {}: {message}", path.display())]
    Minify { path: PathBuf, message: String },

    /// The user-supplied CSS callback returned an error
    #[error("CSS callback failed for {}: {source}", path.display())]
    Callback {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A virtual-module operation was requested for a record that is not virtual
    #[error("{} was not resolved to a virtual module (bundle mode is off)", path.display())]
    NotVirtual { path: PathBuf },

    /// The import specifier cannot be handled by this plugin
    #[error("Invalid stylesheet specifier: {0}")]
    InvalidSpecifier(String),

    /// Plugin configuration could not be read or parsed
    #[error("Invalid plugin configuration: {0}")]
    Config(String),

    /// Filesystem access failed (directory creation, writes, reads)
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, ScssModulesError>;
