//! Plugin configuration.
//!
//! [`PluginOptions`] is the programmatic configuration handed to
//! [`crate::ScssModulesPlugin::new`]. It can hold closures (scoped-name
//! generator, CSS callback) and is therefore not serializable.
//!
//! [`PluginConfigFile`] is the serializable subset, read from YAML. Every
//! field is optional; present fields override the defaults:
//!
//! ```yaml
//! inject: false
//! minify: true
//! cache: true
//! localsConvention: camelCase
//! generateScopedName: "[name]__[local]___[hash:base64:5]"
//! scssOptions:
//!   loadPaths: [styles/shared]
//!   style: expanded
//!   quiet: true
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use scss_modules_runtime::{SassOptions, SassOutputStyle, SystemRuntime};

use crate::error::{BoxError, Result, ScssModulesError};
use crate::scope::ClassNameMapping;

/// Callback invoked with the final CSS text and the class-name mapping after
/// each compilation.
pub type CssCallback =
    Arc<dyn Fn(&str, &ClassNameMapping) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Custom scoped-name generator: `(local name, source path, css) -> scoped name`.
pub type ScopedNameFn = Arc<dyn Fn(&str, &Path, &str) -> String + Send + Sync>;

/// How exported class-name keys are derived from the authored class names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocalsConvention {
    /// Keys exactly as authored
    AsIs,
    /// Authored key plus its camelCase form
    CamelCase,
    /// camelCase form only
    #[default]
    CamelCaseOnly,
    /// Authored key plus a form with only dashes camelized
    Dashes,
    /// Only dashes camelized
    DashesOnly,
}

/// How a local class name is turned into its scoped (emitted) name.
#[derive(Clone, Default)]
pub enum ScopedNameStrategy {
    /// `_{local}_{hash}_{line}`
    #[default]
    Default,
    /// Interpolated pattern, e.g. `[name]__[local]___[hash:base64:5]`
    Pattern(String),
    /// User-supplied generator
    Custom(ScopedNameFn),
}

impl fmt::Debug for ScopedNameStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopedNameStrategy::Default => f.write_str("Default"),
            ScopedNameStrategy::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            ScopedNameStrategy::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// Immutable per-invocation settings of the plugin.
#[derive(Clone)]
pub struct PluginOptions {
    /// Inject the compiled CSS into the document at module evaluation time
    pub inject: bool,
    /// Chain a minifier after the scoping transform
    pub minify: bool,
    /// Memoize resolution decisions per source path
    pub cache: bool,
    pub locals_convention: LocalsConvention,
    pub generate_scoped_name: ScopedNameStrategy,
    /// Options forwarded to the SASS compiler
    pub scss_options: SassOptions,
    pub css_callback: Option<CssCallback>,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            inject: true,
            minify: false,
            cache: true,
            locals_convention: LocalsConvention::default(),
            generate_scoped_name: ScopedNameStrategy::default(),
            scss_options: SassOptions::default(),
            css_callback: None,
        }
    }
}

impl fmt::Debug for PluginOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginOptions")
            .field("inject", &self.inject)
            .field("minify", &self.minify)
            .field("cache", &self.cache)
            .field("locals_convention", &self.locals_convention)
            .field("generate_scoped_name", &self.generate_scoped_name)
            .field("scss_options", &self.scss_options)
            .field("css_callback", &self.css_callback.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl PluginOptions {
    pub fn with_inject(mut self, inject: bool) -> Self {
        self.inject = inject;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_locals_convention(mut self, convention: LocalsConvention) -> Self {
        self.locals_convention = convention;
        self
    }

    pub fn with_scoped_name(mut self, strategy: ScopedNameStrategy) -> Self {
        self.generate_scoped_name = strategy;
        self
    }

    pub fn with_scss_options(mut self, options: SassOptions) -> Self {
        self.scss_options = options;
        self
    }

    /// Register a callback receiving the final CSS and class-name mapping.
    pub fn with_css_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &ClassNameMapping) -> std::result::Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.css_callback = Some(Arc::new(callback));
        self
    }
}

/// Output style names accepted in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyleName {
    Expanded,
    Compressed,
}

impl From<OutputStyleName> for SassOutputStyle {
    fn from(name: OutputStyleName) -> Self {
        match name {
            OutputStyleName::Expanded => SassOutputStyle::Expanded,
            OutputStyleName::Compressed => SassOutputStyle::Compressed,
        }
    }
}

/// Compiler options as written in a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScssOptionsFile {
    pub load_paths: Option<Vec<PathBuf>>,
    pub style: Option<OutputStyleName>,
    pub quiet: Option<bool>,
    pub allows_charset: Option<bool>,
}

/// Serializable plugin configuration, merged over [`PluginOptions::default`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginConfigFile {
    pub inject: Option<bool>,
    pub minify: Option<bool>,
    pub cache: Option<bool>,
    pub locals_convention: Option<LocalsConvention>,
    /// Scoped-name pattern; absent means the default strategy
    pub generate_scoped_name: Option<String>,
    pub scss_options: Option<ScssOptionsFile>,
}

impl PluginConfigFile {
    /// Parse a YAML configuration document. An empty document is the default.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ScssModulesError::Config(e.to_string()))
    }

    /// Read a YAML configuration file through the runtime.
    ///
    /// Relative `scssOptions.loadPaths` are resolved against the directory
    /// containing the configuration file.
    pub fn load(path: &Path, runtime: &dyn SystemRuntime) -> Result<Self> {
        let content = runtime.file_read_string(path)?;
        let mut config = Self::from_yaml_str(&content).map_err(|e| match e {
            ScssModulesError::Config(msg) => {
                ScssModulesError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        if let (Some(base), Some(scss)) = (path.parent(), config.scss_options.as_mut()) {
            if let Some(load_paths) = scss.load_paths.as_mut() {
                for load_path in load_paths.iter_mut() {
                    if load_path.is_relative() {
                        *load_path = base.join(&*load_path);
                    }
                }
            }
        }

        Ok(config)
    }

    /// Merge this configuration over the defaults.
    pub fn into_options(self) -> PluginOptions {
        self.merge_into(PluginOptions::default())
    }

    /// Merge this configuration over `base`; absent fields keep `base`'s values.
    pub fn merge_into(self, mut base: PluginOptions) -> PluginOptions {
        if let Some(inject) = self.inject {
            base.inject = inject;
        }
        if let Some(minify) = self.minify {
            base.minify = minify;
        }
        if let Some(cache) = self.cache {
            base.cache = cache;
        }
        if let Some(convention) = self.locals_convention {
            base.locals_convention = convention;
        }
        if let Some(pattern) = self.generate_scoped_name {
            base.generate_scoped_name = ScopedNameStrategy::Pattern(pattern);
        }
        if let Some(scss) = self.scss_options {
            if let Some(load_paths) = scss.load_paths {
                base.scss_options.load_paths = load_paths;
            }
            if let Some(style) = scss.style {
                base.scss_options.style = style.into();
            }
            if let Some(quiet) = scss.quiet {
                base.scss_options.quiet = quiet;
            }
            if let Some(allows_charset) = scss.allows_charset {
                base.scss_options.allows_charset = allows_charset;
            }
        }
        base
    }
}
