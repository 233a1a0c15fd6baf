//! Plugin instance and per-build session state.
//!
//! [`ScssModulesPlugin`] holds the immutable configuration. Calling
//! [`ScssModulesPlugin::setup`] for a build yields a [`BuildSession`], which
//! owns the resolution cache and the recorded CSS of loaded stylesheets for
//! the lifetime of that build. Dropping the session discards both.
//!
//! The maps are locked only around lookups and inserts. Two concurrent first
//! resolutions of the same stylesheet may both compile it; the later insert
//! replaces the earlier record with an equal value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use scss_modules_runtime::SystemRuntime;

use crate::build::build_module;
use crate::config::PluginOptions;
use crate::error::{Result, ScssModulesError};
use crate::render::BUILT_SUFFIX;
use crate::resolve::{
    NAMESPACE, ResolutionRecord, ResolveArgs, is_built_module, is_stylesheet_module,
    output_target, source_reference,
};

/// Build-wide settings of the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// The host bundles imports into its output
    pub bundle: bool,
    /// Output directory of a non-bundling build
    pub outdir: Option<PathBuf>,
}

impl BuildOptions {
    pub fn bundle() -> Self {
        Self {
            bundle: true,
            outdir: None,
        }
    }

    pub fn transform(outdir: impl Into<PathBuf>) -> Self {
        Self {
            bundle: false,
            outdir: Some(outdir.into()),
        }
    }
}

/// How the host should interpret loaded contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    Js,
    Css,
}

/// Contents returned for a virtual module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    /// `None` is an absent module body
    pub contents: Option<String>,
    pub loader: Loader,
    /// Files whose changes invalidate this module
    pub watch_files: Vec<PathBuf>,
}

/// Split outputs of a stylesheet in bundle mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledStylesheet {
    pub source: PathBuf,
    /// Script module
    pub js: String,
    /// Companion CSS; only present when injection is disabled
    pub css: Option<String>,
}

/// The stylesheet-modules build integration.
#[derive(Debug, Clone, Default)]
pub struct ScssModulesPlugin {
    options: Arc<PluginOptions>,
}

impl ScssModulesPlugin {
    pub fn new(options: PluginOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    pub fn name(&self) -> &'static str {
        NAMESPACE
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Start a build. Caches live as long as the returned session.
    pub fn setup(&self, build: &BuildOptions, runtime: Arc<dyn SystemRuntime>) -> BuildSession {
        tracing::debug!(
            bundle = build.bundle,
            outdir = ?build.outdir,
            cache = self.options.cache,
            inject = self.options.inject,
            "Setting up stylesheet modules build"
        );
        BuildSession {
            options: self.options.clone(),
            build: build.clone(),
            runtime,
            results: Mutex::new(HashMap::new()),
            css_results: Mutex::new(HashMap::new()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Per-build state: resolution cache and recorded CSS.
pub struct BuildSession {
    options: Arc<PluginOptions>,
    build: BuildOptions,
    runtime: Arc<dyn SystemRuntime>,
    results: Mutex<HashMap<PathBuf, ResolutionRecord>>,
    css_results: Mutex<HashMap<PathBuf, String>>,
}

impl BuildSession {
    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn build_options(&self) -> &BuildOptions {
        &self.build
    }

    fn absolute_dir(&self, dir: &Path) -> Result<PathBuf> {
        if dir.is_absolute() {
            Ok(dir.to_path_buf())
        } else {
            Ok(self.runtime.cwd()?.join(dir))
        }
    }

    /// Route an import request to the matching resolver.
    ///
    /// Returns `None` for specifiers this plugin does not handle. Companion
    /// specifiers are only handled when imported from a module of this
    /// plugin's namespace.
    pub fn on_resolve(&self, args: &ResolveArgs) -> Result<Option<ResolutionRecord>> {
        if is_built_module(&args.path) {
            if args.namespace == NAMESPACE {
                return self.resolve_built(args).map(Some);
            }
            return Ok(None);
        }
        if is_stylesheet_module(&args.path) {
            return self
                .resolve_stylesheet(&args.path, &args.resolve_dir)
                .map(Some);
        }
        Ok(None)
    }

    /// Resolve a stylesheet specifier, consulting and filling the cache.
    pub fn resolve_stylesheet(&self, specifier: &str, resolve_dir: &Path) -> Result<ResolutionRecord> {
        if !is_stylesheet_module(specifier) {
            return Err(ScssModulesError::InvalidSpecifier(specifier.to_string()));
        }
        let resolve_dir = self.absolute_dir(resolve_dir)?;
        let source = source_reference(&resolve_dir, specifier);

        if self.options.cache {
            if let Some(record) = lock(&self.results).get(&source) {
                tracing::debug!(source = %source.display(), "Resolution cache hit");
                return Ok(record.clone());
            }
        }

        let record = self.compute_resolution(specifier, &resolve_dir, source.clone())?;

        if self.options.cache {
            lock(&self.results).insert(source, record.clone());
        }
        Ok(record)
    }

    fn compute_resolution(
        &self,
        specifier: &str,
        resolve_dir: &Path,
        source: PathBuf,
    ) -> Result<ResolutionRecord> {
        if self.build.bundle {
            tracing::debug!(source = %source.display(), "Resolved to virtual module");
            return Ok(ResolutionRecord::Virtual { source });
        }

        if let Some(outdir) = &self.build.outdir {
            let artifact = build_module(&self.runtime, &source, &self.options)?;
            let target = output_target(outdir, resolve_dir, specifier, &source);
            if let Some(parent) = target.parent() {
                self.runtime.dir_create(parent, true)?;
            }
            self.runtime.file_write(&target, artifact.js.as_bytes())?;
            tracing::info!(
                source = %source.display(),
                target = %target.display(),
                "Wrote stylesheet module"
            );
        } else {
            tracing::debug!(source = %source.display(), "No bundle or outdir, passing through");
        }

        Ok(ResolutionRecord::Delegate { path: source })
    }

    /// Resolve a companion specifier to the importing stylesheet module.
    pub fn resolve_built(&self, args: &ResolveArgs) -> Result<ResolutionRecord> {
        let parent = args
            .importer
            .clone()
            .ok_or_else(|| ScssModulesError::InvalidSpecifier(args.path.clone()))?;
        Ok(ResolutionRecord::Built { parent })
    }

    /// Load a resolved record. Delegated records are read by the host.
    pub fn on_load(&self, record: &ResolutionRecord) -> Result<Option<LoadResult>> {
        match record {
            ResolutionRecord::Delegate { .. } => Ok(None),
            ResolutionRecord::Virtual { source } => self.load_stylesheet(source).map(Some),
            ResolutionRecord::Built { parent } => Ok(self.load_built(parent)),
        }
    }

    /// Compile a stylesheet module and record its CSS for the companion.
    pub fn load_stylesheet(&self, source: &Path) -> Result<LoadResult> {
        let artifact = build_module(&self.runtime, source, &self.options)?;
        lock(&self.css_results).insert(source.to_path_buf(), artifact.css);
        Ok(LoadResult {
            contents: Some(artifact.js),
            loader: Loader::Js,
            watch_files: vec![source.to_path_buf()],
        })
    }

    /// Load the companion of `parent`.
    ///
    /// With injection enabled the generated module styles the page itself
    /// and the companion has no contents.
    pub fn load_built(&self, parent: &Path) -> Option<LoadResult> {
        if self.options.inject {
            return None;
        }
        let css = lock(&self.css_results).get(parent).cloned();
        if css.is_none() {
            tracing::warn!(source = %parent.display(), "No compiled CSS recorded for stylesheet");
        }
        Some(LoadResult {
            contents: css,
            loader: Loader::Css,
            watch_files: vec![parent.to_path_buf()],
        })
    }

    /// Resolve and load a stylesheet the way a bundling host would, then
    /// follow the companion import.
    pub fn bundle(&self, specifier: &str, resolve_dir: &Path) -> Result<BundledStylesheet> {
        let record = self.resolve_stylesheet(specifier, resolve_dir)?;
        let ResolutionRecord::Virtual { source } = record else {
            return Err(ScssModulesError::NotVirtual {
                path: record.path(),
            });
        };

        let js = self
            .load_stylesheet(&source)?
            .contents
            .unwrap_or_default();

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ScssModulesError::InvalidSpecifier(specifier.to_string()))?;
        let companion = ResolveArgs::new(
            format!("./{}{}", file_name, BUILT_SUFFIX),
            source.parent().unwrap_or(Path::new("/")),
        )
        .with_importer(source.clone(), NAMESPACE);

        let css = match self.on_resolve(&companion)? {
            Some(built) => self.on_load(&built)?.and_then(|r| r.contents),
            None => None,
        };

        Ok(BundledStylesheet { source, js, css })
    }

    /// Cached resolution of `source`, if any.
    pub fn cached_record(&self, source: &Path) -> Option<ResolutionRecord> {
        lock(&self.results).get(source).cloned()
    }

    /// CSS recorded by the last load of `source`, if any.
    pub fn recorded_css(&self, source: &Path) -> Option<String> {
        lock(&self.css_results).get(source).cloned()
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.results).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scss_modules_runtime::MemoryRuntime;

    fn runtime() -> Arc<dyn SystemRuntime> {
        let runtime = MemoryRuntime::new();
        runtime.add_file("/project/src/button.modules.scss", ".root { color: red; }");
        Arc::new(runtime)
    }

    #[test]
    fn test_on_resolve_ignores_other_specifiers() {
        let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), runtime());

        let args = ResolveArgs::new("./index.js", "/project/src");
        assert_eq!(session.on_resolve(&args).unwrap(), None);
    }

    #[test]
    fn test_built_specifier_requires_plugin_namespace() {
        let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), runtime());

        let from_file = ResolveArgs::new("./button.modules.scss?built", "/project/src")
            .with_importer("/project/src/index.js", "file");
        assert_eq!(session.on_resolve(&from_file).unwrap(), None);

        let from_plugin = ResolveArgs::new("./button.modules.scss?built", "/project/src")
            .with_importer("/project/src/button.modules.scss", NAMESPACE);
        assert_eq!(
            session.on_resolve(&from_plugin).unwrap(),
            Some(ResolutionRecord::Built {
                parent: PathBuf::from("/project/src/button.modules.scss")
            })
        );
    }

    #[test]
    fn test_bundle_mode_resolves_virtual_and_caches() {
        let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), runtime());

        let record = session
            .resolve_stylesheet("./button.modules.scss", Path::new("/project/src"))
            .unwrap();

        let source = PathBuf::from("/project/src/button.modules.scss");
        assert_eq!(record, ResolutionRecord::Virtual { source: source.clone() });
        assert_eq!(session.cached_record(&source), Some(record));
        assert_eq!(session.cache_len(), 1);
    }

    #[test]
    fn test_relative_resolve_dir_uses_runtime_cwd() {
        let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), runtime());

        let record = session
            .resolve_stylesheet("./button.modules.scss", Path::new("src"))
            .unwrap();

        assert_eq!(record.path(), PathBuf::from("/project/src/button.modules.scss"));
    }

    #[test]
    fn test_passthrough_without_bundle_or_outdir() {
        let session = ScssModulesPlugin::default().setup(&BuildOptions::default(), runtime());

        let record = session
            .resolve_stylesheet("./button.modules.scss", Path::new("/project/src"))
            .unwrap();

        assert_eq!(
            record,
            ResolutionRecord::Delegate {
                path: PathBuf::from("/project/src/button.modules.scss")
            }
        );
        assert_eq!(session.on_load(&record).unwrap(), None);
    }

    #[test]
    fn test_invalid_specifier() {
        let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), runtime());

        let err = session
            .resolve_stylesheet("./button.css", Path::new("/project/src"))
            .unwrap_err();
        assert!(matches!(err, ScssModulesError::InvalidSpecifier(_)));
    }

    #[test]
    fn test_load_built_without_recorded_css() {
        let plugin = ScssModulesPlugin::new(PluginOptions::default().with_inject(false));
        let session = plugin.setup(&BuildOptions::bundle(), runtime());

        let result = session
            .load_built(Path::new("/project/src/button.modules.scss"))
            .unwrap();

        assert_eq!(result.contents, None);
        assert_eq!(result.loader, Loader::Css);
    }

    #[test]
    fn test_bundle_requires_bundle_mode() {
        let session = ScssModulesPlugin::default().setup(&BuildOptions::default(), runtime());

        let err = session
            .bundle("./button.modules.scss", Path::new("/project/src"))
            .unwrap_err();
        assert!(matches!(err, ScssModulesError::NotVirtual { .. }));
    }
}
