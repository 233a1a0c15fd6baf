//! Resolution records and import-specifier handling.
//!
//! Two specifier shapes are intercepted:
//!
//! - `*.module.scss` / `*.modules.scss`: the stylesheet itself
//! - `*.module(s).scss?built`: the compiled-CSS companion imported by a
//!   generated module

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use scss_modules_runtime::{normalize_path, relative_path};

use crate::render::BUILT_SUFFIX;

/// Namespace tagging modules synthesized by this plugin.
pub const NAMESPACE: &str = "esbuild-scss-modules-plugin";

/// Namespace of ordinary filesystem modules.
pub const FILE_NAMESPACE: &str = "file";

/// Filter for stylesheet module specifiers.
pub const STYLESHEET_FILTER: &str = r"\.modules?\.scss$";

/// Filter for compiled-CSS companion specifiers.
pub const BUILT_FILTER: &str = r"\.modules?\.scss\?built$";

static STYLESHEET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(STYLESHEET_FILTER).unwrap());
static BUILT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(BUILT_FILTER).unwrap());

/// Suffix appended to generated output files.
const OUTPUT_SUFFIX: &str = ".css.js";

/// Does `specifier` name a stylesheet module?
pub fn is_stylesheet_module(specifier: &str) -> bool {
    STYLESHEET_RE.is_match(specifier)
}

/// Does `specifier` name a compiled-CSS companion module?
pub fn is_built_module(specifier: &str) -> bool {
    BUILT_RE.is_match(specifier)
}

/// Outcome of resolving an intercepted import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolutionRecord {
    /// Let the host read `path` from the real filesystem
    Delegate { path: PathBuf },
    /// Virtual script module compiled from `source` on load
    Virtual { source: PathBuf },
    /// Compiled-CSS companion of the stylesheet module `parent`
    Built { parent: PathBuf },
}

impl ResolutionRecord {
    pub fn namespace(&self) -> &'static str {
        match self {
            ResolutionRecord::Delegate { .. } => FILE_NAMESPACE,
            ResolutionRecord::Virtual { .. } | ResolutionRecord::Built { .. } => NAMESPACE,
        }
    }

    /// Module path as reported to the host.
    ///
    /// Together with [`namespace`](Self::namespace) this is the module's
    /// identity, so a companion carries the `?built` suffix to stay distinct
    /// from the script module of the same stylesheet.
    pub fn path(&self) -> PathBuf {
        match self {
            ResolutionRecord::Delegate { path } => path.clone(),
            ResolutionRecord::Virtual { source } => source.clone(),
            ResolutionRecord::Built { parent } => {
                let mut path = parent.clone().into_os_string();
                path.push(BUILT_SUFFIX);
                PathBuf::from(path)
            }
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.namespace() == NAMESPACE
    }
}

/// An import request as received from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveArgs {
    /// Import specifier as written
    pub path: String,
    /// Directory the specifier is resolved against
    pub resolve_dir: PathBuf,
    /// Path of the importing module, if any
    pub importer: Option<PathBuf>,
    /// Namespace of the importing module
    pub namespace: String,
}

impl ResolveArgs {
    /// An import from an ordinary file (or an entry point).
    pub fn new(path: impl Into<String>, resolve_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resolve_dir: resolve_dir.into(),
            importer: None,
            namespace: FILE_NAMESPACE.to_string(),
        }
    }

    /// Mark the request as coming from `importer` in `namespace`.
    pub fn with_importer(mut self, importer: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        self.importer = Some(importer.into());
        self.namespace = namespace.into();
        self
    }
}

/// Absolute, normalized path of `specifier` resolved against `resolve_dir`.
pub fn source_reference(resolve_dir: &Path, specifier: &str) -> PathBuf {
    normalize_path(&resolve_dir.join(specifier))
}

/// Does `haystack` contain `needle` as a contiguous run of path components?
fn contains_components(haystack: &Path, needle: &Path) -> bool {
    let needle: Vec<Component<'_>> = needle.components().collect();
    if needle.is_empty() {
        return true;
    }
    let haystack: Vec<Component<'_>> = haystack.components().collect();
    haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Target path of the generated `<basename>.css.js` in output-directory mode.
///
/// The entry's directory relative to `resolve_dir` is nested under the
/// output directory, unless the output directory already contains it.
pub fn output_target(outdir: &Path, resolve_dir: &Path, specifier: &str, source: &Path) -> PathBuf {
    let absolute_outdir = normalize_path(&resolve_dir.join(outdir));

    let specifier = Path::new(specifier);
    let entry_path = if specifier.is_absolute() {
        relative_path(resolve_dir, specifier).unwrap_or_else(|| specifier.to_path_buf())
    } else {
        specifier.to_path_buf()
    };
    let entry_rel_dir = entry_path
        .parent()
        .map(normalize_path)
        .unwrap_or_default();

    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{}{}", base, OUTPUT_SUFFIX);

    if contains_components(&absolute_outdir, &entry_rel_dir) {
        absolute_outdir.join(file_name)
    } else {
        normalize_path(&absolute_outdir.join(entry_rel_dir).join(file_name))
    }
}
