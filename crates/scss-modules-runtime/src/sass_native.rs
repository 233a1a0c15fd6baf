//! SASS compilation using the grass crate.
//!
//! This module provides SASS/SCSS compilation using the grass crate, a pure
//! Rust implementation that targets dart-sass.
//!
//! Key components:
//! - `RuntimeFs`: Adapter implementing `grass::Fs` for our `SystemRuntime`
//! - `compile_scss_file`: compile a stylesheet on disk (or in memory)
//! - `compile_scss`: compile SCSS source text

use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use grass::{Options, OutputStyle};

use crate::traits::{RuntimeError, RuntimeResult, SystemRuntime};

/// Output style of the compiled CSS.
///
/// Mirrors `grass::OutputStyle` so that grass types do not leak into the
/// public API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SassOutputStyle {
    /// One declaration per line, nested blocks indented
    #[default]
    Expanded,
    /// As little whitespace as possible
    Compressed,
}

impl From<SassOutputStyle> for OutputStyle {
    fn from(style: SassOutputStyle) -> Self {
        match style {
            SassOutputStyle::Expanded => OutputStyle::Expanded,
            SassOutputStyle::Compressed => OutputStyle::Compressed,
        }
    }
}

/// Compiler options forwarded to grass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SassOptions {
    /// Directories to search for @use/@import resolution
    pub load_paths: Vec<PathBuf>,
    /// Output style of the generated CSS
    pub style: SassOutputStyle,
    /// Suppress `@warn` and `@debug` output
    pub quiet: bool,
    /// Allow grass to emit `@charset` / a BOM for non-ASCII output
    pub allows_charset: bool,
}

/// Adapter that implements `grass::Fs` using a `SystemRuntime`.
///
/// This allows grass to read files through our runtime abstraction,
/// so `@use`/`@import` resolution sees the same filesystem as the rest of
/// the pipeline.
pub struct RuntimeFs<'a> {
    runtime: &'a dyn SystemRuntime,
}

impl<'a> RuntimeFs<'a> {
    /// Create a new RuntimeFs adapter wrapping the given runtime.
    pub fn new(runtime: &'a dyn SystemRuntime) -> Self {
        Self { runtime }
    }
}

impl Debug for RuntimeFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeFs")
            .field("runtime", &"<SystemRuntime>")
            .finish()
    }
}

impl grass::Fs for RuntimeFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.runtime.is_dir(path).unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.runtime.is_file(path).unwrap_or(false)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.runtime.file_read(path).map_err(|e| match e {
            RuntimeError::Io(e) => e,
            RuntimeError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, e.to_string()),
            other => io::Error::other(other.to_string()),
        })
    }
}

fn grass_options<'a>(fs: &'a RuntimeFs<'a>, options: &'a SassOptions) -> Options<'a> {
    Options::default()
        .fs(fs)
        .load_paths(&options.load_paths)
        .style(options.style.into())
        .quiet(options.quiet)
        .allows_charset(options.allows_charset)
}

/// Compile the stylesheet at `path` to CSS using grass.
///
/// The entry file and everything it imports are read through `runtime`.
///
/// # Returns
///
/// Compiled CSS string on success, `RuntimeError::SassError` on failure.
pub fn compile_scss_file(
    runtime: &dyn SystemRuntime,
    path: &Path,
    options: &SassOptions,
) -> RuntimeResult<String> {
    let fs = RuntimeFs::new(runtime);
    let grass_options = grass_options(&fs, options);

    grass::from_path(path, &grass_options).map_err(|e| RuntimeError::SassError(e.to_string()))
}

/// Compile SCSS source to CSS using grass.
///
/// Plain CSS is valid SCSS, so this doubles as a CSS re-printer: compiling
/// already-compiled CSS with [`SassOutputStyle::Compressed`] minifies it.
pub fn compile_scss(
    runtime: &dyn SystemRuntime,
    scss: &str,
    options: &SassOptions,
) -> RuntimeResult<String> {
    let fs = RuntimeFs::new(runtime);
    let grass_options = grass_options(&fs, options);

    grass::from_string(scss, &grass_options).map_err(|e| RuntimeError::SassError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryRuntime;

    #[test]
    fn test_compile_simple_scss() {
        let runtime = MemoryRuntime::new();
        let scss = "$primary: #007bff; .btn { color: $primary; }";

        let css = compile_scss(&runtime, scss, &SassOptions::default()).unwrap();

        assert!(css.contains(".btn"));
        assert!(css.contains("#007bff"));
    }

    #[test]
    fn test_compile_scss_compressed() {
        let runtime = MemoryRuntime::new();
        let scss = "$primary: blue;\n\n.btn {\n  color: $primary;\n}";
        let options = SassOptions {
            style: SassOutputStyle::Compressed,
            ..SassOptions::default()
        };

        let css = compile_scss(&runtime, scss, &options).unwrap();

        assert!(!css.contains("\n\n"));
        assert!(css.contains(".btn"));
        assert!(css.contains("blue"));
    }

    #[test]
    fn test_compile_file_resolves_partials_through_runtime() {
        let runtime = MemoryRuntime::new();
        runtime.add_file("/project/src/_colors.scss", "$accent: #ff0000;");
        runtime.add_file(
            "/project/src/button.module.scss",
            "@import 'colors';\n.root { color: $accent; }",
        );

        let css = compile_scss_file(
            &runtime,
            Path::new("/project/src/button.module.scss"),
            &SassOptions::default(),
        )
        .unwrap();

        assert!(css.contains(".root"));
        assert!(css.contains("#ff0000"));
    }

    #[test]
    fn test_compile_file_uses_load_paths() {
        let runtime = MemoryRuntime::new();
        runtime.add_file("/project/shared/_theme.scss", "$gap: 4px;");
        runtime.add_file("/project/src/card.module.scss", "@import 'theme';\n.card { gap: $gap; }");
        let options = SassOptions {
            load_paths: vec![PathBuf::from("/project/shared")],
            ..SassOptions::default()
        };

        let css =
            compile_scss_file(&runtime, Path::new("/project/src/card.module.scss"), &options)
                .unwrap();

        assert!(css.contains("gap: 4px"));
    }

    #[test]
    fn test_compile_scss_error() {
        let runtime = MemoryRuntime::new();
        let scss = ".btn { color: $undefined-variable; }";

        let result = compile_scss(&runtime, scss, &SassOptions::default());

        assert!(matches!(result, Err(RuntimeError::SassError(_))));
    }

    #[test]
    fn test_compile_missing_file_is_an_error() {
        let runtime = MemoryRuntime::new();

        let result = compile_scss_file(
            &runtime,
            Path::new("/project/missing.module.scss"),
            &SassOptions::default(),
        );

        assert!(matches!(result, Err(RuntimeError::SassError(_))));
    }

    #[test]
    fn test_compile_scss_nested_rules() {
        let runtime = MemoryRuntime::new();
        let scss = r#"
            .nav {
                background: white;

                .item {
                    padding: 10px;

                    &:hover {
                        background: gray;
                    }
                }
            }
        "#;

        let css = compile_scss(&runtime, scss, &SassOptions::default()).unwrap();

        assert!(css.contains(".nav .item"));
        assert!(css.contains(".nav .item:hover"));
    }

    #[test]
    fn test_runtime_fs_debug() {
        let runtime = MemoryRuntime::new();
        let fs = RuntimeFs::new(&runtime);
        let debug_str = format!("{:?}", fs);
        assert!(debug_str.contains("RuntimeFs"));
    }
}
