//! Builder: stylesheet -> scoped CSS -> script module.

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use scss_modules_runtime::{SystemRuntime, compile_scss_file};

use crate::config::PluginOptions;
use crate::error::{Result, ScssModulesError};
use crate::render::{RenderInput, render_module};
use crate::scope::{ClassNameMapping, CssModules};
use crate::transform::{CssPipeline, Minify};

/// Output of one compilation of a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Rendered script module
    pub js: String,
    /// Final CSS text (scoped, and minified when enabled)
    pub css: String,
    /// SHA-256 hex digest of `css`
    pub digest: String,
    pub classes: ClassNameMapping,
}

/// SHA-256 hex digest of the final CSS text.
pub fn content_digest(css: &str) -> String {
    format!("{:x}", Sha256::digest(css.as_bytes()))
}

fn post_scoping_pipeline(runtime: &Arc<dyn SystemRuntime>, options: &PluginOptions) -> CssPipeline {
    let mut pipeline = CssPipeline::new();
    if options.minify {
        pipeline.push(Box::new(Minify::new(runtime.clone())));
    }
    pipeline
}

/// Compile the stylesheet at `source` into a [`CompiledArtifact`].
///
/// Every call recompiles from scratch. Steps, in order: SASS compilation,
/// class-name scoping, optional minification, the CSS callback, digest and
/// module rendering. Any failure aborts the build of this stylesheet.
pub fn build_module(
    runtime: &Arc<dyn SystemRuntime>,
    source: &Path,
    options: &PluginOptions,
) -> Result<CompiledArtifact> {
    tracing::debug!(source = %source.display(), "Compiling stylesheet");

    let compiled = compile_scss_file(runtime.as_ref(), source, &options.scss_options).map_err(
        |e| ScssModulesError::Compile {
            path: source.to_path_buf(),
            message: e.to_string(),
        },
    )?;

    let scoped = CssModules::new(options.locals_convention, &options.generate_scoped_name)
        .transform(&compiled, source)
        .map_err(|e| ScssModulesError::Scope {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

    let css = post_scoping_pipeline(runtime, options).execute(scoped.css, source)?;
    let classes = scoped.classes;

    if let Some(callback) = &options.css_callback {
        callback(&css, &classes).map_err(|source_err| ScssModulesError::Callback {
            path: source.to_path_buf(),
            source: source_err,
        })?;
    }

    let digest = content_digest(&css);
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ScssModulesError::InvalidSpecifier(source.display().to_string()))?;

    let js = render_module(&RenderInput {
        file_name: &file_name,
        digest: &digest,
        classes: &classes,
        css: &css,
        inject: options.inject,
    });

    tracing::debug!(
        source = %source.display(),
        digest = %digest,
        classes = classes.len(),
        "Compiled stylesheet"
    );

    Ok(CompiledArtifact {
        js,
        css,
        digest,
        classes,
    })
}
