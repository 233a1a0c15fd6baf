//! Build integration for CSS-Modules-style SCSS stylesheets.
//!
//! This crate provides:
//! - Resolution of `*.module(s).scss` imports and their `?built` companions
//! - The builder: SASS compilation, class-name scoping, optional minification
//! - Rendering of the script module exposing the class-name mapping
//! - Per-build session state (resolution cache, recorded CSS)

mod build;
mod config;
mod error;
mod naming;
mod render;
mod resolve;
mod scope;
mod session;
mod transform;

pub use build::{CompiledArtifact, build_module, content_digest};
pub use config::{
    CssCallback, LocalsConvention, OutputStyleName, PluginConfigFile, PluginOptions,
    ScopedNameFn, ScopedNameStrategy, ScssOptionsFile,
};
pub use error::{BoxError, Result, ScssModulesError};
pub use naming::{camel_case, dashes_camel_case, export_keys};
pub use render::{BUILT_SUFFIX, RenderInput, render_declaration, render_module};
pub use resolve::{
    BUILT_FILTER, FILE_NAMESPACE, NAMESPACE, ResolutionRecord, ResolveArgs, STYLESHEET_FILTER,
    is_built_module, is_stylesheet_module, output_target, source_reference,
};
pub use scope::{ClassNameMapping, CssModules, ScopeError, ScopedCss};
pub use session::{
    BuildOptions, BuildSession, BundledStylesheet, LoadResult, Loader, ScssModulesPlugin,
};
pub use transform::{CssPipeline, CssTransform, Minify};
