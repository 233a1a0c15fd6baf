/*
 * bundle.rs
 *
 * Bundle-mode compile command
 */

//! `scss-modules bundle` compiles one stylesheet the way a bundling host
//! would and prints or writes the split outputs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use scss_modules::{BuildOptions, ScssModulesPlugin};
use scss_modules_runtime::{NativeRuntime, SystemRuntime};

use super::GlobalArgs;

/// Arguments for the bundle command
#[derive(Debug)]
pub struct BundleArgs {
    /// Stylesheet specifier, relative to the current directory
    pub entry: String,
    /// Output directory; stdout when absent
    pub out: Option<PathBuf>,
}

/// Execute the bundle command
pub fn execute(global: &GlobalArgs, args: BundleArgs) -> Result<()> {
    let runtime = Arc::new(NativeRuntime::new());
    let cwd = runtime.cwd().context("Failed to get current directory")?;
    run(global, args, runtime, &cwd)
}

/// Bundle one entry, resolving its specifier and `--out` against `cwd`.
pub fn run(
    global: &GlobalArgs,
    args: BundleArgs,
    runtime: Arc<dyn SystemRuntime>,
    cwd: &Path,
) -> Result<()> {
    let options = global.plugin_options(runtime.as_ref())?;

    let session = ScssModulesPlugin::new(options).setup(&BuildOptions::bundle(), runtime.clone());
    let bundled = session
        .bundle(&args.entry, cwd)
        .with_context(|| format!("Failed to bundle {}", args.entry))?;

    let Some(out) = args.out else {
        if bundled.css.is_some() {
            warn!("Companion CSS is only written with --out");
        }
        print!("{}", bundled.js);
        return Ok(());
    };

    let stem = bundled
        .source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .context("Stylesheet has no file name")?;
    let out = if out.is_absolute() { out } else { cwd.join(out) };
    runtime
        .dir_create(&out, true)
        .with_context(|| format!("Failed to create {}", out.display()))?;

    let js_path = out.join(format!("{}.js", stem));
    runtime
        .file_write(&js_path, bundled.js.as_bytes())
        .with_context(|| format!("Failed to write {}", js_path.display()))?;
    info!(path = %js_path.display(), "Wrote script module");

    if let Some(css) = &bundled.css {
        let css_path = out.join(format!("{}.css", stem));
        runtime
            .file_write(&css_path, css.as_bytes())
            .with_context(|| format!("Failed to write {}", css_path.display()))?;
        info!(path = %css_path.display(), "Wrote stylesheet");
    }

    Ok(())
}
