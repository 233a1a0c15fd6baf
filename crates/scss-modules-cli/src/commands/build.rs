/*
 * build.rs
 *
 * Output-directory build command
 */

//! `scss-modules build` writes one `<basename>.css.js` module per entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use scss_modules::{BuildOptions, ResolveArgs, ScssModulesPlugin};
use scss_modules_runtime::{NativeRuntime, SystemRuntime};

use super::GlobalArgs;

/// Arguments for the build command
#[derive(Debug)]
pub struct BuildArgs {
    /// Stylesheet specifiers, relative to the current directory
    pub entries: Vec<String>,
    /// Output directory
    pub outdir: PathBuf,
}

/// Execute the build command
pub fn execute(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let runtime = Arc::new(NativeRuntime::new());
    let cwd = runtime.cwd().context("Failed to get current directory")?;
    run(global, args, runtime, &cwd)
}

/// Build every entry, resolving specifiers against `cwd`.
pub fn run(
    global: &GlobalArgs,
    args: BuildArgs,
    runtime: Arc<dyn SystemRuntime>,
    cwd: &Path,
) -> Result<()> {
    let options = global.plugin_options(runtime.as_ref())?;

    let session = ScssModulesPlugin::new(options).setup(&BuildOptions::transform(args.outdir), runtime);

    for entry in &args.entries {
        let record = session
            .on_resolve(&ResolveArgs::new(entry.as_str(), cwd))
            .with_context(|| format!("Failed to build {}", entry))?;
        if record.is_none() {
            anyhow::bail!("Not a stylesheet module (*.module.scss / *.modules.scss): {}", entry);
        }
    }

    info!(count = args.entries.len(), "Build complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> (tempfile::TempDir, Arc<NativeRuntime>) {
        let temp = tempfile::TempDir::new().unwrap();
        let runtime = NativeRuntime::new();
        runtime
            .dir_create(&temp.path().join("src/components"), true)
            .unwrap();
        runtime
            .file_write(
                &temp.path().join("src/components/button.modules.scss"),
                b".root { color: red; }",
            )
            .unwrap();
        (temp, Arc::new(runtime))
    }

    #[test]
    fn test_build_writes_module_under_outdir() {
        let (temp, runtime) = project();
        let outdir = temp.path().join("dist");
        let args = BuildArgs {
            entries: vec!["src/components/button.modules.scss".to_string()],
            outdir: outdir.clone(),
        };

        run(&GlobalArgs::default(), args, runtime, temp.path()).unwrap();

        let js = std::fs::read_to_string(outdir.join("src/components/button.modules.css.js"))
            .unwrap();
        assert!(js.contains("const classes = {\"root\":\"_root_"));
        assert!(js.contains("import \"./button.modules.scss?built\";"));
    }

    #[test]
    fn test_build_honours_no_inject_flag() {
        let (temp, runtime) = project();
        let outdir = temp.path().join("dist");
        let global = GlobalArgs {
            no_inject: true,
            ..GlobalArgs::default()
        };
        let args = BuildArgs {
            entries: vec!["src/components/button.modules.scss".to_string()],
            outdir: outdir.clone(),
        };

        run(&global, args, runtime, temp.path()).unwrap();

        let js = std::fs::read_to_string(outdir.join("src/components/button.modules.css.js"))
            .unwrap();
        assert!(!js.contains("?built"));
        assert!(!js.contains("document"));
    }

    #[test]
    fn test_build_rejects_plain_stylesheet() {
        let (temp, runtime) = project();
        let args = BuildArgs {
            entries: vec!["src/plain.scss".to_string()],
            outdir: temp.path().join("dist"),
        };

        let err = run(&GlobalArgs::default(), args, runtime, temp.path()).unwrap_err();

        assert!(err.to_string().contains("src/plain.scss"), "got {err}");
        assert!(!temp.path().join("dist").exists());
    }
}
