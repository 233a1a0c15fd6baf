/*
 * types.rs
 *
 * TypeScript declaration command
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use scss_modules::render_declaration;
use scss_modules_runtime::{NativeRuntime, SystemRuntime};

/// Execute the types command
pub fn execute(out: Option<PathBuf>) -> Result<()> {
    let declaration = render_declaration();

    let Some(path) = out else {
        print!("{}", declaration);
        return Ok(());
    };

    let runtime = NativeRuntime::new();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        runtime
            .dir_create(parent, true)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    runtime
        .file_write(&path, declaration.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote declaration");
    Ok(())
}
