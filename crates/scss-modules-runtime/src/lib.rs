/*
 * scss-modules-runtime
 *
 * Runtime abstraction layer for the scss-modules build integration.
 *
 * The orchestrator never touches `std::fs` directly. Every read (via the SASS
 * compiler) and every write (output-directory mode) goes through a
 * `SystemRuntime`, so the same pipeline runs against:
 *
 * - NativeRuntime: the real filesystem
 * - MemoryRuntime: an in-memory filesystem for hermetic builds and tests
 */

mod memory;
mod native;
mod path;
mod sass_native;
mod traits;

pub use traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime};

pub use memory::MemoryRuntime;
pub use native::NativeRuntime;

pub use path::{normalize_path, relative_path};

pub use sass_native::{RuntimeFs, SassOptions, SassOutputStyle, compile_scss, compile_scss_file};

/// Create a runtime backed by the real filesystem.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}
