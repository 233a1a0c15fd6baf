//! Post-scoping CSS transformation pipeline.
//!
//! - [`CssTransform`] - a text-to-text CSS transformation
//! - [`CssPipeline`] - ordered collection of transforms to execute
//! - [`Minify`] - re-prints CSS with grass' compressed output style
//!
//! The scoping transform is not part of the pipeline: it runs first and is
//! the only step that produces a class-name mapping.

use std::path::Path;
use std::sync::Arc;

use scss_modules_runtime::{SassOptions, SassOutputStyle, SystemRuntime, compile_scss};

use crate::error::{Result, ScssModulesError};

/// A transformation applied to scoped CSS text.
pub trait CssTransform: Send + Sync {
    /// Human-readable name for this transform.
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &str;

    /// Transform `css`, compiled from the stylesheet at `source`.
    fn apply(&self, css: &str, source: &Path) -> Result<String>;
}

/// A pipeline of CSS transforms, run in insertion order.
#[derive(Default)]
pub struct CssPipeline {
    transforms: Vec<Box<dyn CssTransform>>,
}

impl CssPipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transform to the pipeline.
    pub fn push(&mut self, transform: Box<dyn CssTransform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Run every transform in order.
    ///
    /// Returns the first error encountered. Execution stops on error.
    pub fn execute(&self, css: String, source: &Path) -> Result<String> {
        let mut css = css;
        for transform in &self.transforms {
            tracing::debug!(transform = transform.name(), source = %source.display(), "Running CSS transform");
            css = transform.apply(&css, source)?;
        }
        Ok(css)
    }

    /// List the names of all transforms in execution order.
    pub fn transform_names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }
}

/// Minifier: compiles plain CSS with the compressed output style.
pub struct Minify {
    runtime: Arc<dyn SystemRuntime>,
}

impl Minify {
    pub fn new(runtime: Arc<dyn SystemRuntime>) -> Self {
        Self { runtime }
    }
}

impl CssTransform for Minify {
    fn name(&self) -> &str {
        "minify"
    }

    fn apply(&self, css: &str, source: &Path) -> Result<String> {
        let options = SassOptions {
            style: SassOutputStyle::Compressed,
            quiet: true,
            ..SassOptions::default()
        };
        compile_scss(self.runtime.as_ref(), css, &options).map_err(|e| {
            ScssModulesError::Minify {
                path: source.to_path_buf(),
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scss_modules_runtime::MemoryRuntime;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl CssTransform for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn apply(&self, css: &str, _source: &Path) -> Result<String> {
            self.log.lock().unwrap().push(self.name);
            Ok(format!("{}/*{}*/", css, self.name))
        }
    }

    struct Failing;

    impl CssTransform for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn apply(&self, _css: &str, source: &Path) -> Result<String> {
            Err(ScssModulesError::Minify {
                path: source.to_path_buf(),
                message: "boom".into(),
            })
        }
    }

    #[test]
    fn test_pipeline_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = CssPipeline::new();
        pipeline.push(Box::new(Recording {
            name: "first",
            log: log.clone(),
        }));
        pipeline.push(Box::new(Recording {
            name: "second",
            log: log.clone(),
        }));

        let css = pipeline
            .execute(".a{}".to_string(), Path::new("/p/a.module.scss"))
            .unwrap();

        assert_eq!(css, ".a{}/*first*//*second*/");
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(pipeline.transform_names(), vec!["first", "second"]);
    }

    #[test]
    fn test_pipeline_stops_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = CssPipeline::new();
        pipeline.push(Box::new(Failing));
        pipeline.push(Box::new(Recording {
            name: "never",
            log: log.clone(),
        }));

        assert!(pipeline.execute(String::new(), Path::new("/p/a.module.scss")).is_err());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = CssPipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(
            pipeline
                .execute(".a { b: c; }".into(), Path::new("/p/a.module.scss"))
                .unwrap(),
            ".a { b: c; }"
        );
    }

    #[test]
    fn test_minify_removes_whitespace() {
        let minify = Minify::new(Arc::new(MemoryRuntime::new()));
        let css = "._root_abc12_1 {\n  color: red;\n  margin: 0 auto;\n}\n";

        let minified = minify.apply(css, Path::new("/p/a.module.scss")).unwrap();

        assert!(!minified.trim_end().contains('\n'));
        assert!(minified.starts_with("._root_abc12_1{"));
        assert!(minified.contains("color:red"));
    }
}
