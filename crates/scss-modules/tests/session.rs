//! End-to-end resolution and loading through a build session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use scss_modules::{
    BUILT_SUFFIX, BuildOptions, Loader, NAMESPACE, PluginOptions, ResolutionRecord, ResolveArgs,
    ScssModulesPlugin, content_digest,
};
use scss_modules_runtime::{MemoryRuntime, NativeRuntime, SystemRuntime};

const BUTTON: &str = "/project/src/button.modules.scss";

fn memory_runtime() -> Arc<MemoryRuntime> {
    let runtime = MemoryRuntime::new();
    runtime.add_file(BUTTON, ".root { color: red; }\n");
    runtime.add_file(
        "/project/src/card.module.scss",
        "$pad: 4px;\n.card {\n  padding: $pad;\n  .card-title { font-weight: bold; }\n}\n",
    );
    Arc::new(runtime)
}

fn counting(options: PluginOptions) -> (PluginOptions, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let options = options.with_css_callback(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (options, count)
}

fn extract_const<'a>(js: &'a str, name: &str) -> &'a str {
    let prefix = format!("const {} = ", name);
    js.lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap_or_else(|| panic!("no `{name}` constant in:\n{js}"))
}

#[test]
fn button_example_exports_scoped_root() {
    let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), memory_runtime());

    let bundled = session
        .bundle("./button.modules.scss", Path::new("/project/src"))
        .unwrap();

    let classes: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(extract_const(&bundled.js, "classes")).unwrap();
    let scoped = classes["root"].as_str().unwrap();
    assert!(scoped.starts_with("_root_"), "got {scoped}");

    let css: String = serde_json::from_str(extract_const(&bundled.js, "css")).unwrap();
    assert!(css.contains(&format!(".{} {{", scoped)));
    assert!(css.contains("color: red"));

    let digest = extract_const(&bundled.js, "digest").trim_matches('\'');
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(digest, content_digest(&css));

    assert!(bundled.js.contains("export default classes;"));
    assert!(bundled.js.contains("export { css, digest, classes };"));
}

#[test]
fn digest_is_deterministic_and_content_sensitive() {
    let runtime = memory_runtime();
    let first = ScssModulesPlugin::default()
        .setup(&BuildOptions::bundle(), runtime.clone())
        .bundle("./button.modules.scss", Path::new("/project/src"))
        .unwrap();
    let second = ScssModulesPlugin::default()
        .setup(&BuildOptions::bundle(), runtime.clone())
        .bundle("./button.modules.scss", Path::new("/project/src"))
        .unwrap();
    assert_eq!(first.js, second.js);

    runtime.add_file(BUTTON, ".root { color: blue; }\n");
    let changed = ScssModulesPlugin::default()
        .setup(&BuildOptions::bundle(), runtime)
        .bundle("./button.modules.scss", Path::new("/project/src"))
        .unwrap();
    assert_ne!(
        extract_const(&first.js, "digest"),
        extract_const(&changed.js, "digest")
    );
}

#[test]
fn cached_resolution_is_reused() {
    let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), memory_runtime());
    let args = ResolveArgs::new("./button.modules.scss", "/project/src");

    let first = session.on_resolve(&args).unwrap().unwrap();
    let again = session
        .on_resolve(&ResolveArgs::new("../src/button.modules.scss", "/project/src"))
        .unwrap()
        .unwrap();

    assert_eq!(first, again);
    assert_eq!(session.cache_len(), 1);
    assert_eq!(first.namespace(), NAMESPACE);
}

#[test]
fn transform_mode_compiles_once_with_cache() {
    let (options, count) = counting(PluginOptions::default());
    let runtime = memory_runtime();
    let session =
        ScssModulesPlugin::new(options).setup(&BuildOptions::transform("/out"), runtime.clone());

    for _ in 0..3 {
        session
            .resolve_stylesheet("./button.modules.scss", Path::new("/project/src"))
            .unwrap();
    }

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn transform_mode_recompiles_without_cache() {
    let (options, count) = counting(PluginOptions::default().with_cache(false));
    let session = ScssModulesPlugin::new(options)
        .setup(&BuildOptions::transform("/out"), memory_runtime());

    let first = session
        .resolve_stylesheet("./button.modules.scss", Path::new("/project/src"))
        .unwrap();
    let second = session
        .resolve_stylesheet("./button.modules.scss", Path::new("/project/src"))
        .unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(first, second);
    assert_eq!(session.cache_len(), 0);
}

#[test]
fn inject_mode_imports_companion_and_guards_injection() {
    let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), memory_runtime());

    let record = session
        .on_resolve(&ResolveArgs::new("./button.modules.scss", "/project/src"))
        .unwrap()
        .unwrap();
    let load = session.on_load(&record).unwrap().unwrap();
    let js = load.contents.unwrap();

    assert_eq!(load.loader, Loader::Js);
    assert_eq!(load.watch_files, vec![PathBuf::from(BUTTON)]);
    assert!(js.starts_with(&format!("import \"./button.modules.scss{}\";", BUILT_SUFFIX)));
    assert!(js.contains("!document.getElementById(digest)"));
    assert!(js.contains("ele.id = digest;"));

    let companion = session
        .on_resolve(
            &ResolveArgs::new("./button.modules.scss?built", "/project/src")
                .with_importer(BUTTON, NAMESPACE),
        )
        .unwrap()
        .unwrap();
    assert_eq!(
        companion,
        ResolutionRecord::Built {
            parent: PathBuf::from(BUTTON)
        }
    );
    assert_eq!(companion.namespace(), record.namespace());
    assert_ne!(companion.path(), record.path());
    assert_eq!(session.on_load(&companion).unwrap(), None);
}

#[test]
fn non_inject_mode_splits_js_and_css() {
    let plugin = ScssModulesPlugin::new(PluginOptions::default().with_inject(false));
    let session = plugin.setup(&BuildOptions::bundle(), memory_runtime());

    let bundled = session
        .bundle("./button.modules.scss", Path::new("/project/src"))
        .unwrap();

    assert!(!bundled.js.contains(BUILT_SUFFIX));
    assert!(!bundled.js.contains("document"));

    let css_in_module: String =
        serde_json::from_str(extract_const(&bundled.js, "css")).unwrap();
    assert_eq!(bundled.css.as_deref(), Some(css_in_module.as_str()));
    assert_eq!(
        session.recorded_css(Path::new(BUTTON)).as_deref(),
        Some(css_in_module.as_str())
    );

    let companion = session
        .on_load(&ResolutionRecord::Built {
            parent: PathBuf::from(BUTTON),
        })
        .unwrap()
        .unwrap();
    assert_eq!(companion.loader, Loader::Css);
    assert_eq!(companion.contents, bundled.css);
}

#[test]
fn minified_css_matches_after_normalization() {
    let runtime = memory_runtime();
    let split = |minify: bool| {
        ScssModulesPlugin::new(PluginOptions::default().with_inject(false).with_minify(minify))
            .setup(&BuildOptions::bundle(), runtime.clone())
            .bundle("./card.module.scss", Path::new("/project/src"))
            .unwrap()
            .css
            .unwrap()
    };

    let plain = split(false);
    let minified = split(true);

    let normalize = |css: &str| -> String {
        css.chars()
            .filter(|c| !c.is_whitespace() && *c != ';')
            .collect()
    };
    assert_ne!(plain, minified);
    assert_eq!(normalize(&plain), normalize(&minified));
}

#[test]
fn camel_case_only_keys_by_default() {
    let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), memory_runtime());

    let bundled = session
        .bundle("./card.module.scss", Path::new("/project/src"))
        .unwrap();

    let classes: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(extract_const(&bundled.js, "classes")).unwrap();
    let keys: Vec<&str> = classes.keys().map(String::as_str).collect();
    assert!(keys.contains(&"card"));
    assert!(keys.contains(&"cardTitle"));
    assert!(!keys.contains(&"card-title"));
}

#[test]
fn compile_errors_propagate_from_load() {
    let runtime = MemoryRuntime::new();
    runtime.add_file("/project/broken.module.scss", ".a { color: $nope; }");
    let session = ScssModulesPlugin::default().setup(&BuildOptions::bundle(), Arc::new(runtime));

    let err = session
        .bundle("./broken.module.scss", Path::new("/project"))
        .unwrap_err();

    assert!(err.to_string().contains("broken.module.scss"), "got {err}");
}

#[test]
fn outdir_nests_relative_entry_directory() {
    let temp = tempfile::TempDir::new().unwrap();
    let project = temp.path().join("project");
    let outdir = temp.path().join("out");
    let runtime = NativeRuntime::new();
    runtime
        .dir_create(&project.join("src/components"), true)
        .unwrap();
    runtime
        .file_write(
            &project.join("src/components/button.modules.scss"),
            b".root { color: red; }",
        )
        .unwrap();

    let session = ScssModulesPlugin::default()
        .setup(&BuildOptions::transform(&outdir), Arc::new(runtime));
    let record = session
        .resolve_stylesheet("src/components/button.modules.scss", &project)
        .unwrap();

    assert_eq!(
        record,
        ResolutionRecord::Delegate {
            path: project.join("src/components/button.modules.scss")
        }
    );
    let written = outdir.join("src/components/button.modules.css.js");
    let js = std::fs::read_to_string(&written).unwrap();
    assert!(js.contains("const classes = {\"root\":\"_root_"));
    assert_eq!(session.on_load(&record).unwrap(), None);
}

#[test]
fn outdir_already_containing_entry_dir_is_not_duplicated() {
    let temp = tempfile::TempDir::new().unwrap();
    let project = temp.path().join("project");
    let outdir = temp.path().join("dist/styles");
    let runtime = NativeRuntime::new();
    runtime.dir_create(&project.join("styles"), true).unwrap();
    runtime
        .file_write(&project.join("styles/card.module.scss"), b".card { margin: 0; }")
        .unwrap();

    let session = ScssModulesPlugin::default()
        .setup(&BuildOptions::transform(&outdir), Arc::new(runtime));
    session
        .resolve_stylesheet("styles/card.module.scss", &project)
        .unwrap();

    assert!(outdir.join("card.module.css.js").is_file());
    assert!(!outdir.join("styles").exists());
}
