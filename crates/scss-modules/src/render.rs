//! Script-module text generation.
//!
//! A compiled stylesheet becomes an ES module exposing its class-name
//! mapping:
//!
//! ```js
//! import "./button.modules.scss?built";   // inject only
//!
//! const digest = '<sha256 hex>';
//! const classes = {"root":"_root_1a2b3_1"};
//! const css = "._root_1a2b3_1 {\n  color: red;\n}";
//!
//! (function() { ... })();                  // inject only
//!
//! export default classes;
//! export { css, digest, classes };
//! ```

use std::fmt::Write;

use serde_json::Value;

use crate::scope::ClassNameMapping;

/// Suffix appended to a stylesheet specifier to request its compiled CSS.
pub const BUILT_SUFFIX: &str = "?built";

/// Everything needed to render one module.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// File name of the stylesheet, used for the `?built` side-effect import
    pub file_name: &'a str,
    /// SHA-256 hex digest of `css`
    pub digest: &'a str,
    pub classes: &'a ClassNameMapping,
    /// Final CSS text
    pub css: &'a str,
    pub inject: bool,
}

const INJECT_SNIPPET: &str = r#"(function() {
  if (typeof document !== "undefined" && !document.getElementById(digest)) {
    var ele = document.createElement('style');
    ele.id = digest;
    ele.textContent = css;
    document.head.appendChild(ele);
  }
})();
"#;

const DECLARATION_BODY: &str = r#"  interface IClassNames {
    [className: string]: string;
  }
  const classes: IClassNames;
  const digest: string;
  const css: string;

  export default classes;
  export { classes, digest, css };
"#;

/// Serialize a string as a JavaScript string literal.
fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Serialize the mapping as a JavaScript object literal, keeping key order.
fn js_object(classes: &ClassNameMapping) -> String {
    let entries: Vec<String> = classes
        .iter()
        .map(|(key, value)| format!("{}:{}", js_string(key), js_string(value)))
        .collect();
    format!("{{{}}}", entries.join(","))
}

/// Render the script module for a compiled stylesheet.
pub fn render_module(input: &RenderInput<'_>) -> String {
    let mut js = String::new();

    if input.inject {
        let specifier = format!("./{}{}", input.file_name, BUILT_SUFFIX);
        // Writing to a String cannot fail.
        let _ = writeln!(js, "import {};", js_string(&specifier));
        js.push('\n');
    }

    let _ = writeln!(js, "const digest = '{}';", input.digest);
    let _ = writeln!(js, "const classes = {};", js_object(input.classes));
    let _ = writeln!(js, "const css = {};", js_string(input.css));
    js.push('\n');

    if input.inject {
        js.push_str(INJECT_SNIPPET);
        js.push('\n');
    }

    js.push_str("export default classes;\n");
    js.push_str("export { css, digest, classes };\n");
    js
}

/// Ambient TypeScript declaration for stylesheet modules.
pub fn render_declaration() -> String {
    let mut dts = String::new();
    for pattern in ["*.modules.scss", "*.module.scss"] {
        if !dts.is_empty() {
            dts.push('\n');
        }
        let _ = writeln!(dts, "declare module {} {{", js_string(pattern));
        dts.push_str(DECLARATION_BODY);
        dts.push_str("}\n");
    }
    dts
}
