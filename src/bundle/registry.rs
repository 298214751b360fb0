//! Code emission for the two bundle targets.
//!
//! Browser bundles define a global module registry:
//!
//! ```text
//! var __bale__ = (function () { ... return { register, require }; })();
//! __bale__.register("lib/a.js", function (module, exports, require) { ... });
//! __bale__.require("index.js");
//! ```
//!
//! `require(id)` instantiates each module at most once and caches its
//! `module.exports`. Relative specifiers inside a module are resolved
//! against the module's own id.

use std::fmt::Write as _;

/// Global name of the module registry.
pub const REGISTRY_GLOBAL: &str = "__bale__";

const PRELUDE: &str = r#"var __bale__ = (function () {
  var factories = {};
  var cache = {};
  var extensions = __BALE_EXTENSIONS__;

  function normalize(base, spec) {
    if (spec.charAt(0) === "/") {
      base = "";
      spec = spec.slice(1);
    }
    var parts = base ? base.split("/") : [];
    parts.pop();
    var segments = spec.split("/");
    for (var i = 0; i < segments.length; i++) {
      var seg = segments[i];
      if (seg === "..") parts.pop();
      else if (seg !== "." && seg !== "") parts.push(seg);
    }
    return parts.join("/");
  }

  function lookup(id) {
    if (factories.hasOwnProperty(id)) return id;
    for (var i = 0; i < extensions.length; i++) {
      if (factories.hasOwnProperty(id + "." + extensions[i])) return id + "." + extensions[i];
    }
    for (var j = 0; j < extensions.length; j++) {
      var index = (id ? id + "/" : "") + "index." + extensions[j];
      if (factories.hasOwnProperty(index)) return index;
    }
    return null;
  }

  function register(id, factory) {
    factories[id] = factory;
  }

  function load(id) {
    if (cache.hasOwnProperty(id)) return cache[id].exports;
    var module = { id: id, exports: {} };
    cache[id] = module;
    factories[id].call(module.exports, module, module.exports, function (spec) {
      return resolve(id, spec);
    });
    return module.exports;
  }

  function resolve(from, spec) {
    var id = lookup(normalize(from, spec));
    if (id === null) throw new Error("module not found: " + spec + " (from " + from + ")");
    return load(id);
  }

  function require(id) {
    var found = lookup(id);
    if (found === null) throw new Error("module not found: " + id);
    return load(found);
  }

  return { register: register, require: require };
})();
"#;

const HYDRATION: &str = r#"(function () {
  if (typeof window === "undefined") return;
  var state = window.__BALE_STATE__ || {};
  var hydrate = function () {
    var entry = __ENTRY__;
    var root = __bale__.require(entry);
    var mount = root && (root.hydrate || (root["default"] && root["default"].hydrate));
    if (typeof mount === "function") mount(state);
    window.__BALE_HYDRATED__ = true;
  };
  if (document.readyState === "loading") {
    document.addEventListener("DOMContentLoaded", hydrate);
  } else {
    hydrate();
  }
})();
"#;

/// JSON string literal for a module id.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

/// A source file ready for emission.
pub struct Module<'a> {
    /// Root-relative path with `/` separators.
    pub id: &'a str,
    pub source: &'a str,
}

/// Browser target: registry prelude, one registration per module, entry call.
pub fn browser(modules: &[Module<'_>], extensions: &[String]) -> String {
    let extensions = serde_json::Value::from(
        extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_owned())
            .collect::<Vec<_>>(),
    )
    .to_string();

    let capacity = modules.iter().map(|m| m.source.len() + 96).sum::<usize>() + PRELUDE.len();
    let mut code = String::with_capacity(capacity);
    code.push_str(&PRELUDE.replacen("__BALE_EXTENSIONS__", &extensions, 1));

    for module in modules {
        let _ = writeln!(
            code,
            "{REGISTRY_GLOBAL}.register({}, function (module, exports, require) {{",
            js_string(module.id)
        );
        code.push_str(module.source);
        if !module.source.ends_with('\n') {
            code.push('\n');
        }
        code.push_str("});\n");
    }

    if let Some(entry) = modules.first() {
        let _ = writeln!(code, "{REGISTRY_GLOBAL}.require({});", js_string(entry.id));
    }
    code
}

/// Server target: contents in order, optionally with `// File:` markers.
pub fn server(modules: &[Module<'_>], comments: bool) -> String {
    let mut code = String::new();
    for module in modules {
        if comments {
            let _ = writeln!(code, "// File: {}", module.id);
        }
        code.push_str(module.source);
        if !module.source.ends_with('\n') {
            code.push('\n');
        }
    }
    code
}

/// Client bootstrap that hands `window.__BALE_STATE__` to the entry's `hydrate`.
pub fn hydration(entry_id: &str) -> String {
    HYDRATION.replacen("__ENTRY__", &js_string(entry_id), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules() -> Vec<Module<'static>> {
        vec![
            Module {
                id: "index.js",
                source: "const a = require('./lib/a');",
            },
            Module {
                id: "lib/a.js",
                source: "module.exports = 1;\n",
            },
        ]
    }

    #[test]
    fn test_browser_wraps_each_module() {
        let code = browser(&modules(), &["js".to_string()]);
        assert!(code.starts_with("var __bale__ = (function () {"));
        assert!(code.contains("var extensions = [\"js\"];"));
        assert!(code.contains(
            "__bale__.register(\"index.js\", function (module, exports, require) {\nconst a = require('./lib/a');\n});"
        ));
        assert!(code.contains("__bale__.register(\"lib/a.js\""));
        assert!(code.ends_with("__bale__.require(\"index.js\");\n"));
    }

    #[test]
    fn test_module_ids_are_escaped() {
        let code = browser(
            &[Module {
                id: "we\"ird.js",
                source: "",
            }],
            &[],
        );
        assert!(code.contains("__bale__.register(\"we\\\"ird.js\""));
    }

    #[test]
    fn test_server_concatenates_in_order() {
        let code = server(&modules(), true);
        assert_eq!(
            code,
            "// File: index.js\nconst a = require('./lib/a');\n// File: lib/a.js\nmodule.exports = 1;\n"
        );
        assert!(!server(&modules(), false).contains("// File:"));
    }

    #[test]
    fn test_hydration_references_entry() {
        let snippet = hydration("app/main.js");
        assert!(snippet.contains("var entry = \"app/main.js\";"));
        assert!(snippet.contains("__bale__.require(entry)"));
        assert!(snippet.contains("window.__BALE_STATE__"));
    }
}
