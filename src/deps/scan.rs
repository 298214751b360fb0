//! Textual import detection.
//!
//! Recognizes `require('x')`, `import ... from 'x'`, `import 'x'`,
//! `import('x')` and `export ... from 'x'`. Detection is pattern based:
//! no parsing, so imports inside comments or strings are reported too.

use regex::Regex;
use std::sync::LazyLock;

/// A quoted module specifier in any of the three JS quote styles.
macro_rules! quoted {
    () => {
        r#"(?:'([^'\n]+)'|"([^"\n]+)"|`([^`\n]+)`)"#
    };
}

static PATTERNS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        // require('x')
        Regex::new(concat!(r"\brequire\s*\(\s*", quoted!(), r"\s*\)")).unwrap(),
        // import('x')
        Regex::new(concat!(r"\bimport\s*\(\s*", quoted!(), r"\s*\)")).unwrap(),
        // import a, { b } from 'x'
        Regex::new(concat!(r#"\bimport\s+[^'"`;()]*?\bfrom\s*"#, quoted!())).unwrap(),
        // import 'x'
        Regex::new(concat!(r"\bimport\s*", quoted!())).unwrap(),
        // export * from 'x', export { a } from 'x'
        Regex::new(concat!(r#"\bexport\s+[^'"`;()]*?\bfrom\s*"#, quoted!())).unwrap(),
    ]
});

/// Module specifiers referenced by `source`, in source order, without duplicates.
pub fn specifiers(source: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(source))
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let spec = caps.get(1).or(caps.get(2)).or(caps.get(3))?.as_str();
            Some((start, spec))
        })
        .collect();

    found.sort_by_key(|(start, _)| *start);

    let mut out: Vec<String> = Vec::with_capacity(found.len());
    for (_, spec) in found {
        if !out.iter().any(|s| s == spec) {
            out.push(spec.to_string());
        }
    }
    out
}

/// Whether a specifier names a file (relative or root-absolute) rather than a package.
#[inline]
pub fn is_path_specifier(spec: &str) -> bool {
    spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with('/')
        || spec == "."
        || spec == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        let src = "const a = require('./a');\nconst b = require(\"./b.js\");";
        assert_eq!(specifiers(src), vec!["./a", "./b.js"]);
    }

    #[test]
    fn test_static_imports() {
        let src = r#"
import x from './x.js';
import { y, z } from "./yz";
import * as ns from '../ns.mjs';
import './side-effect.js';
"#;
        assert_eq!(
            specifiers(src),
            vec!["./x.js", "./yz", "../ns.mjs", "./side-effect.js"]
        );
    }

    #[test]
    fn test_multiline_import() {
        let src = "import {\n  one,\n  two,\n} from './many.js';";
        assert_eq!(specifiers(src), vec!["./many.js"]);
    }

    #[test]
    fn test_dynamic_import_and_reexports() {
        let src = "export * from './all.js';\nexport { a } from './a.js';\nconst lazy = () => import(`./lazy.js`);";
        assert_eq!(specifiers(src), vec!["./all.js", "./a.js", "./lazy.js"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let src = "require('./a'); require('./a'); import './a';";
        assert_eq!(specifiers(src), vec!["./a"]);
    }

    #[test]
    fn test_no_false_positive_on_identifiers() {
        let src = "const reimport = 1; myrequire('./x'); exported = 2;";
        assert!(specifiers(src).is_empty());
    }

    #[test]
    fn test_is_path_specifier() {
        assert!(is_path_specifier("./a"));
        assert!(is_path_specifier("../a"));
        assert!(is_path_specifier("/lib/a.js"));
        assert!(!is_path_specifier("react"));
        assert!(!is_path_specifier("@scope/pkg"));
    }
}
