//! Bundle minification.
//!
//! [`strip`] removes comments and redundant whitespace while copying string,
//! template and regular-expression literals verbatim. Line breaks between
//! statements are kept so automatic semicolon insertion still applies.
//! [`oxc`] runs the full oxc pipeline.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Words after which `/` starts a regular expression rather than a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Characters after which `/` starts a regular expression.
const REGEX_PRECEDERS: &str = "(,=:[!&|?{};+-*%<>~^";

/// Strip comments and collapse whitespace.
pub fn strip(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if next == Some('*') => {
                let mut spans_lines = false;
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    spans_lines |= chars[i] == '\n';
                    i += 1;
                }
                i = (i + 2).min(chars.len());
                if spans_lines {
                    end_line(&mut out);
                } else {
                    push_space(&mut out);
                }
                continue;
            }
            '\'' | '"' | '`' => {
                i = copy_quoted(&chars, i, &mut out);
                continue;
            }
            '/' if regex_allowed(&out) => {
                i = copy_regex(&chars, i, &mut out);
                continue;
            }
            '\n' => end_line(&mut out),
            c if c.is_whitespace() => push_space(&mut out),
            c => out.push(c),
        }
        i += 1;
    }

    end_line(&mut out);
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Minify with oxc. `None` when the input does not parse.
///
/// Input is parsed as a classic script: top-level names such as the registry
/// global stay visible to code loaded next to the bundle.
pub fn oxc(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

fn end_line(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with([' ', '\n']) {
        out.push(' ');
    }
}

/// Copy a quoted literal starting at `start`. Returns the index after it.
///
/// Unterminated `'`/`"` strings stop at the line break.
fn copy_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' && quote != '`' {
            return i;
        }
        out.push(c);
        if c == '\\' {
            if let Some(&escaped) = chars.get(i + 1) {
                out.push(escaped);
            }
            i += 2;
            continue;
        }
        i += 1;
        if c == quote {
            break;
        }
    }
    i.min(chars.len())
}

/// Copy a regular-expression literal (with flags) starting at `start`.
fn copy_regex(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('/');
    let mut i = start + 1;
    let mut in_class = false;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            return i;
        }
        out.push(c);
        i += 1;
        match c {
            '\\' => {
                if let Some(&escaped) = chars.get(i) {
                    out.push(escaped);
                    i += 1;
                }
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => break,
            _ => {}
        }
    }

    while i < chars.len() && chars[i].is_ascii_alphabetic() {
        out.push(chars[i]);
        i += 1;
    }
    i
}

/// Decide from the preceding output whether `/` opens a regex.
fn regex_allowed(out: &str) -> bool {
    let trimmed = out.trim_end();
    let Some(last) = trimmed.chars().last() else {
        return true;
    };
    if REGEX_PRECEDERS.contains(last) || last == '}' {
        return true;
    }
    if is_ident_char(last) {
        let word_start = trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| !is_ident_char(*c))
            .map_or(0, |(idx, c)| idx + c.len_utf8());
        return REGEX_KEYWORDS.contains(&&trimmed[word_start..]);
    }
    false
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal_survives() {
        assert_eq!(
            strip("const s = \"// not a comment\";"),
            "const s = \"// not a comment\";"
        );
        assert_eq!(strip("const s = '/* nor this */';"), "const s = '/* nor this */';");
    }

    #[test]
    fn test_comments_removed() {
        let src = "// header\nconst a = 1; // trailing\n/* block */ const b = 2;\n";
        assert_eq!(strip(src), "const a = 1;\nconst b = 2;");
    }

    #[test]
    fn test_multiline_block_comment_keeps_line_break() {
        assert_eq!(strip("a = 1 /*\n doc\n*/ b = 2"), "a = 1\nb = 2");
    }

    #[test]
    fn test_whitespace_collapsed_and_blank_lines_dropped() {
        let src = "function  f( a,\t b ) {\n\n\n    return a + b;\n}\n";
        assert_eq!(strip(src), "function f( a, b ) {\nreturn a + b;\n}");
    }

    #[test]
    fn test_template_literal_kept_verbatim() {
        let src = "const t = `line one // keep\n\n   indented`;";
        assert_eq!(strip(src), src);
    }

    #[test]
    fn test_regex_literal_kept() {
        assert_eq!(
            strip("const re = /\\/\\/ x[/]/g; // tail"),
            "const re = /\\/\\/ x[/]/g;"
        );
        assert_eq!(strip("if (x) return /a b/.test(y);"), "if (x) return /a b/.test(y);");
    }

    #[test]
    fn test_division_is_not_regex() {
        assert_eq!(strip("const half = total / 2; // ratio"), "const half = total / 2;");
    }

    #[test]
    fn test_escaped_quote_in_string() {
        assert_eq!(strip(r#"const q = "say \"//hi\""; "#), r#"const q = "say \"//hi\"";"#);
    }

    #[test]
    fn test_oxc_minifies_and_rejects_invalid() {
        let out = oxc("const answer = 40 + 2;\nconsole.log(answer);").unwrap();
        assert!(out.len() < 40);
        assert!(oxc("const = ;").is_none());
    }

    #[test]
    fn test_oxc_keeps_top_level_names() {
        let out = oxc("var __bale__ = (function () { var registry = {}; return registry; })();").unwrap();
        assert!(out.contains("__bale__"));
        assert!(!out.contains("registry"));
    }
}
