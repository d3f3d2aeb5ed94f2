//! Small text helpers shared by the features and the Makefile model.

use regex::Regex;
use std::sync::OnceLock;

/// Python keywords, which are never valid package names.
const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Removes the whitespace prefix common to every non blank line.
///
/// Lines made only of whitespace are normalized to empty lines and do not take part
/// in the computation of the common prefix.
pub fn dedent(text: &str) -> String {
    let prefix = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .fold(None::<&str>, |common, indent| match common {
            None => Some(indent),
            Some(common) => {
                let len = common
                    .char_indices()
                    .zip(indent.chars())
                    .take_while(|((_, a), b)| a == b)
                    .last()
                    .map(|((i, c), _)| i + c.len_utf8())
                    .unwrap_or(0);
                Some(&common[..len])
            }
        })
        .unwrap_or("");

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.strip_prefix(prefix).unwrap_or(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalizes generated content: dedented, stripped, ending with exactly one newline.
pub fn format_file_content(content: &str) -> String {
    format!("{}\n", dedent(content).trim())
}

/// Tells whether `name` is a valid (non keyword) python identifier.
pub fn is_identifier(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let re = IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
    re.is_match(name) && !KEYWORDS.contains(&name)
}

/// Tells whether `name` is a valid dotted package name (`foo`, `foo.bar`).
pub fn is_package_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

/// Comment block written at the top of files that are regenerated on every update.
pub fn get_override_warning_banner() -> String {
    [
        format!("# Generated by Medikit {}.", env!("CARGO_PKG_VERSION")),
        "# All changes will be overriden.".to_string(),
        "# Edit Projectfile and run \u{201c}make update\u{201d} \
         (or \u{201c}medikit update\u{201d}) to regenerate."
            .to_string(),
    ]
    .join("\n")
}

/// Replaces `{key}` placeholders with the matching string values of `values`.
///
/// Unknown placeholders are left untouched.
pub fn format_with(template: &str, values: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut result = template.to_string();
    for (key, value) in values {
        let replacement = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        result = result.replace(&format!("{{{key}}}"), &replacement);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedent() {
        assert_eq!(dedent("    a\n      b\n    c"), "a\n  b\nc");
        assert_eq!(dedent("\n    a\n   \n    b\n"), "\na\n\nb\n");
        assert_eq!(dedent("a\n\tb"), "a\n\tb");
    }

    #[test]
    fn test_format_file_content() {
        assert_eq!(format_file_content("\n    foo\n    bar\n    "), "foo\nbar\n");
        assert_eq!(format_file_content(""), "\n");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("foo_bar"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier("1foo"));
        assert!(!is_identifier("foo-bar"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier(""));
        assert!(is_package_name("foo.bar"));
        assert!(!is_package_name("foo..bar"));
    }

    #[test]
    fn test_format_with() {
        let mut meta = serde_json::Map::new();
        meta.insert("version".to_string(), serde_json::json!("1.2.3"));
        assert_eq!(format_with("Release: {version}", &meta), "Release: 1.2.3");
        assert_eq!(format_with("Release: {other}", &meta), "Release: {other}");
    }
}
