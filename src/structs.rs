//! Shared value types.

use std::fmt;

use crate::utils::dedent;

/// Simple structure to hold a shell script, mainly used as the body of make targets.
///
/// Several features may amend the same script after its definition, hence the
/// `prepend` / `append` / `set` operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new(script: &str) -> Self {
        Self { lines: Self::parse(script) }
    }

    /// Replaces the whole script.
    pub fn set(&mut self, script: &str) {
        self.lines = Self::parse(script);
    }

    /// Prepends a script to the current script.
    pub fn prepend(&mut self, script: &str) {
        let mut lines = Self::parse(script);
        lines.append(&mut self.lines);
        self.lines = lines;
    }

    /// Appends a script to the current script.
    pub fn append(&mut self, script: &str) {
        self.lines.extend(Self::parse(script));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn parse(script: &str) -> Vec<String> {
        let script = dedent(script);
        let script = script.trim();
        if script.is_empty() {
            return Vec::new();
        }
        script.split('\n').map(str::to_string).collect()
    }
}

impl From<&str> for Script {
    fn from(script: &str) -> Self {
        Script::new(script)
    }
}

impl From<String> for Script {
    fn from(script: String) -> Self {
        Script::new(&script)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}
