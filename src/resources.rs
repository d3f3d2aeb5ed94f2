//! Resources are project files shared by several features.
//!
//! Unlike generated files, a resource is merged with what already exists on disk, so
//! user edits survive updates. Features register their contributions during the run
//! and the registry flushes every resource once, at the very end.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;

use crate::error::Result;

/// A file assembled from the contributions of several features.
pub trait Resource: Any + fmt::Debug {
    /// Produces the new content of the file given its current content, if any.
    fn render(&self, existing: Option<&str>) -> Result<String>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

type Sections = IndexMap<String, IndexMap<String, String>>;

/// INI style file (`setup.cfg`, `tox.ini`...).
///
/// Initial values are only used when the file does not exist yet, managed values are
/// enforced on every run.
#[derive(Debug, Default, Clone)]
pub struct ConfigParserResource {
    initial_values: Vec<Sections>,
    managed_values: Vec<Sections>,
}

impl ConfigParserResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_initial_values<S, K, V>(
        &mut self,
        values: impl IntoIterator<Item = (S, Vec<(K, V)>)>,
    ) where
        S: Into<String>,
        K: Into<String>,
        V: Into<String>,
    {
        self.initial_values.push(to_sections(values));
    }

    pub fn set_managed_values<S, K, V>(
        &mut self,
        values: impl IntoIterator<Item = (S, Vec<(K, V)>)>,
    ) where
        S: Into<String>,
        K: Into<String>,
        V: Into<String>,
    {
        self.managed_values.push(to_sections(values));
    }
}

fn to_sections<S, K, V>(values: impl IntoIterator<Item = (S, Vec<(K, V)>)>) -> Sections
where
    S: Into<String>,
    K: Into<String>,
    V: Into<String>,
{
    values
        .into_iter()
        .map(|(section, pairs)| {
            (section.into(), pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
        })
        .collect()
}

fn set_values(config: &mut Sections, values: &Sections) {
    for (section, pairs) in values {
        let target = config.entry(section.clone()).or_default();
        for (key, value) in pairs {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Reads INI content. Comments and blank lines are dropped, continuation lines are
/// appended to the previous value.
fn parse_ini(content: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(name) = trimmed.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            current = Some(name.trim().to_string());
            sections.entry(name.trim().to_string()).or_default();
            last_key = None;
            continue;
        }

        let Some(section) = current.as_ref() else {
            continue;
        };
        let pairs = sections.entry(section.clone()).or_default();

        if line.starts_with(char::is_whitespace) {
            if let Some(value) = last_key.as_ref().and_then(|key| pairs.get_mut(key)) {
                value.push('\n');
                value.push_str(trimmed);
            }
            continue;
        }

        if let Some((key, value)) = trimmed.split_once(['=', ':']) {
            let key = key.trim().to_string();
            pairs.insert(key.clone(), value.trim().to_string());
            last_key = Some(key);
        }
    }
    sections
}

fn write_ini(sections: &Sections) -> String {
    let mut out = String::new();
    for (section, pairs) in sections {
        out.push_str(&format!("[{section}]\n"));
        for (key, value) in pairs {
            let value = value.replace('\n', "\n\t");
            out.push_str(&format!("{key} = {value}\n"));
        }
        out.push('\n');
    }
    out
}

impl Resource for ConfigParserResource {
    fn render(&self, existing: Option<&str>) -> Result<String> {
        let mut config = match existing {
            Some(content) => parse_ini(content),
            None => {
                let mut config = Sections::new();
                for values in &self.initial_values {
                    set_values(&mut config, values);
                }
                config
            }
        };

        for values in &self.managed_values {
            set_values(&mut config, values);
        }

        Ok(write_ini(&config))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_values_only_apply_to_new_files() {
        let mut resource = ConfigParserResource::new();
        resource.set_initial_values([("metadata", vec![("description-file", "README.rst")])]);
        resource.set_managed_values([("isort", vec![("line_length", "120")])]);

        assert_eq!(
            resource.render(None).unwrap(),
            "[metadata]\ndescription-file = README.rst\n\n[isort]\nline_length = 120\n\n"
        );

        let existing = "[isort]\nline_length = 80\nprofile = black\n";
        assert_eq!(
            resource.render(Some(existing)).unwrap(),
            "[isort]\nline_length = 120\nprofile = black\n\n"
        );
    }

    #[test]
    fn test_parse_ini_continuation_lines() {
        let sections = parse_ini("# header\n[tool]\nitems =\n    a\n    b\n");
        assert_eq!(sections["tool"]["items"], "\na\nb");
    }
}
