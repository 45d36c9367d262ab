//! Identifier translation and custom variable mappings.

use serde::Deserialize;

use crate::config::Config;

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Python spelling of an IDL identifier.
///
/// Lower-cases the name, swaps a leading `!` for the configured system
/// variable prefix, spells out `$`, and suffixes Python keywords with `_`.
pub fn py_name(raw: &str, config: &Config) -> String {
    let lower = raw.to_ascii_lowercase();
    let name = match lower.strip_prefix('!') {
        Some(rest) => format!("{}{rest}", config.sysvar_prefix),
        None => lower,
    };
    let name = name.replace('$', "_dollar_");
    if PYTHON_KEYWORDS.contains(&name.as_str()) {
        format!("{name}_")
    } else {
        name
    }
}

/// A custom rendering for one IDL variable, such as `!DPI` → `pi`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VariableMapping {
    pub name: String,
    /// Python expression replacing the name; defaults to [`py_name`].
    pub target: Option<String>,
    /// Module-level code the target depends on.
    pub extra_code: Option<String>,
    pub readonly: bool,
}

impl VariableMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn extra_code(mut self, code: impl Into<String>) -> Self {
        self.extra_code = Some(code.into());
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn python(&self, config: &Config) -> String {
        self.target
            .clone()
            .unwrap_or_else(|| py_name(&self.name, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_py_name() {
        let config = Config::default();
        assert_eq!(py_name("MyVar", &config), "myvar");
        assert_eq!(py_name("!D", &config), "_sys_d");
        assert_eq!(py_name("a$b", &config), "a_dollar_b");
        assert_eq!(py_name("LAMBDA", &config), "lambda_");
        assert_eq!(py_name("in", &config), "in_");
    }

    #[test]
    fn test_custom_sysvar_prefix() {
        let config = Config {
            sysvar_prefix: "sys_".into(),
            ..Config::default()
        };
        assert_eq!(py_name("!VALUES", &config), "sys_values");
    }

    #[test]
    fn test_variable_mapping_target() {
        let config = Config::default();
        assert_eq!(VariableMapping::new("!DPI").target("pi").python(&config), "pi");
        assert_eq!(VariableMapping::new("Foo").python(&config), "foo");
    }
}
