//! Per-run translation state.

use crate::config::Config;
use crate::error::ErrorLog;
use crate::ir::RoutineKind;
use crate::names::py_name;
use crate::registry::Registry;

/// Deduplicated, insertion-ordered module-level code fragments.
#[derive(Debug, Clone, Default)]
pub struct ExtraCode {
    items: Vec<String>,
}

impl ExtraCode {
    pub fn add(&mut self, code: &str) {
        let code = code.trim();
        if code.is_empty() || self.items.iter().any(|item| item == code) {
            return;
        }
        self.items.push(code.to_string());
    }

    pub fn extend<'a>(&mut self, codes: impl IntoIterator<Item = &'a String>) {
        for code in codes {
            self.add(code);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn render(&self) -> String {
        self.items.join("\n\n")
    }
}

/// Everything one translation run reads and writes besides the tree.
///
/// The registry is a copy of the translator's base registry, so routines
/// defined by this file are forgotten when the session ends.
pub struct Session<'a> {
    pub config: &'a Config,
    pub registry: Registry,
    pub errors: ErrorLog,
    pub extra_code: ExtraCode,
    /// Kind of the routine currently being translated, if any.
    pub routine: Option<RoutineKind>,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a Config, registry: Registry) -> Self {
        Self {
            config,
            registry,
            errors: ErrorLog::new(),
            extra_code: ExtraCode::default(),
            routine: None,
        }
    }

    /// Python text for a variable, honoring custom mappings.
    pub fn variable(&mut self, raw: &str) -> String {
        match self.registry.variable(raw) {
            Some(mapping) => {
                if let Some(code) = &mapping.extra_code {
                    self.extra_code.add(code);
                }
                mapping.python(self.config)
            }
            None => py_name(raw, self.config),
        }
    }

    pub fn py_name(&self, raw: &str) -> String {
        py_name(raw, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::VariableMapping;

    #[test]
    fn test_extra_code_dedup() {
        let mut extra = ExtraCode::default();
        extra.add("  import os\n");
        extra.add("import os");
        extra.add("");
        extra.add("x = 1");
        assert_eq!(extra.render(), "import os\n\nx = 1");
    }

    #[test]
    fn test_variable_mapping_records_extra_code() {
        let config = Config::default();
        let mut registry = Registry::new();
        registry
            .register_variable(
                VariableMapping::new("!RADEG")
                    .target("_radeg")
                    .extra_code("_radeg = 180.0 / pi"),
            )
            .unwrap();
        let mut session = Session::new(&config, registry);
        assert_eq!(session.variable("x"), "x");
        assert!(session.extra_code.is_empty());
        assert_eq!(session.variable("!radeg"), "_radeg");
        assert_eq!(session.extra_code.render(), "_radeg = 180.0 / pi");
    }
}
