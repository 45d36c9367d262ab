//! Source-to-source translation of IDL programs into numpy-based Python.
//!
//! `normalize-idl` parses IDL source into a typed IR and writes it back out
//! as a Python module. It translates syntax and idiom, not the IDL runtime:
//! builtin routines are resolved through a table of known signatures.
//!
//! # Architecture
//!
//! ```text
//! IDL source ─> lexer ─> parser ─> TranslationUnit ─┬─> Display (IDL source)
//!                                   (ir)            └─> PythonWriter ─> Python
//!                                                         │
//!                                    Registry (signatures, variables)
//! ```
//!
//! Problems that do not stop translation (syntax errors, constructs with no
//! Python counterpart, bad calls to known routines) are collected as
//! [`Diagnostic`]s while a `#{ ... }#` placeholder keeps the output valid.
//!
//! # Example
//!
//! ```
//! use normalize_idl::translate;
//!
//! let result = translate("for i = 1, 10 do total += i\n").unwrap();
//! assert!(result.is_clean());
//! assert!(result.code.ends_with("for i in arange(1, 11):\n    total += i\n"));
//! ```

pub mod config;
pub mod error;
pub mod fold;
pub mod ir;
pub mod lexer;
pub mod names;
pub mod output;
pub mod parser;
pub mod registry;
pub mod session;
pub mod signature;

pub use config::Config;
pub use error::{ConfigError, Diagnostic, ErrorLog, InternalError, MapError, Severity};
pub use ir::TranslationUnit;
pub use output::PythonWriter;
pub use registry::Registry;
pub use session::Session;
pub use signature::{FunctionSpec, ProcedureSpec, Signature};

/// Output of one translation run.
#[derive(Debug, Clone)]
pub struct Translation {
    /// The Python module, always produced.
    pub code: String,
    /// Recoverable problems, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

impl Translation {
    /// True when nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// A configured translator. Holds the base registry that every run copies.
#[derive(Debug, Clone)]
pub struct Translator {
    config: Config,
    registry: Registry,
}

impl Translator {
    /// Seed the builtin table, then apply the configuration's customizations.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let mut registry = Registry::with_builtins()?;
        config.apply(&mut registry)?;
        tracing::debug!(
            subroutines = registry.subroutine_count(),
            "translator ready"
        );
        Ok(Self { config, registry })
    }

    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Translate one source file in a fresh session.
    pub fn translate(&self, source: &str) -> Result<Translation, InternalError> {
        let mut errors = ErrorLog::new();
        let unit = parser::parse(source, &mut errors)?;

        let mut session = Session::new(&self.config, self.registry.clone());
        let code = PythonWriter::emit(&unit, &mut session);

        let mut diagnostics = errors.into_vec();
        diagnostics.extend(session.errors.into_vec());
        tracing::debug!(
            lines = code.lines().count(),
            diagnostics = diagnostics.len(),
            "translation finished"
        );
        Ok(Translation { code, diagnostics })
    }
}

/// Translate with the default configuration.
pub fn translate(source: &str) -> Result<Translation, InternalError> {
    let translator = Translator {
        config: Config::default(),
        registry: Registry::with_builtins().map_err(InternalError::Builtins)?,
    };
    translator.translate(source)
}

/// Parse `source` and reconstruct it as IDL with upper-cased keywords and
/// identifiers.
pub fn render_source(source: &str) -> Result<(String, Vec<Diagnostic>), InternalError> {
    let mut errors = ErrorLog::new();
    let unit = parser::parse(source, &mut errors)?;
    Ok((unit.to_string(), errors.into_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_defaults() {
        let result = translate("x = !pi / 2\n").unwrap();
        assert!(result.is_clean());
        assert_eq!(result.code, "from numpy import *\n\nx = pi / 2\n");
    }

    #[test]
    fn test_sessions_are_independent() {
        let translator = Translator::with_defaults().unwrap();
        let first = translator
            .translate("pro helper, a\nend\n\npro main\n  helper, 1, 2\nend\n")
            .unwrap();
        assert_eq!(first.diagnostics.len(), 1);
        assert_eq!(first.diagnostics[0].severity, Severity::Mapping);

        // HELPER was only known to the first run.
        let second = translator.translate("helper, 1, 2\n").unwrap();
        assert!(second.is_clean());
        assert!(second.code.ends_with("helper(1, 2)\n"));
        assert!(translator.registry().subroutine("helper").is_none());
    }

    #[test]
    fn test_config_customizations_apply() {
        let config = Config::from_toml(
            "array_module = \"cupy\"\n[[function]]\nname = \"TOTAL\"\ntarget = \"sum\"\npars = [1]\n",
        )
        .unwrap();
        let translator = Translator::new(config).unwrap();
        let result = translator.translate("y = total(x, 2)\n").unwrap();
        assert_eq!(
            result.diagnostics[0].to_string(),
            "1: mapping error: subroutine 'TOTAL' takes at most 1 parameters (called with 2)"
        );
        assert!(result.code.starts_with("from cupy import *\n"));
    }

    #[test]
    fn test_readonly_customization_is_rejected() {
        let config = Config::from_toml("[[function]]\nname = \"KEYWORD_SET\"\n").unwrap();
        let err = Translator::new(config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Mapping(MapError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_render_source() {
        let (text, diagnostics) = render_source("if a gt 1 then b = 2\n").unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(text, "IF A GT 1 THEN B = 2\n");
    }
}
