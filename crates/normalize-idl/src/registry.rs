//! Name-keyed tables of variable mappings and routine signatures.
//!
//! Lookups are case-insensitive. Builtins and configured customizations are
//! registered into a base registry once; every translation session works on
//! its own copy.

use std::collections::HashMap;

use crate::error::MapError;
use crate::names::VariableMapping;
use crate::signature::{FunctionSpec, ProcedureSpec, Signature};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    variables: HashMap<String, VariableMapping>,
    subroutines: HashMap<String, Signature>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the builtin routine and variable table.
    pub fn with_builtins() -> Result<Self, MapError> {
        let mut registry = Self::new();
        crate::signature::builtins::install(&mut registry)?;
        Ok(registry)
    }

    /// Register a custom variable rendering.
    pub fn register_variable(&mut self, mapping: VariableMapping) -> Result<(), MapError> {
        let key = mapping.name.to_ascii_uppercase();
        if self.variables.get(&key).is_some_and(|old| old.readonly) {
            return Err(MapError::ReadOnly {
                kind: "variable",
                name: mapping.name,
            });
        }
        tracing::debug!(name = %key, "registered variable mapping");
        self.variables.insert(key, mapping);
        Ok(())
    }

    pub fn register_procedure(&mut self, spec: ProcedureSpec) -> Result<(), MapError> {
        self.register(Signature::procedure(spec)?)
    }

    pub fn register_function(&mut self, spec: FunctionSpec) -> Result<(), MapError> {
        self.register(Signature::function(spec)?)
    }

    /// Register a signature, replacing any writable one of the same name.
    pub fn register(&mut self, signature: Signature) -> Result<(), MapError> {
        let key = signature.name().to_string();
        if self.subroutines.get(&key).is_some_and(|old| old.is_readonly()) {
            return Err(MapError::ReadOnly {
                kind: "subroutine",
                name: key,
            });
        }
        tracing::debug!(name = %key, kind = ?signature.kind(), "registered signature");
        self.subroutines.insert(key, signature);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&VariableMapping> {
        self.variables.get(&name.to_ascii_uppercase())
    }

    pub fn subroutine(&self, name: &str) -> Option<&Signature> {
        self.subroutines.get(&name.to_ascii_uppercase())
    }

    pub fn subroutine_count(&self) -> usize {
        self.subroutines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::RoutineKind;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = Registry::new();
        registry
            .register_function(FunctionSpec::new("Total").pars([1]))
            .unwrap();
        let sig = registry.subroutine("TOTAL").expect("registered");
        assert_eq!(sig.kind(), RoutineKind::Function);
        assert!(registry.subroutine("total").is_some());
        assert!(registry.subroutine("other").is_none());
    }

    #[test]
    fn test_readonly_entries_cannot_be_replaced() {
        let mut registry = Registry::with_builtins().unwrap();
        let err = registry
            .register_function(FunctionSpec::new("n_params"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "a read-only mapping for subroutine 'N_PARAMS' already exists"
        );

        registry
            .register_variable(VariableMapping::new("!FOO").target("1").readonly())
            .unwrap();
        let err = registry
            .register_variable(VariableMapping::new("!foo").target("2"))
            .unwrap_err();
        assert_eq!(
            err,
            MapError::ReadOnly {
                kind: "variable",
                name: "!foo".into()
            }
        );
    }

    #[test]
    fn test_writable_entries_are_replaced() {
        let mut registry = Registry::new();
        registry
            .register_procedure(ProcedureSpec::new("P").inputs([1]))
            .unwrap();
        registry
            .register_procedure(ProcedureSpec::new("p").inputs([1, 2]))
            .unwrap();
        assert_eq!(registry.subroutine("P").map(|s| s.npars()), Some(2));
        assert_eq!(registry.subroutine_count(), 1);
    }
}
