//! Translator configuration.
//!
//! Loaded from the first file found among:
//! 1. an explicit path (`--config`),
//! 2. `idl2py.toml` in the current directory,
//! 3. `~/.config/idl2py/config.toml` (or under `$XDG_CONFIG_HOME`).
//!
//! Example:
//! ```toml
//! int_type = "int64"
//!
//! [[variable]]
//! name = "!C"
//! target = "_c"
//! extra_code = "_c = 2.998e8"
//!
//! [[function]]
//! name = "TOTAL"
//! target = "sum"
//! pars = [1]
//!
//! [[procedure]]
//! name = "SWAP"
//! in_pars = [1, 2]
//! out_pars = [1, 2]
//! call = "{1}, {0} = {0}, {1}"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, MapError};
use crate::names::VariableMapping;
use crate::registry::Registry;
use crate::signature::{FunctionSpec, ProcedureSpec};

const PROJECT_FILE: &str = "idl2py.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Module star-imported at the top of every output file.
    pub array_module: String,
    /// One level of Python indentation.
    pub indent: String,
    /// Replaces the `!` of system variables.
    pub sysvar_prefix: String,
    /// dtype for IDL `INT`.
    pub int_type: String,
    /// dtype for IDL `UINT`.
    pub uint_type: String,
    #[serde(rename = "variable")]
    pub variables: Vec<VariableMapping>,
    #[serde(rename = "procedure")]
    pub procedures: Vec<ProcedureSpec>,
    #[serde(rename = "function")]
    pub functions: Vec<FunctionSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            array_module: "numpy".to_string(),
            indent: "    ".to_string(),
            sysvar_prefix: "_sys_".to_string(),
            int_type: "int32".to_string(),
            uint_type: "uint32".to_string(),
            variables: Vec::new(),
            procedures: Vec::new(),
            functions: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(&cwd, explicit)
    }

    /// Like [`Config::load`], resolving the project file against `dir`.
    pub fn load_from(dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }
        match Self::discover(dir) {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// First existing configuration file for `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let project = dir.join(PROJECT_FILE);
        if project.is_file() {
            return Some(project);
        }
        Self::global_config_path().filter(|path| path.is_file())
    }

    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("idl2py").join("config.toml"))
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Register the customization tables on top of `registry`.
    pub fn apply(&self, registry: &mut Registry) -> Result<(), MapError> {
        for variable in &self.variables {
            registry.register_variable(variable.clone())?;
        }
        for procedure in &self.procedures {
            registry.register_procedure(procedure.clone())?;
        }
        for function in &self.functions {
            registry.register_function(function.clone())?;
        }
        Ok(())
    }
}
