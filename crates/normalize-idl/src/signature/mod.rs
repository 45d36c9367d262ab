//! Subroutine signatures: arity and keyword contracts plus code generation.
//!
//! A [`Signature`] knows which numbered parameter slots of an IDL routine are
//! inputs, outputs or both, how many trailing slots are optional, and which
//! keywords it accepts. From that it generates the Python `def` skeleton for
//! a definition ([`Signature::define`]) and the Python call for a call site
//! ([`Signature::call`]), emulating IDL's output parameters with tuple
//! returns.

pub mod builtins;

use serde::Deserialize;

use crate::config::Config;
use crate::error::MapError;
use crate::ir::RoutineKind;
use crate::names::py_name;

/// Resolved call-site texts handed to a custom emitter.
#[derive(Debug, Clone, Copy)]
pub struct CallArgs<'a> {
    pub inputs: &'a [String],
    pub outputs: &'a [String],
    pub config: &'a Config,
}

impl CallArgs<'_> {
    pub fn input(&self, index: usize) -> Option<&str> {
        self.inputs.get(index).map(String::as_str)
    }
}

pub type NativeEmitter = fn(&CallArgs<'_>) -> String;

/// A call-site argument, by its index among the positional arguments or
/// among the keyword arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRef {
    Positional(usize),
    Keyword(usize),
}

/// Code for one call from [`Signature::bind`].
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCall {
    pub code: String,
    /// Arguments bound to an output-only slot or keyword that cannot
    /// receive the value.
    pub discarded: Vec<ArgRef>,
}

/// How a call is rendered once its arguments are resolved.
#[derive(Debug, Clone)]
pub enum Emitter {
    /// `outputs = name(inputs)`
    Default,
    Native(NativeEmitter),
    /// Text with `{args}`, `{outputs}` and `{0}`, `{1}`, ... substituted.
    Template(String),
}

/// Registration data for a procedure; also the shape of a `[[procedure]]`
/// configuration table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcedureSpec {
    pub name: String,
    pub target: Option<String>,
    pub in_pars: Vec<usize>,
    pub out_pars: Vec<usize>,
    pub optional: usize,
    pub in_keys: Vec<String>,
    pub out_keys: Vec<String>,
    /// Call template, see [`Emitter::Template`].
    pub call: Option<String>,
    pub extra_code: Vec<String>,
    pub readonly: bool,
    #[serde(skip)]
    pub emitter: Option<NativeEmitter>,
}

impl ProcedureSpec {
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

    pub fn inputs(mut self, pars: impl IntoIterator<Item = usize>) -> Self {
        self.in_pars = pars.into_iter().collect();
        self
    }

    pub fn outputs(mut self, pars: impl IntoIterator<Item = usize>) -> Self {
        self.out_pars = pars.into_iter().collect();
        self
    }

    pub fn optional(mut self, count: usize) -> Self {
        self.optional = count;
        self
    }

    pub fn in_keys(mut self, keys: &[&str]) -> Self {
        self.in_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn out_keys(mut self, keys: &[&str]) -> Self {
        self.out_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn emit(mut self, emitter: NativeEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.call = Some(template.into());
        self
    }

    pub fn extra_code(mut self, code: impl Into<String>) -> Self {
        self.extra_code.push(code.into());
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

/// Registration data for a function. Functions only take inputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionSpec {
    pub name: String,
    pub target: Option<String>,
    pub pars: Vec<usize>,
    pub optional: usize,
    pub keys: Vec<String>,
    pub call: Option<String>,
    pub extra_code: Vec<String>,
    pub readonly: bool,
    #[serde(skip)]
    pub emitter: Option<NativeEmitter>,
}

impl FunctionSpec {
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

    pub fn pars(mut self, pars: impl IntoIterator<Item = usize>) -> Self {
        self.pars = pars.into_iter().collect();
        self
    }

    pub fn optional(mut self, count: usize) -> Self {
        self.optional = count;
        self
    }

    pub fn keys(mut self, keys: &[&str]) -> Self {
        self.keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn emit(mut self, emitter: NativeEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn extra_code(mut self, code: impl Into<String>) -> Self {
        self.extra_code.push(code.into());
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

impl From<FunctionSpec> for ProcedureSpec {
    fn from(spec: FunctionSpec) -> Self {
        ProcedureSpec {
            name: spec.name,
            target: spec.target,
            in_pars: spec.pars,
            out_pars: Vec::new(),
            optional: spec.optional,
            in_keys: spec.keys,
            out_keys: Vec::new(),
            call: spec.call,
            extra_code: spec.extra_code,
            readonly: spec.readonly,
            emitter: spec.emitter,
        }
    }
}

/// The validated contract of one routine.
#[derive(Debug, Clone)]
pub struct Signature {
    name: String,
    target: Option<String>,
    kind: RoutineKind,
    in_pars: Vec<usize>,
    out_pars: Vec<usize>,
    npars: usize,
    optional: usize,
    in_keys: Vec<String>,
    out_keys: Vec<String>,
    all_keys: Vec<String>,
    emitter: Emitter,
    extra_code: Vec<String>,
    readonly: bool,
}

impl Signature {
    pub fn new(kind: RoutineKind, spec: ProcedureSpec) -> Result<Self, MapError> {
        if kind == RoutineKind::Function {
            if !spec.out_pars.is_empty() {
                return Err(MapError::FunctionOutputs);
            }
            if !spec.out_keys.is_empty() {
                return Err(MapError::FunctionOutputKeywords);
            }
        }

        let mut pars = spec.in_pars.clone();
        pars.extend(spec.out_pars.iter().filter(|p| !spec.in_pars.contains(p)));
        pars.sort_unstable();
        if pars.iter().enumerate().any(|(i, &p)| p != i + 1) {
            return Err(MapError::InvalidParameters(pars));
        }

        let in_keys: Vec<String> = spec.in_keys.iter().map(|k| k.to_ascii_uppercase()).collect();
        let out_keys: Vec<String> = spec
            .out_keys
            .iter()
            .map(|k| k.to_ascii_uppercase())
            .collect();
        let mut all_keys = in_keys.clone();
        all_keys.extend(out_keys.iter().filter(|k| !in_keys.contains(k)).cloned());

        let emitter = match (spec.emitter, spec.call) {
            (Some(native), _) => Emitter::Native(native),
            (None, Some(template)) => Emitter::Template(template),
            (None, None) => Emitter::Default,
        };

        Ok(Self {
            name: spec.name.to_ascii_uppercase(),
            target: spec.target,
            kind,
            in_pars: spec.in_pars,
            out_pars: spec.out_pars,
            npars: pars.len(),
            optional: spec.optional,
            in_keys,
            out_keys,
            all_keys,
            emitter,
            extra_code: spec.extra_code,
            readonly: spec.readonly,
        })
    }

    pub fn procedure(spec: ProcedureSpec) -> Result<Self, MapError> {
        Self::new(RoutineKind::Procedure, spec)
    }

    pub fn function(spec: FunctionSpec) -> Result<Self, MapError> {
        Self::new(RoutineKind::Function, spec.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RoutineKind {
        self.kind
    }

    pub fn npars(&self) -> usize {
        self.npars
    }

    pub fn nrequired(&self) -> usize {
        self.npars.saturating_sub(self.optional)
    }

    pub fn keywords(&self) -> &[String] {
        &self.all_keys
    }

    pub fn extra_code(&self) -> &[String] {
        &self.extra_code
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn target_name(&self, config: &Config) -> String {
        self.target
            .clone()
            .unwrap_or_else(|| py_name(&self.name, config))
    }

    fn is_input(&self, index: usize) -> bool {
        self.in_pars.contains(&(index + 1))
    }

    fn is_output(&self, index: usize) -> bool {
        self.out_pars.contains(&(index + 1))
    }

    /// True when the Python version returns a variable-length tuple.
    pub fn has_optional_outputs(&self) -> bool {
        self.kind == RoutineKind::Procedure
            && ((self.nrequired()..self.npars).any(|i| self.is_output(i))
                || !self.out_keys.is_empty())
    }

    /// Builds the `def` line and the prologue of the body.
    ///
    /// `params` are the Python names of the declared parameters. Each keyword
    /// pair is the IDL keyword name and the Python name of the variable bound
    /// to it.
    pub fn define(
        &self,
        params: &[String],
        keywords: &[(String, String)],
        config: &Config,
    ) -> Result<(String, String), MapError> {
        if params.len() != self.npars {
            return Err(MapError::DefinitionArity {
                name: self.name.clone(),
                expected: self.npars,
                got: params.len(),
            });
        }

        let mut expected = self.all_keys.clone();
        expected.sort();
        let mut got: Vec<String> = keywords.iter().map(|(k, _)| k.to_ascii_uppercase()).collect();
        got.sort();
        if got != expected {
            return Err(MapError::DefinitionKeywords {
                name: self.name.clone(),
                expected,
                got,
            });
        }

        let nrequired = self.nrequired();
        let pick = |range: std::ops::Range<usize>, keep: &dyn Fn(usize) -> bool| -> Vec<String> {
            range
                .filter(|&i| keep(i))
                .map(|i| params[i].clone())
                .collect()
        };

        let in_required = pick(0..nrequired, &|i| self.is_input(i));
        let in_optional = pick(nrequired..self.npars, &|i| {
            self.is_input(i) || self.is_output(i)
        });
        let external: Vec<String> = keywords.iter().map(|(k, _)| py_name(k, config)).collect();

        let mut header_params = in_required;
        header_params.extend(in_optional.iter().map(|p| format!("{p}=None")));
        header_params.extend(external.iter().map(|k| format!("{k}=None")));
        let header = format!(
            "def {}({}):",
            self.target_name(config),
            header_params.join(", ")
        );

        let mut body = vec![if in_optional.is_empty() {
            format!("n_params = {}", self.npars)
        } else {
            format!(
                "n_params = {} - [{}].count(None)",
                self.npars,
                in_optional.join(", ")
            )
        }];

        let out = pick(0..nrequired, &|i| self.is_output(i));
        for par in pick(0..nrequired, &|i| self.is_output(i) && !self.is_input(i)) {
            body.push(format!("{par} = None"));
        }
        for (outer, (_, internal)) in external.iter().zip(keywords) {
            if outer != internal {
                body.push(format!("{internal} = {outer}"));
            }
        }

        let mut out_optional = pick(nrequired..self.npars, &|i| self.is_output(i));
        out_optional.extend(
            keywords
                .iter()
                .filter(|(k, _)| self.out_keys.contains(&k.to_ascii_uppercase()))
                .map(|(_, internal)| internal.clone()),
        );
        if !out_optional.is_empty() {
            let trailing = if out_optional.len() == 1 { "," } else { "" };
            body.push(format!("_opt = ({}{trailing})", out_optional.join(", ")));
        }

        if self.kind == RoutineKind::Procedure {
            if out_optional.is_empty() {
                match out.as_slice() {
                    [] => body.push("def _ret():  return None".to_string()),
                    [single] => body.push(format!("def _ret():  return {single}")),
                    several => body.push(format!("def _ret():  return ({})", several.join(", "))),
                }
            } else {
                let tab = &config.indent;
                body.push("def _ret():".to_string());
                body.push(format!("{tab}_rv = [{}]", out.join(", ")));
                body.push(format!(
                    "{tab}_rv += [_v for _d, _v in zip(_opt, [{}]) if _d is not None]",
                    out_optional.join(", ")
                ));
                body.push(format!("{tab}return tuple(_rv)"));
            }
        }

        let mut prologue = body.join("\n");
        prologue.push('\n');
        Ok((header, prologue))
    }

    /// Builds the Python code for a call.
    ///
    /// `args` are the Python texts of the positional arguments. Each keyword
    /// pair is the keyword name as written (possibly abbreviated) and the
    /// Python text of its value.
    pub fn call(
        &self,
        args: &[String],
        keywords: &[(String, String)],
        config: &Config,
    ) -> Result<String, MapError> {
        self.bind(args, keywords, &|_: ArgRef| true, config)
            .map(|call| call.code)
    }

    /// Like [`Signature::call`], but only arguments accepted by `assignable`
    /// become assignment targets. The others are bound to `_`, and those
    /// whose slot or keyword is output-only are listed in
    /// [`BoundCall::discarded`].
    pub fn bind(
        &self,
        args: &[String],
        keywords: &[(String, String)],
        assignable: &dyn Fn(ArgRef) -> bool,
        config: &Config,
    ) -> Result<BoundCall, MapError> {
        let given = args.len();
        let nrequired = self.nrequired();
        if given > self.npars {
            return Err(MapError::TooManyArguments {
                name: self.name.clone(),
                max: self.npars,
                got: given,
            });
        }
        if given < nrequired {
            return Err(MapError::TooFewArguments {
                name: self.name.clone(),
                min: nrequired,
                got: given,
            });
        }

        let mut discarded = Vec::new();
        let mut target = |arg: ArgRef, text: &str, input: bool| {
            if assignable(arg) {
                return text.to_string();
            }
            if !input {
                discarded.push(arg);
            }
            "_".to_string()
        };

        let mut inputs: Vec<String> = (0..nrequired.min(given))
            .filter(|&i| self.is_input(i))
            .map(|i| args[i].clone())
            .collect();
        for i in nrequired..given {
            if self.is_input(i) {
                inputs.push(args[i].clone());
            } else if self.is_output(i) {
                inputs.push("True".to_string());
            }
        }
        let mut outputs: Vec<String> = (0..given)
            .filter(|&i| self.is_output(i))
            .map(|i| target(ArgRef::Positional(i), &args[i], self.is_input(i)))
            .collect();

        for (index, (name, value)) in keywords.iter().enumerate() {
            let keyword = self.resolve_keyword(name)?;
            let py = py_name(keyword, config);
            let is_input = self.in_keys.iter().any(|k| k == keyword);
            if is_input {
                inputs.push(format!("{py}={value}"));
            }
            if self.out_keys.iter().any(|k| k == keyword) {
                if !is_input {
                    inputs.push(format!("{py}=True"));
                }
                outputs.push(target(ArgRef::Keyword(index), value, is_input));
            }
        }

        let call_args = CallArgs {
            inputs: &inputs,
            outputs: &outputs,
            config,
        };
        let code = match &self.emitter {
            Emitter::Native(emit) => emit(&call_args),
            Emitter::Template(template) => expand_template(template, &call_args),
            Emitter::Default => {
                let call = format!("{}({})", self.target_name(config), inputs.join(", "));
                match outputs.as_slice() {
                    targets if targets.iter().all(|t| t == "_") => call,
                    [single] if self.has_optional_outputs() => format!("{single}, = {call}"),
                    several => format!("{} = {call}", several.join(", ")),
                }
            }
        };
        Ok(BoundCall { code, discarded })
    }

    /// Matches a possibly abbreviated keyword against the full keyword set.
    fn resolve_keyword(&self, name: &str) -> Result<&str, MapError> {
        let upper = name.to_ascii_uppercase();
        let matches: Vec<&String> = self
            .all_keys
            .iter()
            .filter(|k| k.starts_with(&upper))
            .collect();
        match matches.as_slice() {
            [] => Err(MapError::UnknownKeyword {
                keyword: upper,
                name: self.name.clone(),
            }),
            [single] => Ok(single.as_str()),
            several => several
                .iter()
                .find(|k| **k == &upper)
                .map(|k| k.as_str())
                .ok_or_else(|| MapError::AmbiguousKeyword {
                    keyword: upper.clone(),
                    name: self.name.clone(),
                    matches: several.iter().map(|k| k.to_string()).collect(),
                }),
        }
    }
}

fn expand_template(template: &str, args: &CallArgs<'_>) -> String {
    let mut out = String::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after[..close];
        match key {
            "args" => out.push_str(&args.inputs.join(", ")),
            "outputs" => out.push_str(&args.outputs.join(", ")),
            _ => match key.parse::<usize>() {
                Ok(index) => out.push_str(args.input(index).unwrap_or("")),
                Err(_) => out.push_str(&rest[open..open + close + 2]),
            },
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
