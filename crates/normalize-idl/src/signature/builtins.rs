//! Builtin IDL routines and system variables.
//!
//! Most entries use a native emitter because numpy spells the operation
//! differently from a plain call. Anything an emitter cannot express comes
//! out as a `#{ ... }#` placeholder.

use super::{CallArgs, FunctionSpec, ProcedureSpec};
use crate::config::Config;
use crate::error::MapError;
use crate::fold::{evaluate, reduce_expression};
use crate::names::VariableMapping;
use crate::registry::Registry;

/// numpy dtype for an IDL type code, as used by `TYPE=`.
pub fn type_code(code: usize, config: &Config) -> Option<String> {
    let name = match code {
        1 => "uint8",
        2 => config.int_type.as_str(),
        3 => "int32",
        4 => "float32",
        5 => "float64",
        6 => "complex64",
        7 => "str",
        9 => "complex128",
        12 => config.uint_type.as_str(),
        13 => "uint32",
        14 => "int64",
        15 => "uint64",
        _ => return None,
    };
    Some(name.to_string())
}

/// Splits `name=value` keyword inputs; positional texts return `None`.
fn keyword(input: &str) -> Option<(&str, &str)> {
    let eq = input.find('=')?;
    let (name, value) = (&input[..eq], &input[eq + 1..]);
    let is_ident = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_ident || value.starts_with('=') {
        return None;
    }
    Some((name, value))
}

fn positional<'a>(args: &'a CallArgs<'_>) -> Vec<&'a str> {
    args.inputs
        .iter()
        .map(String::as_str)
        .filter(|input| keyword(input).is_none())
        .collect()
}

fn keywords<'a>(args: &'a CallArgs<'_>) -> Vec<(&'a str, &'a str)> {
    args.inputs.iter().filter_map(|input| keyword(input)).collect()
}

/// A flag value such as `True` or `1` is set unless it folds to zero.
fn is_set(value: &str) -> bool {
    match value.trim() {
        "False" | "None" => false,
        other => evaluate(other) != Some(0),
    }
}

fn placeholder(name: &str, args: &CallArgs<'_>) -> String {
    if args.outputs.is_empty() {
        format!("#{{ {name}({}) }}#", args.inputs.join(", "))
    } else {
        format!(
            "#{{ {name}({}) [{}] }}#",
            args.inputs.join(", "),
            args.outputs.join(", ")
        )
    }
}

/// `[d_n, ..., d_1]`: IDL lists the fastest-varying dimension first.
fn reversed(dims: &[&str]) -> String {
    dims.iter().rev().copied().collect::<Vec<_>>().join(", ")
}

fn convert(value: &str, dtype: &str) -> String {
    format!("asarray({value}).astype({dtype})")
}

pub fn install(registry: &mut Registry) -> Result<(), MapError> {
    install_variables(registry)?;
    install_seeds(registry)?;
    install_procedures(registry)?;
    install_math(registry)?;
    install_conversions(registry)?;
    install_generators(registry)?;
    install_queries(registry)?;
    Ok(())
}

fn install_variables(registry: &mut Registry) -> Result<(), MapError> {
    registry.register_variable(VariableMapping::new("!PI").target("pi"))?;
    registry.register_variable(VariableMapping::new("!DPI").target("pi"))?;
    registry.register_variable(
        VariableMapping::new("!RADEG")
            .target("_radeg")
            .extra_code("_radeg = 180.0 / pi"),
    )?;
    registry.register_variable(
        VariableMapping::new("!DTOR")
            .target("_dtor")
            .extra_code("_dtor = pi / 180.0"),
    )?;
    Ok(())
}

/// Entries the definition machinery itself relies on.
fn install_seeds(registry: &mut Registry) -> Result<(), MapError> {
    registry.register_function(
        FunctionSpec::new("N_PARAMS")
            .emit(|_| "n_params".to_string())
            .readonly(),
    )?;
    registry.register_function(
        FunctionSpec::new("KEYWORD_SET")
            .pars([1])
            .emit(|args| format!("({} is not None)", args.input(0).unwrap_or("None")))
            .readonly(),
    )?;
    Ok(())
}

fn install_procedures(registry: &mut Registry) -> Result<(), MapError> {
    registry.register_procedure(
        ProcedureSpec::new("ON_ERROR")
            .inputs([1])
            .emit(|args| format!("# ON_ERROR, {}", args.inputs.join(", "))),
    )?;
    registry.register_procedure(
        ProcedureSpec::new("ON_IOERROR")
            .inputs([1])
            .emit(|args| format!("# ON_IOERROR, {}", args.inputs.join(", "))),
    )?;
    registry.register_procedure(
        ProcedureSpec::new("CATCH")
            .inputs([1])
            .in_keys(&["CANCEL"])
            .emit(|args| format!("# CATCH, {}", args.inputs.join(", "))),
    )?;
    registry.register_procedure(
        ProcedureSpec::new("PRINT")
            .inputs(1..=100)
            .optional(100)
            .in_keys(&["FORMAT"])
            .emit(map_print),
    )?;
    registry.register_procedure(
        ProcedureSpec::new("MESSAGE")
            .inputs([1])
            .in_keys(&["INFORMATIONAL"])
            .extra_code(
                "def message(msg, informational=None):\n    \
                 if informational:\n        \
                 print(msg)\n        \
                 return\n    \
                 raise RuntimeError(msg)",
            ),
    )?;
    registry.register_procedure(
        ProcedureSpec::new("OBJ_DESTROY")
            .inputs(1..=100)
            .optional(100)
            .emit(|args| match args.inputs {
                [] => "pass".to_string(),
                inputs => format!("{} = None", inputs.join(" = ")),
            }),
    )?;
    registry.register_procedure(
        ProcedureSpec::new("POINT_LUN")
            .inputs([1, 2])
            .emit(map_point_lun),
    )?;
    Ok(())
}

fn map_print(args: &CallArgs<'_>) -> String {
    let values = positional(args).join(", ");
    match keywords(args).first() {
        Some((_, format)) => format!("print({values})  # FORMAT={format}"),
        None => format!("print({values})"),
    }
}

fn map_point_lun(args: &CallArgs<'_>) -> String {
    match (args.input(0), args.input(1)) {
        (Some(unit), Some(position)) => match unit.strip_prefix('-') {
            Some(unit) => format!("{position} = {unit}.tell()"),
            None => format!("{unit}.seek({position})"),
        },
        _ => placeholder("POINT_LUN", args),
    }
}

fn install_math(registry: &mut Registry) -> Result<(), MapError> {
    for (name, target) in [
        ("ABS", "absolute"),
        ("ACOS", "arccos"),
        ("ASIN", "arcsin"),
        ("ALOG", "log"),
        ("ALOG10", "log10"),
        ("COS", "cos"),
        ("SIN", "sin"),
        ("TAN", "tan"),
        ("EXP", "exp"),
        ("SQRT", "sqrt"),
    ] {
        registry.register_function(FunctionSpec::new(name).pars([1]).target(target))?;
    }
    registry.register_function(
        FunctionSpec::new("ATAN")
            .pars([1, 2])
            .optional(1)
            .keys(&["PHASE"])
            .emit(map_atan),
    )?;
    Ok(())
}

fn map_atan(args: &CallArgs<'_>) -> String {
    let values = positional(args);
    let phase = keywords(args)
        .iter()
        .any(|(name, value)| name.eq_ignore_ascii_case("phase") && is_set(value));
    match values.as_slice() {
        [z] if phase => format!("arctan2({z}.imag, {z}.real)"),
        [x] => format!("arctan({x})"),
        [y, x] => format!("arctan2({y}, {x})"),
        _ => placeholder("ATAN", args),
    }
}

fn install_conversions(registry: &mut Registry) -> Result<(), MapError> {
    registry.register_function(FunctionSpec::new("BYTE").pars([1]).emit(|a| conv(a, "uint8")))?;
    registry.register_function(
        FunctionSpec::new("UINT")
            .pars([1])
            .emit(|a| conv(a, &a.config.uint_type)),
    )?;
    registry.register_function(FunctionSpec::new("LONG").pars([1]).emit(|a| conv(a, "int32")))?;
    registry.register_function(FunctionSpec::new("ULONG").pars([1]).emit(|a| conv(a, "uint32")))?;
    registry.register_function(FunctionSpec::new("LONG64").pars([1]).emit(|a| conv(a, "int64")))?;
    registry
        .register_function(FunctionSpec::new("ULONG64").pars([1]).emit(|a| conv(a, "uint64")))?;
    registry
        .register_function(FunctionSpec::new("FLOAT").pars([1]).emit(|a| conv(a, "float32")))?;
    registry
        .register_function(FunctionSpec::new("DOUBLE").pars([1]).emit(|a| conv(a, "float64")))?;
    registry.register_function(
        FunctionSpec::new("FIX")
            .pars(1..=10)
            .optional(9)
            .keys(&["TYPE", "PRINT"])
            .emit(map_fix),
    )?;
    registry.register_function(
        FunctionSpec::new("COMPLEX")
            .pars(1..=10)
            .optional(10)
            .keys(&["DOUBLE"])
            .emit(|a| complex_conv("complex64", a)),
    )?;
    registry.register_function(
        FunctionSpec::new("DCOMPLEX")
            .pars(1..=9)
            .optional(9)
            .emit(|a| complex_conv("complex128", a)),
    )?;
    registry.register_function(
        FunctionSpec::new("STRING")
            .pars(1..=100)
            .optional(100)
            .keys(&["AM_PM", "DAYS_OF_WEEK", "FORMAT", "MONTHS", "PRINT"])
            .emit(|args| match args.inputs {
                [value] if keyword(value).is_none() => format!("str({value})"),
                _ => placeholder("STRING", args),
            }),
    )?;
    Ok(())
}

fn conv(args: &CallArgs<'_>, dtype: &str) -> String {
    match args.input(0) {
        Some(value) => convert(value, dtype),
        None => placeholder("CONVERT", args),
    }
}

fn map_fix(args: &CallArgs<'_>) -> String {
    let mut dtype = Some(args.config.int_type.clone());
    for (name, value) in keywords(args) {
        if name.eq_ignore_ascii_case("type") {
            dtype = value
                .trim()
                .parse()
                .ok()
                .and_then(|code| type_code(code, args.config));
        }
    }
    match (positional(args).as_slice(), dtype.as_deref()) {
        ([value], Some("str")) => format!("str({value})"),
        ([value], Some(dtype)) => convert(value, dtype),
        _ => placeholder("FIX", args),
    }
}

fn complex_conv(dtype: &str, args: &CallArgs<'_>) -> String {
    let double = keywords(args)
        .iter()
        .any(|(name, value)| name.eq_ignore_ascii_case("double") && is_set(value));
    let (dtype, part) = if double || dtype == "complex128" {
        ("complex128", "float64")
    } else {
        ("complex64", "float32")
    };
    match positional(args).as_slice() {
        [value] => convert(value, dtype),
        [re, im] => format!("({} + 1j*{})", convert(re, part), convert(im, part)),
        _ => placeholder("COMPLEX", args),
    }
}

fn install_generators(registry: &mut Registry) -> Result<(), MapError> {
    let arrays: [(&str, fn(&CallArgs<'_>) -> String); 11] = [
        ("BYTARR", |a| zeros(a, "uint8")),
        ("INTARR", |a| zeros(a, "int16")),
        ("UINTARR", |a| zeros(a, "uint16")),
        ("LONARR", |a| zeros(a, "int32")),
        ("ULONARR", |a| zeros(a, "uint32")),
        ("LON64ARR", |a| zeros(a, "int64")),
        ("ULON64ARR", |a| zeros(a, "uint64")),
        ("FLTARR", |a| zeros(a, "float32")),
        ("DBLARR", |a| zeros(a, "float64")),
        ("COMPLEXARR", |a| zeros(a, "complex64")),
        ("DCOMPLEXARR", |a| zeros(a, "complex128")),
    ];
    for (name, emit) in arrays {
        registry.register_function(FunctionSpec::new(name).pars(1..=8).optional(7).emit(emit))?;
    }

    registry.register_function(
        FunctionSpec::new("MAKE_ARRAY")
            .pars(1..=9)
            .optional(9)
            .keys(&[
                "BYTE",
                "COMPLEX",
                "DCOMPLEX",
                "DOUBLE",
                "FLOAT",
                "L64",
                "INTEGER",
                "LONG",
                "UINT",
                "UL64",
                "ULONG",
                "TYPE",
                "SIZE",
                "DIMENSION",
                "INDEX",
                "VALUE",
                "NOZERO",
                "OBJ",
                "PTR",
            ])
            .emit(map_make_array),
    )?;

    registry.register_function(
        FunctionSpec::new("INDGEN")
            .pars(1..=8)
            .optional(8)
            .keys(&[
                "BYTE", "COMPLEX", "DCOMPLEX", "DOUBLE", "FLOAT", "L64", "LONG", "STRING",
                "UINT", "UL64", "ULONG", "TYPE",
            ])
            .emit(map_indgen),
    )?;
    let indgens: [(&str, fn(&CallArgs<'_>) -> String); 10] = [
        ("BINDGEN", |a| indgen(a, "uint8")),
        ("UINDGEN", |a| indgen(a, &a.config.uint_type)),
        ("LINDGEN", |a| indgen(a, "int32")),
        ("ULINDGEN", |a| indgen(a, "uint32")),
        ("L64INDGEN", |a| indgen(a, "int64")),
        ("UL64INDGEN", |a| indgen(a, "uint64")),
        ("FINDGEN", |a| indgen(a, "float32")),
        ("DINDGEN", |a| indgen(a, "float64")),
        ("CINDGEN", |a| indgen(a, "complex64")),
        ("DCINDGEN", |a| indgen(a, "complex128")),
    ];
    for (name, emit) in indgens {
        registry.register_function(FunctionSpec::new(name).pars(1..=8).optional(7).emit(emit))?;
    }

    registry.register_function(
        FunctionSpec::new("REPLICATE")
            .pars(1..=9)
            .optional(7)
            .emit(|args| match args.inputs.split_first() {
                Some((value, dims)) if !dims.is_empty() => {
                    let dims: Vec<&str> = dims.iter().map(String::as_str).collect();
                    format!("({value})*ones([{}])", reversed(&dims))
                }
                _ => placeholder("REPLICATE", args),
            }),
    )?;
    registry.register_function(
        FunctionSpec::new("RANDOMN")
            .pars(1..=9)
            .optional(8)
            .emit(|a| random(a, "normal")),
    )?;
    registry.register_function(
        FunctionSpec::new("RANDOMU")
            .pars(1..=9)
            .optional(8)
            .emit(|a| random(a, "uniform")),
    )?;
    Ok(())
}

fn zeros(args: &CallArgs<'_>, dtype: &str) -> String {
    let dims: Vec<&str> = args.inputs.iter().map(String::as_str).collect();
    format!("zeros([{}], dtype={dtype})", reversed(&dims))
}

fn map_make_array(args: &CallArgs<'_>) -> String {
    let config = args.config;
    let mut dtype = "float32".to_string();
    let mut dims: Option<String> = None;
    let mut value = "0".to_string();
    for (name, val) in keywords(args) {
        let flag = match name.to_ascii_lowercase().as_str() {
            "byte" => "uint8",
            "complex" => "complex64",
            "dcomplex" => "complex128",
            "double" => "float64",
            "float" => "float32",
            "l64" => "int64",
            "integer" => config.int_type.as_str(),
            "long" => "int32",
            "uint" => config.uint_type.as_str(),
            "ul64" => "uint64",
            "ulong" => "uint32",
            "type" => match val.trim().parse().ok().and_then(|c| type_code(c, config)) {
                Some(code) if code != "str" => {
                    dtype = code;
                    continue;
                }
                _ => return placeholder("MAKE_ARRAY", args),
            },
            "dimension" => {
                dims = Some(format!("asarray({val})[::-1]"));
                continue;
            }
            "value" => {
                value = val.to_string();
                continue;
            }
            "nozero" => continue,
            _ => return placeholder("MAKE_ARRAY", args),
        };
        if is_set(val) {
            dtype = flag.to_string();
        }
    }

    let dims = match dims {
        Some(dims) => dims,
        None => {
            let shape = positional(args);
            if shape.is_empty() {
                return placeholder("MAKE_ARRAY", args);
            }
            format!("[{}]", reversed(&shape))
        }
    };
    match value.trim() {
        "0" => format!("zeros({dims}, dtype={dtype})"),
        "1" => format!("ones({dims}, dtype={dtype})"),
        other => format!("(({other})*ones({dims}, dtype={dtype}))"),
    }
}

fn map_indgen(args: &CallArgs<'_>) -> String {
    let config = args.config;
    let kws = keywords(args);
    let dtype = match kws.as_slice() {
        [] => config.int_type.clone(),
        [(name, value)] => match name.to_ascii_uppercase().as_str() {
            "TYPE" => match value.trim().parse().ok().and_then(|c| type_code(c, config)) {
                Some(dtype) if dtype != "str" => dtype,
                _ => return placeholder("INDGEN", args),
            },
            "STRING" => return placeholder("INDGEN", args),
            key => {
                let flagged = match key {
                    "BYTE" => "uint8",
                    "COMPLEX" => "complex64",
                    "DCOMPLEX" => "complex128",
                    "DOUBLE" => "float64",
                    "FLOAT" => "float32",
                    "L64" => "int64",
                    "LONG" => "int32",
                    "UINT" => config.uint_type.as_str(),
                    "UL64" => "uint64",
                    "ULONG" => "uint32",
                    _ => return placeholder("INDGEN", args),
                };
                if is_set(value) {
                    flagged.to_string()
                } else {
                    config.int_type.clone()
                }
            }
        },
        _ => return placeholder("INDGEN", args),
    };
    let dims = positional(args);
    arange(args, &dims, &dtype)
}

fn indgen(args: &CallArgs<'_>, dtype: &str) -> String {
    arange(args, &positional(args), dtype)
}

fn arange(args: &CallArgs<'_>, dims: &[&str], dtype: &str) -> String {
    match dims {
        [] => placeholder("INDGEN", args),
        [n] => format!("arange({n}, dtype={dtype})"),
        dims => {
            let product = dims
                .iter()
                .map(|d| format!("({d})"))
                .collect::<Vec<_>>()
                .join("*");
            format!(
                "arange({}, dtype={dtype}).reshape({})",
                reduce_expression(&product),
                reversed(dims)
            )
        }
    }
}

fn random(args: &CallArgs<'_>, distribution: &str) -> String {
    let dims: Vec<&str> = args.inputs.iter().skip(1).map(String::as_str).collect();
    match dims.as_slice() {
        [] => format!("random.{distribution}(0, 1)"),
        [n] => format!("random.{distribution}(0, 1, ({n},))"),
        dims => format!("random.{distribution}(0, 1, ({}))", reversed(dims)),
    }
}

fn install_queries(registry: &mut Registry) -> Result<(), MapError> {
    registry.register_function(
        FunctionSpec::new("N_ELEMENTS")
            .pars([1])
            .emit(|args| format!("size({})", args.input(0).unwrap_or("None"))),
    )?;
    registry.register_function(
        FunctionSpec::new("WHERE")
            .pars([1, 2])
            .optional(1)
            .emit(|args| match args.inputs {
                [mask] => format!("flatnonzero({mask})"),
                _ => placeholder("WHERE", args),
            }),
    )?;
    registry.register_function(
        FunctionSpec::new("ARG_PRESENT")
            .pars([1])
            .emit(|args| format!("({} is not None)", args.input(0).unwrap_or("None"))),
    )?;
    registry.register_function(
        FunctionSpec::new("PTR_NEW")
            .pars([1, 2])
            .optional(2)
            .keys(&["ALLOCATE_HEAP", "NO_COPY"])
            .emit(|args| match positional(args).first() {
                Some(value) => value.to_string(),
                None => "None".to_string(),
            }),
    )?;
    registry.register_function(
        FunctionSpec::new("OBJ_NEW")
            .pars(1..=100)
            .optional(100)
            .emit(map_obj_new),
    )?;
    registry.register_function(
        FunctionSpec::new("MIN")
            .pars([1, 2])
            .optional(1)
            .keys(&["ABSOLUTE", "DIMENSION", "NAN", "MAX", "SUBSCRIPT_MAX"])
            .emit(|a| extremum(a, "MIN", "min")),
    )?;
    registry.register_function(
        FunctionSpec::new("MAX")
            .pars([1, 2])
            .optional(1)
            .keys(&["ABSOLUTE", "DIMENSION", "NAN", "MIN", "SUBSCRIPT_MIN"])
            .emit(|a| extremum(a, "MAX", "max")),
    )?;
    Ok(())
}

fn map_obj_new(args: &CallArgs<'_>) -> String {
    let Some((class, rest)) = args.inputs.split_first() else {
        return "None".to_string();
    };
    let name = class
        .strip_prefix(['\'', '"'])
        .and_then(|inner| inner.strip_suffix(['\'', '"']));
    match name {
        Some(name)
            if !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            format!("{name}({})", rest.join(", "))
        }
        _ => placeholder("OBJ_NEW", args),
    }
}

fn extremum(args: &CallArgs<'_>, name: &str, op: &str) -> String {
    match (positional(args).as_slice(), keywords(args).as_slice()) {
        ([value], []) => format!("asarray({value}).{op}()"),
        ([value], [(key, flag)]) if key.eq_ignore_ascii_case("nan") && is_set(flag) => {
            format!("nan{op}({value})")
        }
        _ => placeholder(name, args),
    }
}
