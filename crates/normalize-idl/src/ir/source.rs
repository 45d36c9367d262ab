//! IDL source reconstruction.
//!
//! Keywords and identifiers come out upper-cased, spacing is normalized and
//! newline runs (with their comments) are reproduced. Re-parsing the output
//! yields the same token sequence.

use std::fmt::{self, Display, Formatter};

use super::*;

const IDL_TAB: &str = "    ";

/// Prefixes every non-empty line of `text` with `pad`.
pub fn indent(text: &str, pad: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn join<T: Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl Display for TranslationUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(leading) = &self.leading {
            write!(f, "{leading}")?;
        }
        match &self.body {
            UnitBody::Program(routines) => {
                for routine in routines {
                    write!(f, "{routine}")?;
                }
                Ok(())
            }
            UnitBody::Statements(list) => write!(f, "{list}"),
        }
    }
}

impl Display for SubroutineDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.keyword(), self.name)?;
        if !self.params.is_empty() {
            write!(f, ", {}", join(&self.params, ", "))?;
        }
        write!(
            f,
            "{}{}END{}",
            self.header_newline,
            indent(&self.body.to_string(), IDL_TAB),
            self.end_newline
        )
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Positional(name) => write!(f, "{name}"),
            Parameter::Keyword { key, var } => write!(f, "{key}={var}"),
            Parameter::Extra { extra, var } => write!(f, "{extra}={var}"),
        }
    }
}

impl Display for StatementList {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            write!(f, "{}{}", line.statement, line.newline)?;
        }
        Ok(())
    }
}

impl Display for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Body::Single(statement) => write!(f, "{statement}"),
            Body::Block {
                newline,
                statements,
                end,
            } => write!(
                f,
                "BEGIN{newline}{}{end}",
                indent(&statements.to_string(), IDL_TAB)
            ),
        }
    }
}

impl Display for ClauseBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClauseBody::Empty(newline) => write!(f, ":{newline}"),
            ClauseBody::Single(statement, newline) => write!(f, ": {statement}{newline}"),
            ClauseBody::Block {
                open,
                statements,
                close,
            } => write!(
                f,
                ": BEGIN{open}{}END{close}",
                indent(&statements.to_string(), IDL_TAB)
            ),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Labeled {
                label,
                newline,
                statement,
                ..
            } => match newline {
                Some(newline) => write!(f, "{label}:{newline}{statement}"),
                None => write!(f, "{label}: {statement}"),
            },
            Statement::If(s) => {
                write!(f, "IF {} THEN {}", s.condition, s.then_body)?;
                if let Some(else_body) = &s.else_body {
                    write!(f, " ELSE {else_body}")?;
                }
                Ok(())
            }
            Statement::Selection(s) => {
                let mut clauses = String::new();
                for clause in &s.clauses {
                    clauses.push_str(&format!("{}{}", clause.value, clause.body));
                }
                if let Some(else_clause) = &s.else_clause {
                    clauses.push_str(&format!("ELSE{else_clause}"));
                }
                write!(
                    f,
                    "{} {} OF{}{}{}",
                    s.kind.keyword(),
                    s.subject,
                    s.newline,
                    indent(&clauses, IDL_TAB),
                    s.end
                )
            }
            Statement::For(s) => {
                write!(f, "FOR {} = {}, {}", s.var, s.start, s.limit)?;
                if let Some(step) = &s.step {
                    write!(f, ", {step}")?;
                }
                write!(f, " DO {}", s.body)
            }
            Statement::Foreach(s) => {
                write!(f, "FOREACH {}, {}", s.var, s.iterable)?;
                if let Some(key) = &s.key {
                    write!(f, ", {key}")?;
                }
                write!(f, " DO {}", s.body)
            }
            Statement::While(s) => write!(f, "WHILE {} DO {}", s.condition, s.body),
            Statement::Repeat(s) => write!(f, "REPEAT {} UNTIL {}", s.body, s.condition),
            Statement::Simple(s) => write!(f, "{s}"),
            Statement::Error { text, .. } => f.write_str(text),
        }
    }
}

impl Display for SimpleStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SimpleStatement::Common { names, .. } => write!(f, "COMMON {}", join(names, ", ")),
            SimpleStatement::CompileOpt { names, .. } => {
                write!(f, "COMPILE_OPT {}", join(names, ", "))
            }
            SimpleStatement::ForwardFunction { names, .. } => {
                write!(f, "FORWARD_FUNCTION {}", join(names, ", "))
            }
            SimpleStatement::Jump(jump) => write!(f, "{jump}"),
            SimpleStatement::Call(call) => write!(f, "{call}"),
            SimpleStatement::Assign(assignment) => write!(f, "{assignment}"),
            SimpleStatement::Increment(increment) => write!(f, "{increment}"),
        }
    }
}

impl Display for Jump {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Jump::Return { value: None, .. } => f.write_str("RETURN"),
            Jump::Return {
                value: Some(value), ..
            } => write!(f, "RETURN, {value}"),
            Jump::Goto { label, .. } => write!(f, "GOTO, {label}"),
            Jump::Break { .. } => f.write_str("BREAK"),
            Jump::Continue { .. } => f.write_str("CONTINUE"),
        }
    }
}

impl Display for ProcedureCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, ", {}", join(&self.args, ", "))?;
        }
        Ok(())
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Positional(value) => write!(f, "{value}"),
            Argument::Keyword { name, value } => write!(f, "{name}={value}"),
            Argument::Flag(name) => write!(f, "/{name}"),
            Argument::Extra { extra, var } => write!(f, "{extra}={var}"),
        }
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.target, self.op.as_str(), self.value)
    }
}

impl Display for Increment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let op = if self.decrement { "--" } else { "++" };
        if self.prefix {
            write!(f, "{op}{}", self.target)
        } else {
            write!(f, "{}{op}", self.target)
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Assign(assignment) => write!(f, "{assignment}"),
            Expr::Ternary {
                condition,
                then_value,
                else_value,
            } => write!(f, "{condition} ? {then_value} : {else_value}"),
            Expr::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.as_str()),
            Expr::Unary { op, operand } => match op {
                UnaryOp::LogicalNot => write!(f, "~{operand}"),
                UnaryOp::BitNot => write!(f, "NOT {operand}"),
                UnaryOp::Plus => write!(f, "+{operand}"),
                UnaryOp::Minus => write!(f, "-{operand}"),
            },
            Expr::Deref(operand) => write!(f, "*{operand}"),
            Expr::Increment(increment) => write!(f, "{increment}"),
            Expr::Index { base, subscripts } => write!(f, "{base}[{}]", join(subscripts, ", ")),
            Expr::Call { name, args } => write!(f, "{name}({})", join(args, ", ")),
            Expr::Member { base, field } => write!(f, "{base}.{field}"),
            Expr::FieldIndex { base, index } => write!(f, "{base}.({index})"),
            Expr::Name(name) | Expr::SysVar(name) => write!(f, "{name}"),
            Expr::Number(number) => write!(f, "{number}"),
            Expr::Str(string) => write!(f, "{string}"),
            Expr::Paren(inner) => write!(f, "({inner})"),
            Expr::Array(items) => write!(f, "[{}]", join(items, ", ")),
            Expr::Struct(body) => write!(f, "{body}"),
        }
    }
}

impl Display for Subscript {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Subscript::All => f.write_str("*"),
            Subscript::Index(index) => write!(f, "{index}"),
            Subscript::Range { start, end, step } => {
                write!(f, "{start}:")?;
                match end {
                    Some(end) => write!(f, "{end}")?,
                    None => f.write_str("*")?,
                }
                if let Some(step) = step {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for StructBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(name) = &self.name {
            parts.push(name.to_string());
        }
        parts.extend(self.fields.iter().map(|field| field.to_string()));
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl Display for StructField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StructField::Field { name, value } => write!(f, "{name}: {value}"),
            StructField::Inherits(name) => write!(f, "INHERITS {name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb\n", "  "), "  a\n\n  b\n");
        assert_eq!(indent("\nx = 1", "    "), "\n    x = 1");
    }

    #[test]
    fn test_expression_source() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expr::Name(Name::new("a"))),
            rhs: Box::new(Expr::Index {
                base: Box::new(Expr::Name(Name::new("b"))),
                subscripts: vec![
                    Subscript::All,
                    Subscript::Range {
                        start: Expr::Number(Number::parse("0").unwrap()),
                        end: None,
                        step: Some(Expr::Number(Number::parse("2").unwrap())),
                    },
                ],
            }),
        };
        assert_eq!(expr.to_string(), "A + B[*, 0:*:2]");
    }

    #[test]
    fn test_call_source() {
        let call = ProcedureCall {
            line: 1,
            name: Name::new("plot"),
            args: vec![
                Argument::Positional(Expr::Name(Name::new("x"))),
                Argument::Flag(Name::new("xlog")),
                Argument::Keyword {
                    name: Name::new("title"),
                    value: Expr::Str(StringLit::new("'Hi'")),
                },
            ],
        };
        assert_eq!(call.to_string(), "PLOT, X, /XLOG, TITLE='Hi'");
    }
}
