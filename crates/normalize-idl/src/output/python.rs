//! Python writer for the IDL IR.
//!
//! Emits one numpy-based Python module per translation unit. Constructs
//! with no Python counterpart record a diagnostic in the session and leave a
//! `#{ <IDL source> }#` placeholder behind so output is always produced.

use std::fmt::Display;

use crate::fold::reduce_expression;
use crate::ir::*;
use crate::session::Session;
use crate::signature::{ArgRef, FunctionSpec, ProcedureSpec, Signature};

/// Emits IR as Python source code.
pub struct PythonWriter<'s, 'a> {
    session: &'s mut Session<'a>,
    /// Line of the statement being translated, for diagnostics.
    line: u32,
}

fn placeholder(source: impl Display) -> String {
    format!("#{{ {source} }}#")
}

fn statement_placeholder(source: impl Display) -> String {
    format!("pass  {}", placeholder(source))
}

fn trim_newlines(text: &str) -> &str {
    text.trim_end_matches('\n')
}

impl<'s, 'a> PythonWriter<'s, 'a> {
    pub fn new(session: &'s mut Session<'a>) -> Self {
        Self { session, line: 0 }
    }

    /// Emit a translation unit to Python source.
    pub fn emit(unit: &TranslationUnit, session: &'s mut Session<'a>) -> String {
        let mut writer = Self::new(session);
        writer.write_unit(unit)
    }

    fn pad(&self) -> &str {
        &self.session.config.indent
    }

    fn indented(&self, text: &str) -> String {
        indent(text, self.pad())
    }

    fn conversion_error(&mut self, message: &str) {
        self.session.errors.conversion(message, self.line);
    }

    fn write_unit(&mut self, unit: &TranslationUnit) -> String {
        let mut body = match &unit.body {
            UnitBody::Program(routines) => routines
                .iter()
                .map(|routine| self.write_routine(routine))
                .collect::<String>(),
            UnitBody::Statements(list) => self.write_statement_list(list),
        };

        let mut parts = Vec::new();
        if let Some(leading) = &unit.leading {
            match leading.docstring() {
                Some(doc) => parts.push(doc),
                None if leading.to_string().trim().is_empty() => {}
                None => body = leading.to_python() + &body,
            }
        }
        parts.push(format!("from {} import *", self.session.config.array_module));
        if !self.session.extra_code.is_empty() {
            parts.push(self.session.extra_code.render());
        }
        parts.push(body);

        let code = parts.join("\n\n");
        format!("{}\n", code.trim_end())
    }

    // Routines

    fn write_routine(&mut self, def: &SubroutineDefinition) -> String {
        self.line = def.line;
        tracing::debug!(name = %def.name, kind = ?def.kind, line = def.line, "translating routine");

        let mut params = Vec::new();
        let mut keywords = Vec::new();
        let mut extras = Vec::new();
        for param in &def.params {
            match param {
                Parameter::Positional(name) => params.push(self.session.py_name(name.as_str())),
                Parameter::Keyword { key, var } => {
                    keywords.push((key.upper(), self.session.py_name(var.as_str())))
                }
                Parameter::Extra { .. } => extras.push(param.to_string()),
            }
        }

        let signature = self.routine_signature(def, params.len(), &keywords);
        self.session.routine = Some(def.kind);

        let defined = signature.and_then(|signature| {
            self.session.extra_code.extend(signature.extra_code());
            match signature.define(&params, &keywords, self.session.config) {
                Ok(defined) => Some(defined),
                Err(err) => {
                    self.session.errors.mapping(err.to_string(), def.line);
                    None
                }
            }
        });
        let (mut header, prologue) = defined.unwrap_or_else(|| {
            let mut source = format!("{} {}", def.kind.keyword(), def.name);
            for param in &def.params {
                source.push_str(&format!(", {param}"));
            }
            let name = self.session.py_name(def.name.as_str());
            let header = format!(
                "def {name}({}):  {}",
                params.join(", "),
                placeholder(source)
            );
            let prologue = match def.kind {
                RoutineKind::Procedure => "def _ret():  return None\n".to_string(),
                RoutineKind::Function => String::new(),
            };
            (header, prologue)
        });
        if !extras.is_empty() {
            self.conversion_error("cannot convert _EXTRA in routine definitions");
            header = format!("{header}  {}", placeholder(extras.join(", ")));
        }

        let mut body = format!("{prologue}\n{}", self.write_statement_list(&def.body));
        let returns = matches!(
            def.body.last(),
            Some(Statement::Simple(SimpleStatement::Jump(Jump::Return { .. })))
        );
        if def.kind == RoutineKind::Procedure && !returns {
            if !body.ends_with('\n') {
                body.push('\n');
            }
            body.push_str("return _ret()\n");
        }

        let newline = match def.header_newline.docstring() {
            Some(doc) => format!("\n{}\n\n", self.indented(&doc)),
            None => def.header_newline.to_python(),
        };
        self.session.routine = None;

        format!(
            "{header}{newline}{}{}",
            self.indented(&body),
            def.end_newline.to_python()
        )
    }

    /// The registered signature for a definition, or a new one registered
    /// for the rest of the session.
    fn routine_signature(
        &mut self,
        def: &SubroutineDefinition,
        npars: usize,
        keywords: &[(String, String)],
    ) -> Option<Signature> {
        if let Some(signature) = self.session.registry.subroutine(def.name.as_str()) {
            return Some(signature.clone());
        }
        let keys: Vec<&str> = keywords.iter().map(|(key, _)| key.as_str()).collect();
        let created = match def.kind {
            RoutineKind::Procedure => Signature::procedure(
                ProcedureSpec::new(def.name.upper())
                    .inputs(1..=npars)
                    .outputs(1..=npars)
                    .in_keys(&keys)
                    .out_keys(&keys),
            ),
            RoutineKind::Function => Signature::function(
                FunctionSpec::new(def.name.upper())
                    .pars(1..=npars)
                    .keys(&keys),
            ),
        };
        let registered = created.and_then(|signature| {
            self.session.registry.register(signature.clone())?;
            Ok(signature)
        });
        match registered {
            Ok(signature) => Some(signature),
            Err(err) => {
                self.session.errors.mapping(err.to_string(), def.line);
                None
            }
        }
    }

    // Statements

    fn write_statement_list(&mut self, list: &StatementList) -> String {
        let mut out = String::new();
        for line in &list.lines {
            out.push_str(&self.write_statement(&line.statement));
            out.push_str(&line.newline.to_python());
        }
        out
    }

    /// Text placed after `if ...:` and friends; starts with a line break.
    fn write_body(&mut self, body: &Body) -> String {
        match body {
            Body::Single(statement) => format!("\n{}", self.write_statement(statement)),
            Body::Block {
                newline,
                statements,
                ..
            } => self.write_block(newline, statements),
        }
    }

    fn write_block(&mut self, open: &Newline, statements: &StatementList) -> String {
        if statements.is_empty() {
            return format!("{}pass", open.to_python());
        }
        format!("{}{}", open.to_python(), self.write_statement_list(statements))
    }

    /// `keyword:` followed by an indented body.
    fn write_clause(&mut self, head: &str, body: &Body) -> String {
        let body = self.write_body(body);
        format!("{head}:{}", trim_newlines(&self.indented(&body)))
    }

    fn write_statement(&mut self, statement: &Statement) -> String {
        self.line = statement.line();
        match statement {
            Statement::Labeled {
                label,
                newline,
                statement,
                ..
            } => {
                let newline = newline
                    .as_ref()
                    .map(Newline::to_python)
                    .unwrap_or_else(|| "\n".to_string());
                format!("# {}:{newline}{}", label.upper(), self.write_statement(statement))
            }
            Statement::If(s) => {
                let condition = self.write_expr(&s.condition);
                let mut out = self.write_clause(&format!("if {condition}"), &s.then_body);
                if let Some(else_body) = &s.else_body {
                    out.push('\n');
                    out.push_str(&self.write_clause("else", else_body));
                }
                out
            }
            Statement::Selection(s) => self.write_selection(s),
            Statement::For(s) => {
                let var = self.session.variable(s.var.as_str());
                let start = self.write_expr(&s.start);
                let limit = self.write_expr(&s.limit);
                let step = s.step.as_ref().map(|step| self.write_expr(step));
                let increment = step.as_deref().unwrap_or("1");
                let stop = reduce_expression(&format!("({limit})+({increment})"));
                let range = match &step {
                    Some(step) => format!("arange({start}, {stop}, {step})"),
                    None => format!("arange({start}, {stop})"),
                };
                self.write_clause(&format!("for {var} in {range}"), &s.body)
            }
            Statement::Foreach(s) => {
                let var = self.session.variable(s.var.as_str());
                let iterable = self.write_expr(&s.iterable);
                let head = match &s.key {
                    Some(key) => {
                        let key = self.session.variable(key.as_str());
                        format!("for {key}, {var} in enumerate({iterable})")
                    }
                    None => format!("for {var} in {iterable}"),
                };
                self.write_clause(&head, &s.body)
            }
            Statement::While(s) => {
                let condition = self.write_expr(&s.condition);
                self.write_clause(&format!("while {condition}"), &s.body)
            }
            Statement::Repeat(s) => {
                let out = self.write_clause("while True", &s.body);
                let condition = self.write_expr(&s.condition);
                format!("{out}\n{}", self.indented(&format!("if {condition}:  break")))
            }
            Statement::Simple(s) => self.write_simple(s),
            Statement::Error { text, .. } => statement_placeholder(text),
        }
    }

    fn write_selection(&mut self, s: &SelectionStatement) -> String {
        let is_switch = s.kind == SelectionKind::Switch;
        let subject = self.write_expr(&s.subject);
        let mut out = format!("_expr = {subject}{}", s.newline.to_python());
        if is_switch {
            out.push_str("_match = False\n");
        }

        for (i, clause) in s.clauses.iter().enumerate() {
            let value = self.write_expr(&clause.value);
            let mut test = format!("_expr == {}", reduce_expression(&format!("({value})")));
            if is_switch && i > 0 {
                test = format!("_match or ({test})");
            }
            let key = if i == 0 || is_switch { "if" } else { "elif" };
            let action = self.write_clause_body(&clause.body);
            out.push_str(&format!("{key} {test}:{}", self.indented(&action)));
            if is_switch {
                out.push_str(&self.indented("_match = True"));
                out.push('\n');
            }
        }

        let head = if s.clauses.is_empty() { "if True" } else { "else" };
        match &s.else_clause {
            Some(body) => {
                let action = self.write_clause_body(body);
                out.push_str(&format!("{head}:{}", self.indented(&action)));
            }
            None if !is_switch => {
                let raise = self.indented("raise RuntimeError('no match found for expression')");
                out.push_str(&format!("{head}:\n{raise}"));
            }
            None => {}
        }
        trim_newlines(&out).to_string()
    }

    fn write_clause_body(&mut self, body: &ClauseBody) -> String {
        match body {
            ClauseBody::Empty(newline) => format!("\npass{}", newline.to_python()),
            ClauseBody::Single(statement, newline) => {
                format!("\n{}{}", self.write_statement(statement), newline.to_python())
            }
            ClauseBody::Block {
                open,
                statements,
                close,
            } => {
                let block = self.write_block(open, statements);
                format!("{}{}", trim_newlines(&block), close.to_python())
            }
        }
    }

    fn write_simple(&mut self, statement: &SimpleStatement) -> String {
        match statement {
            SimpleStatement::Common { names, .. } => {
                if self.session.routine.is_none() {
                    self.session
                        .errors
                        .syntax("COMMON outside of PRO or FUNCTION", self.line);
                    return statement_placeholder(statement);
                }
                let vars: Vec<String> = names
                    .iter()
                    .skip(1)
                    .map(|name| self.session.py_name(name.as_str()))
                    .collect();
                if vars.is_empty() {
                    "pass".to_string()
                } else {
                    format!("global {}", vars.join(", "))
                }
            }
            SimpleStatement::CompileOpt { .. } | SimpleStatement::ForwardFunction { .. } => {
                format!("# {statement}")
            }
            SimpleStatement::Jump(jump) => self.write_jump(jump),
            SimpleStatement::Call(call) => self
                .write_call(&call.name, &call.args)
                .unwrap_or_else(|| statement_placeholder(call)),
            SimpleStatement::Assign(assignment) => self.write_assignment(assignment),
            SimpleStatement::Increment(increment) => {
                let target = self.write_expr(&increment.target);
                let op = if increment.decrement { "-" } else { "+" };
                format!("{target} {op}= 1")
            }
        }
    }

    fn write_jump(&mut self, jump: &Jump) -> String {
        match jump {
            Jump::Return { value, .. } => match (self.session.routine, value) {
                (Some(RoutineKind::Procedure), _) => "return _ret()".to_string(),
                (Some(RoutineKind::Function), Some(value)) => {
                    format!("return {}", self.write_expr(value))
                }
                (Some(RoutineKind::Function), None) => "return None".to_string(),
                (None, _) => {
                    self.session
                        .errors
                        .syntax("RETURN outside of PRO or FUNCTION", self.line);
                    statement_placeholder(jump)
                }
            },
            Jump::Goto { .. } => {
                self.conversion_error("cannot convert GOTO statements");
                statement_placeholder(jump)
            }
            Jump::Break { .. } => "break".to_string(),
            Jump::Continue { .. } => "continue".to_string(),
        }
    }

    fn write_assignment(&mut self, assignment: &Assignment) -> String {
        let lhs = self.write_expr(&assignment.target);
        let rhs = self.write_expr(&assignment.value);
        let augmented = |op: &str| format!("{lhs} {op} {rhs}");
        let compared = |op: &str| format!("{lhs} = {lhs} {op} {rhs}");
        let applied = |func: &str| format!("{lhs} = {func}({lhs}, {rhs})");
        match assignment.op {
            AssignOp::Set => augmented("="),
            AssignOp::And => augmented("&="),
            AssignOp::Mod => augmented("%="),
            AssignOp::Xor => augmented("^="),
            AssignOp::Or => augmented("|="),
            AssignOp::Add => augmented("+="),
            AssignOp::Sub => augmented("-="),
            AssignOp::Mul => augmented("*="),
            AssignOp::Div => augmented("/="),
            AssignOp::Pow => augmented("**="),
            AssignOp::Eq => compared("=="),
            AssignOp::Ne => compared("!="),
            AssignOp::Ge => compared(">="),
            AssignOp::Gt => compared(">"),
            AssignOp::Le => compared("<="),
            AssignOp::Lt => compared("<"),
            AssignOp::MatMul => applied("matmul"),
            AssignOp::Min => applied("minimum"),
            AssignOp::Max => applied("maximum"),
            AssignOp::ColMatMul => {
                format!("{lhs} = transpose(matmul(transpose({lhs}), transpose({rhs})))")
            }
        }
    }

    /// A procedure or function call; `None` once a diagnostic was recorded.
    fn write_call(&mut self, name: &Name, args: &[Argument]) -> Option<String> {
        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        let mut extras = Vec::new();
        let mut assignable = (Vec::new(), Vec::new());
        for arg in args {
            match arg {
                Argument::Positional(value) => {
                    positional.push(self.write_expr(value));
                    assignable.0.push(value.is_assignable());
                }
                Argument::Keyword { name, value } => {
                    keywords.push((name.as_str().to_string(), self.write_expr(value)));
                    assignable.1.push(value.is_assignable());
                }
                Argument::Flag(name) => {
                    keywords.push((name.as_str().to_string(), "True".to_string()));
                    assignable.1.push(false);
                }
                Argument::Extra { var, .. } => extras.push(var.clone()),
            }
        }

        let Some(signature) = self.session.registry.subroutine(name.as_str()).cloned() else {
            let mut items = positional;
            items.extend(
                keywords
                    .iter()
                    .map(|(key, value)| format!("{}={value}", self.session.py_name(key))),
            );
            items.extend(extras.iter().map(|var| format!("**{}", self.session.py_name(var))));
            return Some(format!(
                "{}({})",
                self.session.py_name(name.as_str()),
                items.join(", ")
            ));
        };

        if !extras.is_empty() {
            self.conversion_error("cannot convert _EXTRA in calls to mapped subroutines");
            return None;
        }
        self.session.extra_code.extend(signature.extra_code());
        let writable = |arg: ArgRef| match arg {
            ArgRef::Positional(i) => assignable.0[i],
            ArgRef::Keyword(i) => assignable.1[i],
        };
        match signature.bind(&positional, &keywords, &writable, self.session.config) {
            Ok(call) => {
                for arg in call.discarded {
                    let text = match arg {
                        ArgRef::Positional(i) => positional[i].clone(),
                        ArgRef::Keyword(i) => format!("{}={}", keywords[i].0, keywords[i].1),
                    };
                    self.conversion_error(&format!(
                        "cannot return output of {} into '{text}'",
                        signature.name()
                    ));
                }
                Some(call.code)
            }
            Err(err) => {
                self.session.errors.mapping(err.to_string(), self.line);
                None
            }
        }
    }

    // Expressions

    fn write_expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Assign(_) => {
                self.conversion_error("cannot convert assignment inside an expression");
                placeholder(expr)
            }
            Expr::Increment(_) => {
                self.conversion_error("cannot convert ++ or -- inside an expression");
                placeholder(expr)
            }
            Expr::Deref(_) => {
                self.conversion_error("cannot convert pointer dereference");
                placeholder(expr)
            }
            Expr::FieldIndex { .. } => {
                self.conversion_error("cannot convert '<struct>.(<field_index>)'");
                placeholder(expr)
            }
            Expr::Struct(_) => {
                self.conversion_error("cannot convert structures");
                placeholder(expr)
            }
            Expr::Ternary {
                condition,
                then_value,
                else_value,
            } => {
                let condition = self.write_expr(condition);
                let then_value = self.write_expr(then_value);
                let else_value = self.write_expr(else_value);
                format!("({then_value} if {condition} else {else_value})")
            }
            Expr::Binary { op, lhs, rhs } => self.write_binary(*op, lhs, rhs),
            Expr::Unary { op, operand } => {
                let operand = self.write_expr(operand);
                match op {
                    UnaryOp::LogicalNot => format!("logical_not({operand})"),
                    UnaryOp::BitNot => format!("bitwise_not({operand})"),
                    UnaryOp::Plus => format!("+{operand}"),
                    UnaryOp::Minus => format!("-{operand}"),
                }
            }
            Expr::Index { base, subscripts } => {
                let base = self.write_expr(base);
                let subscripts: Vec<String> = subscripts
                    .iter()
                    .rev()
                    .map(|subscript| self.write_subscript(subscript))
                    .collect();
                format!("{base}[{}]", subscripts.join(", "))
            }
            Expr::Call { name, args } => self
                .write_call(name, args)
                .unwrap_or_else(|| placeholder(expr)),
            Expr::Member { base, field } => {
                let base = self.write_expr(base);
                format!("{base}.{}", self.session.py_name(field.as_str()))
            }
            Expr::Name(name) | Expr::SysVar(name) => self.session.variable(name.as_str()),
            Expr::Number(number) => number.to_python(),
            Expr::Str(string) => string.to_python(),
            Expr::Paren(inner) => format!("({})", self.write_expr(inner)),
            Expr::Array(items) => {
                let items: Vec<String> = items.iter().map(|item| self.write_expr(item)).collect();
                format!("array([{}])", items.join(", "))
            }
        }
    }

    fn write_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> String {
        let mut left = self.write_expr(lhs);
        let right = self.write_expr(rhs);
        let needs_parens = match (op, lhs) {
            (BinaryOp::Pow, Expr::Unary { .. }) => true,
            (BinaryOp::Pow, Expr::Binary { op: BinaryOp::Pow, .. }) => true,
            (op, Expr::Binary { op: inner, .. }) => op.is_relational() && inner.is_relational(),
            _ => false,
        };
        if needs_parens {
            left = format!("({left})");
        }
        match op {
            BinaryOp::LogicalAnd => format!("logical_and({left}, {right})"),
            BinaryOp::LogicalOr => format!("logical_or({left}, {right})"),
            BinaryOp::BitAnd => format!("bitwise_and({left}, {right})"),
            BinaryOp::BitOr => format!("bitwise_or({left}, {right})"),
            BinaryOp::BitXor => format!("bitwise_xor({left}, {right})"),
            BinaryOp::Eq => format!("{left} == {right}"),
            BinaryOp::Ne => format!("{left} != {right}"),
            BinaryOp::Le => format!("{left} <= {right}"),
            BinaryOp::Lt => format!("{left} < {right}"),
            BinaryOp::Ge => format!("{left} >= {right}"),
            BinaryOp::Gt => format!("{left} > {right}"),
            BinaryOp::Add => format!("{left} + {right}"),
            BinaryOp::Sub => format!("{left} - {right}"),
            BinaryOp::Min => format!("minimum({left}, {right})"),
            BinaryOp::Max => format!("maximum({left}, {right})"),
            BinaryOp::Mul => format!("{left} * {right}"),
            BinaryOp::Div => format!("{left} / {right}"),
            BinaryOp::Mod => format!("{left} % {right}"),
            BinaryOp::Pow => format!("{left} ** {right}"),
            BinaryOp::MatMul => format!("matmul({left}, {right})"),
            BinaryOp::ColMatMul => {
                format!("transpose(matmul(transpose({left}), transpose({right})))")
            }
        }
    }

    fn write_subscript(&mut self, subscript: &Subscript) -> String {
        match subscript {
            Subscript::All => ":".to_string(),
            Subscript::Index(index) => self.write_expr(index),
            Subscript::Range { start, end, step } => {
                let start = self.write_expr(start);
                let step = step.as_ref().map(|step| self.write_expr(step));
                match (end, step) {
                    (Some(end), step) => {
                        let end = self.write_expr(end);
                        let stop = reduce_expression(&format!("({end})+1"));
                        match step {
                            Some(step) => format!("{start}:{stop}:{step}"),
                            None => format!("{start}:{stop}"),
                        }
                    }
                    (None, Some(step)) => format!("{start}::{step}"),
                    (None, None) => format!("{start}:"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorLog;
    use crate::parser::parse;
    use crate::registry::Registry;

    fn translate(source: &str) -> (String, Vec<String>) {
        let config = Config::default();
        let mut session = Session::new(&config, Registry::with_builtins().unwrap());
        let mut errors = ErrorLog::new();
        let unit = parse(source, &mut errors).unwrap();
        let code = PythonWriter::emit(&unit, &mut session);
        let diagnostics = errors
            .iter()
            .chain(session.errors.iter())
            .map(|d| d.to_string())
            .collect();
        (code, diagnostics)
    }

    /// Translated body with the import line removed.
    fn body(source: &str) -> String {
        let (code, diagnostics) = translate(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        code.strip_prefix("from numpy import *\n\n")
            .unwrap_or(&code)
            .to_string()
    }

    #[test]
    fn test_operators() {
        assert_eq!(body("x = a and b or c\n"), "x = bitwise_or(bitwise_and(a, b), c)\n");
        assert_eq!(body("x = a lt b\n"), "x = a < b\n");
        assert_eq!(body("x = a < b\n"), "x = minimum(a, b)\n");
        assert_eq!(body("x = a ## b\n"), "x = matmul(a, b)\n");
        assert_eq!(
            body("x = a # b\n"),
            "x = transpose(matmul(transpose(a), transpose(b)))\n"
        );
        assert_eq!(body("x = a mod 2\n"), "x = a % 2\n");
        assert_eq!(body("x = ~a && b\n"), "x = logical_and(logical_not(a), b)\n");
        assert_eq!(body("x = not a\n"), "x = bitwise_not(a)\n");
        assert_eq!(body("x = c ? a : b\n"), "x = (a if c else b)\n");
    }

    #[test]
    fn test_precedence_parentheses() {
        assert_eq!(body("x = -a^2\n"), "x = (-a) ** 2\n");
        assert_eq!(body("x = a^b^c\n"), "x = (a ** b) ** c\n");
        assert_eq!(body("x = a eq b eq c\n"), "x = (a == b) == c\n");
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(body("x += 1\n"), "x += 1\n");
        assert_eq!(body("x ^= 2\n"), "x **= 2\n");
        assert_eq!(body("x eq= y\n"), "x = x == y\n");
        assert_eq!(body("x <= y\n"), "x = minimum(x, y)\n");
        assert_eq!(body("x ##= y\n"), "x = matmul(x, y)\n");
        assert_eq!(body("x++\n--y\n"), "x += 1\ny -= 1\n");
    }

    #[test]
    fn test_subscripts() {
        assert_eq!(body("y = a[1:3]\n"), "y = a[1:4]\n");
        assert_eq!(body("y = a[i, 0:n-1:2]\n"), "y = a[0:(n - 1)+1:2, i]\n");
        assert_eq!(body("y = a[*, 2:*]\n"), "y = a[2:, :]\n");
        assert_eq!(body("y = a[1:*:2]\n"), "y = a[1::2]\n");
    }

    #[test]
    fn test_literals_and_names() {
        assert_eq!(body("x = [1, 'FF'x, 2.5d0]\n"), "x = array([1, 0xff, 2.5e0])\n");
        assert_eq!(body("lambda = 'it''s'\n"), "lambda_ = 'it\\'s'\n");
        assert_eq!(body("x = s.field\n"), "x = s.field\n");
    }

    #[test]
    fn test_counted_loop() {
        assert_eq!(
            body("for i = 1, 10 do s += i\n"),
            "for i in arange(1, 11):\n    s += i\n"
        );
        assert_eq!(
            body("for i = n, 0, -1 do begin\n  s += i\nendfor\n"),
            "for i in arange(n, -1, -1):\n    s += i\n"
        );
    }

    #[test]
    fn test_other_loops() {
        assert_eq!(
            body("foreach v, list, k do print, v\n"),
            "for k, v in enumerate(list):\n    print(v)\n"
        );
        assert_eq!(body("while i lt 3 do i++\n"), "while i < 3:\n    i += 1\n");
        assert_eq!(
            body("repeat begin\n  i--\nendrep until i le 0\n"),
            "while True:\n    i -= 1\n    if i <= 0:  break\n"
        );
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            body("if x gt 0 then begin\n  y = 1\nendif else y = 2\n"),
            "if x > 0:\n    y = 1\nelse:\n    y = 2\n"
        );
        assert_eq!(body("if x then begin\nendif\n"), "if x:\n    pass\n");
    }

    #[test]
    fn test_case() {
        assert_eq!(
            body("case x of\n  1: y = 1\n  1+1: y = 2\nendcase\n"),
            "_expr = x\n\
             if _expr == 1:\n    y = 1\n\
             elif _expr == 2:\n    y = 2\n\
             else:\n    raise RuntimeError('no match found for expression')\n"
        );
    }

    #[test]
    fn test_switch_fallthrough() {
        assert_eq!(
            body("switch x of\n  1: y = 1\n  2:\n  else: y = 0\nendswitch\n"),
            "_expr = x\n\
             _match = False\n\
             if _expr == 1:\n    y = 1\n    _match = True\n\
             if _match or (_expr == 2):\n    pass\n    _match = True\n\
             else:\n    y = 0\n"
        );
    }

    #[test]
    fn test_labels_and_comments() {
        assert_eq!(body("top: x = 1\n"), "# TOP:\nx = 1\n");
        assert_eq!(body("compile_opt idl2\n"), "# COMPILE_OPT IDL2\n");
        assert_eq!(body("x = 1 ; note\n"), "x = 1 # note\n");
        assert_eq!(body("x = 1 & y = 2\n"), "x = 1 ; y = 2\n");
    }

    #[test]
    fn test_unmapped_calls() {
        assert_eq!(
            body("plot, x, y, /xlog, title='T'\n"),
            "plot(x, y, xlog=True, title='T')\n"
        );
        assert_eq!(body("plot, x, _extra=e\n"), "plot(x, **e)\n");
        assert_eq!(body("y = myfunc(x, key=2)\n"), "y = myfunc(x, key=2)\n");
    }

    #[test]
    fn test_procedure_definition() {
        assert_eq!(
            body("pro bump, x, step=s\n  x = x + s\nend\n"),
            "def bump(x, step=None):\n    \
             n_params = 1\n    \
             s = step\n    \
             _opt = (s,)\n    \
             def _ret():\n        \
             _rv = [x]\n        \
             _rv += [_v for _d, _v in zip(_opt, [s]) if _d is not None]\n        \
             return tuple(_rv)\n\n    \
             x = x + s\n    \
             return _ret()\n"
        );
    }

    #[test]
    fn test_function_definition() {
        assert_eq!(
            body("function sq, x\n  return, x^2\nend\n"),
            "def sq(x):\n    n_params = 1\n\n    return x ** 2\n"
        );
    }

    #[test]
    fn test_defined_routine_is_callable() {
        assert_eq!(
            body("pro swap, a, b\n  t = a & a = b & b = t\nend\n\npro main\n  swap, x, y\nend\n"),
            "def swap(a, b):\n    \
             n_params = 2\n    \
             def _ret():  return (a, b)\n\n    \
             t = a ; a = b ; b = t\n    \
             return _ret()\n\n\n\
             def main():\n    \
             n_params = 0\n    \
             def _ret():  return None\n\n    \
             x, y = swap(x, y)\n    \
             return _ret()\n"
        );
    }

    #[test]
    fn test_literal_arguments_are_not_targets() {
        let code = body("pro p, a, verbose=v\n  a = 1\nend\n\npro main\n  p, 1, /verbose\n  p, x, verbose=1\nend\n");
        assert!(code.contains("\n    p(1, verbose=True)\n"), "{code}");
        assert!(code.contains("\n    x, _ = p(x, verbose=1)\n"), "{code}");
    }

    #[test]
    fn test_output_only_literal_is_reported() {
        let config = Config::default();
        let mut registry = Registry::with_builtins().unwrap();
        registry
            .register_procedure(
                ProcedureSpec::new("GETVAL")
                    .inputs([1])
                    .outputs([2])
                    .out_keys(&["COUNT"]),
            )
            .unwrap();
        let mut session = Session::new(&config, registry);
        let mut errors = ErrorLog::new();
        let unit = parse("getval, 1, 5\ngetval, 1, r, /count\n", &mut errors).unwrap();
        let code = PythonWriter::emit(&unit, &mut session);

        assert_eq!(code, "from numpy import *\n\ngetval(1)\nr, _ = getval(1, count=True)\n");
        let diagnostics: Vec<String> = session.errors.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            diagnostics,
            vec![
                "1: conversion error: cannot return output of GETVAL into '5'",
                "2: conversion error: cannot return output of GETVAL into 'count=True'",
            ]
        );
    }

    #[test]
    fn test_docstrings() {
        let (code, diagnostics) = translate(";+\n; Module docs.\n;-\nx = 1\n");
        assert!(diagnostics.is_empty());
        assert_eq!(code, "\"\"\"\n Module docs.\n\"\"\"\n\nfrom numpy import *\n\nx = 1\n");

        assert_eq!(
            body("function f ;+\n; Returns one.\n;-\n  return, 1\nend\n"),
            "def f():\n    \"\"\"\n     Returns one.\n    \"\"\"\n\n    n_params = 0\n\n    return 1\n"
        );
    }

    #[test]
    fn test_extra_code_section() {
        let (code, diagnostics) = translate("x = !radeg * 2\n");
        assert!(diagnostics.is_empty());
        assert_eq!(
            code,
            "from numpy import *\n\n_radeg = 180.0 / pi\n\nx = _radeg * 2\n"
        );
    }

    #[test]
    fn test_unsupported_constructs() {
        let (code, diagnostics) = translate("goto, done\nx = *p\ny = 1\n");
        assert_eq!(
            diagnostics,
            vec![
                "1: conversion error: cannot convert GOTO statements",
                "2: conversion error: cannot convert pointer dereference",
            ]
        );
        assert_eq!(
            code,
            "from numpy import *\n\npass  #{ GOTO, DONE }#\nx = #{ *P }#\ny = 1\n"
        );
    }

    #[test]
    fn test_statement_context_errors() {
        let (code, diagnostics) = translate("return\ncommon blk, a\n");
        assert_eq!(
            diagnostics,
            vec![
                "1: syntax error: RETURN outside of PRO or FUNCTION",
                "2: syntax error: COMMON outside of PRO or FUNCTION",
            ]
        );
        assert!(code.contains("pass  #{ RETURN }#\npass  #{ COMMON BLK, A }#\n"));
    }

    #[test]
    fn test_mapping_errors() {
        let (code, diagnostics) = translate("x = n_elements(a, b)\n");
        assert_eq!(
            diagnostics,
            vec!["1: mapping error: subroutine 'N_ELEMENTS' takes at most 1 parameters (called with 2)"]
        );
        assert!(code.ends_with("x = #{ N_ELEMENTS(A, B) }#\n"));
    }

    #[test]
    fn test_common_in_routine() {
        assert_eq!(
            body("pro p\n  common blk, a, b\nend\n"),
            "def p():\n    n_params = 0\n    def _ret():  return None\n\n    global a, b\n    return _ret()\n"
        );
    }

    #[test]
    fn test_definition_fallbacks() {
        let (code, diagnostics) = translate("pro print, x\nend\n");
        assert_eq!(
            diagnostics,
            vec!["1: mapping error: subroutine 'PRINT' has 100 parameters (defined with 1)"]
        );
        assert!(code.ends_with(
            "def print(x):  #{ PRO PRINT, X }#\n    def _ret():  return None\n\n    return _ret()\n"
        ));

        let (code, diagnostics) = translate("pro p, a, _extra=e\nend\n");
        assert_eq!(
            diagnostics,
            vec!["1: conversion error: cannot convert _EXTRA in routine definitions"]
        );
        assert!(code.ends_with(
            "def p(a):  #{ _EXTRA=e }#\n    n_params = 1\n    def _ret():  return a\n\n    return _ret()\n"
        ));
    }
}
