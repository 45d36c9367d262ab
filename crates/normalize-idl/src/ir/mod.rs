//! Typed parse tree for IDL programs.
//!
//! One enum variant per grammar alternative. Optional grammar symbols are
//! `Option` fields, repeated ones are `Vec`s. Nodes are built once by the
//! parser and never mutated afterwards.
//!
//! Two renderings exist: `Display` reconstructs IDL source (see
//! [`source`]), and [`crate::output::PythonWriter`] emits Python.

pub mod literal;
mod source;

pub use literal::{Newline, Number, NumberKind, Radix, StringLit};
pub use source::indent;

use std::fmt;

/// An identifier as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    raw: String,
}

impl Name {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Upper-case source form, used for lookups and source rendering.
    pub fn upper(&self) -> String {
        self.raw.to_ascii_uppercase()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.upper())
    }
}

/// A whole source file.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// Comments and blank lines before the first statement or routine.
    pub leading: Option<Newline>,
    pub body: UnitBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitBody {
    Program(Vec<SubroutineDefinition>),
    Statements(StatementList),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PRO",
            RoutineKind::Function => "FUNCTION",
        }
    }
}

/// `PRO name, params` or `FUNCTION name, params`, through its `END`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubroutineDefinition {
    pub line: u32,
    pub kind: RoutineKind,
    pub name: Name,
    pub params: Vec<Parameter>,
    pub header_newline: Newline,
    pub body: StatementList,
    pub end_newline: Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Positional(Name),
    /// `KEY=var`
    Keyword { key: Name, var: Name },
    /// `_EXTRA=var` or `_REF_EXTRA=var`
    Extra { extra: String, var: String },
}

/// A statement followed by its terminating newline run.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementLine {
    pub statement: Statement,
    pub newline: Newline,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatementList {
    pub lines: Vec<StatementLine>,
}

impl StatementList {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&Statement> {
        self.lines.last().map(|l| &l.statement)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Labeled {
        line: u32,
        label: Name,
        newline: Option<Newline>,
        statement: Box<Statement>,
    },
    If(IfStatement),
    Selection(SelectionStatement),
    For(ForStatement),
    Foreach(ForeachStatement),
    While(WhileStatement),
    Repeat(RepeatStatement),
    Simple(SimpleStatement),
    /// Source skipped by the parser after a syntax error.
    Error { line: u32, text: String },
}

impl Statement {
    pub fn line(&self) -> u32 {
        match self {
            Statement::Labeled { line, .. } | Statement::Error { line, .. } => *line,
            Statement::If(s) => s.line,
            Statement::Selection(s) => s.line,
            Statement::For(s) => s.line,
            Statement::Foreach(s) => s.line,
            Statement::While(s) => s.line,
            Statement::Repeat(s) => s.line,
            Statement::Simple(s) => s.line(),
        }
    }
}

/// Body of an `IF`, loop or `REPEAT` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Single(Box<Statement>),
    /// `BEGIN` newline statements `END...`; `end` is the closing keyword.
    Block {
        newline: Newline,
        statements: StatementList,
        end: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub line: u32,
    pub condition: Expr,
    pub then_body: Body,
    pub else_body: Option<Body>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Case,
    Switch,
}

impl SelectionKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            SelectionKind::Case => "CASE",
            SelectionKind::Switch => "SWITCH",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStatement {
    pub line: u32,
    pub kind: SelectionKind,
    pub subject: Expr,
    pub newline: Newline,
    pub clauses: Vec<SelectionClause>,
    pub else_clause: Option<ClauseBody>,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionClause {
    pub value: Expr,
    pub body: ClauseBody,
}

/// Everything after the `:` of a selection clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseBody {
    Empty(Newline),
    Single(Box<Statement>, Newline),
    Block {
        open: Newline,
        statements: StatementList,
        close: Newline,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub line: u32,
    pub var: Name,
    pub start: Expr,
    pub limit: Expr,
    pub step: Option<Expr>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachStatement {
    pub line: u32,
    pub var: Name,
    pub iterable: Expr,
    pub key: Option<Name>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub line: u32,
    pub condition: Expr,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatStatement {
    pub line: u32,
    pub body: Body,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimpleStatement {
    /// `COMMON block, a, b`; the first name is the block.
    Common { line: u32, names: Vec<Name> },
    CompileOpt { line: u32, names: Vec<Name> },
    ForwardFunction { line: u32, names: Vec<Name> },
    Jump(Jump),
    Call(ProcedureCall),
    Assign(Assignment),
    Increment(Increment),
}

impl SimpleStatement {
    pub fn line(&self) -> u32 {
        match self {
            SimpleStatement::Common { line, .. }
            | SimpleStatement::CompileOpt { line, .. }
            | SimpleStatement::ForwardFunction { line, .. } => *line,
            SimpleStatement::Jump(j) => j.line(),
            SimpleStatement::Call(c) => c.line,
            SimpleStatement::Assign(a) => a.line,
            SimpleStatement::Increment(i) => i.line,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Jump {
    Return { line: u32, value: Option<Expr> },
    Goto { line: u32, label: Name },
    Break { line: u32 },
    Continue { line: u32 },
}

impl Jump {
    pub fn line(&self) -> u32 {
        match self {
            Jump::Return { line, .. }
            | Jump::Goto { line, .. }
            | Jump::Break { line }
            | Jump::Continue { line } => *line,
        }
    }
}

/// `NAME` or `NAME, args`
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub line: u32,
    pub name: Name,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Positional(Expr),
    /// `KEY=value`
    Keyword { name: Name, value: Expr },
    /// `/KEY`
    Flag(Name),
    /// `_EXTRA=var`
    Extra { extra: String, var: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub line: u32,
    pub target: Expr,
    pub op: AssignOp,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    And,
    Mod,
    Xor,
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
    Or,
    /// `##=`
    MatMul,
    /// `#=`
    ColMatMul,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// `<=`
    Min,
    /// `>=`
    Max,
}

impl AssignOp {
    /// Parses an `OP_EQUALS` lexeme (case-insensitive).
    pub fn from_lexeme(lexeme: &str) -> Option<AssignOp> {
        let op = match lexeme.to_ascii_uppercase().as_str() {
            "=" => AssignOp::Set,
            "AND=" => AssignOp::And,
            "MOD=" => AssignOp::Mod,
            "XOR=" => AssignOp::Xor,
            "EQ=" => AssignOp::Eq,
            "GE=" => AssignOp::Ge,
            "GT=" => AssignOp::Gt,
            "LE=" => AssignOp::Le,
            "LT=" => AssignOp::Lt,
            "NE=" => AssignOp::Ne,
            "OR=" => AssignOp::Or,
            "##=" => AssignOp::MatMul,
            "#=" => AssignOp::ColMatMul,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "^=" => AssignOp::Pow,
            "<=" => AssignOp::Min,
            ">=" => AssignOp::Max,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::And => "AND=",
            AssignOp::Mod => "MOD=",
            AssignOp::Xor => "XOR=",
            AssignOp::Eq => "EQ=",
            AssignOp::Ge => "GE=",
            AssignOp::Gt => "GT=",
            AssignOp::Le => "LE=",
            AssignOp::Lt => "LT=",
            AssignOp::Ne => "NE=",
            AssignOp::Or => "OR=",
            AssignOp::MatMul => "##=",
            AssignOp::ColMatMul => "#=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Pow => "^=",
            AssignOp::Min => "<=",
            AssignOp::Max => ">=",
        }
    }
}

/// `++x`, `x++`, `--x` or `x--`.
#[derive(Debug, Clone, PartialEq)]
pub struct Increment {
    pub line: u32,
    pub target: Expr,
    pub decrement: bool,
    pub prefix: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Assignment used as an expression.
    Assign(Box<Assignment>),
    Ternary {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `*p`
    Deref(Box<Expr>),
    Increment(Box<Increment>),
    Index {
        base: Box<Expr>,
        subscripts: Vec<Subscript>,
    },
    Call {
        name: Name,
        args: Vec<Argument>,
    },
    Member {
        base: Box<Expr>,
        field: Name,
    },
    /// `s.(i)`
    FieldIndex {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Name(Name),
    /// `!NAME`, stored with the `!`.
    SysVar(Name),
    Number(Number),
    Str(StringLit),
    Paren(Box<Expr>),
    Array(Vec<Expr>),
    Struct(StructBody),
}

impl Expr {
    /// True for the node kinds that may appear on the left of an assignment.
    pub fn is_pointer_expression(&self) -> bool {
        matches!(
            self,
            Expr::Deref(_)
                | Expr::Index { .. }
                | Expr::Call { .. }
                | Expr::Member { .. }
                | Expr::FieldIndex { .. }
                | Expr::Name(_)
                | Expr::SysVar(_)
                | Expr::Number(_)
                | Expr::Str(_)
                | Expr::Paren(_)
                | Expr::Array(_)
                | Expr::Struct(_)
        )
    }

    /// True when the value can receive an output argument: a variable, an
    /// element or a field.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::Name(_) | Expr::SysVar(_) | Expr::Index { .. } | Expr::Member { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Le,
    Lt,
    Ge,
    Gt,
    Add,
    Sub,
    /// `<`
    Min,
    /// `>`
    Max,
    Mul,
    /// `#`
    ColMatMul,
    /// `##`
    MatMul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::BitAnd => "AND",
            BinaryOp::BitOr => "OR",
            BinaryOp::BitXor => "XOR",
            BinaryOp::Eq => "EQ",
            BinaryOp::Ne => "NE",
            BinaryOp::Le => "LE",
            BinaryOp::Lt => "LT",
            BinaryOp::Ge => "GE",
            BinaryOp::Gt => "GT",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Min => "<",
            BinaryOp::Max => ">",
            BinaryOp::Mul => "*",
            BinaryOp::ColMatMul => "#",
            BinaryOp::MatMul => "##",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "MOD",
            BinaryOp::Pow => "^",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Le | BinaryOp::Lt | BinaryOp::Ge | BinaryOp::Gt
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `~`
    LogicalNot,
    /// `NOT`
    BitNot,
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subscript {
    /// `*`
    All,
    Index(Expr),
    /// `start:end[:step]`; an `end` of `None` is `*`.
    Range {
        start: Expr,
        end: Option<Expr>,
        step: Option<Expr>,
    },
}

/// Contents of `{ ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructBody {
    pub name: Option<Name>,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StructField {
    Field { name: Name, value: Expr },
    Inherits(Name),
}
