//! Recursive-descent parser producing the typed IR.
//!
//! One method per grammar rule. Syntax errors are recorded in the
//! [`ErrorLog`] and recovered at statement granularity: the parser skips to
//! the end of the offending line and keeps the skipped source as a
//! [`Statement::Error`] node, so a tree is always produced.

use crate::error::{ErrorLog, InternalError};
use crate::ir::*;
use crate::lexer::{Token, TokenKind, tokenize};

use TokenKind as K;

/// Keywords that close a `BEGIN` block.
const BLOCK_ENDS: &[TokenKind] = &[
    K::End,
    K::EndCase,
    K::EndElse,
    K::EndFor,
    K::EndForeach,
    K::EndIf,
    K::EndRep,
    K::EndSwitch,
    K::EndWhile,
];

/// Tokens after which a leading identifier is a procedure call.
const CALL_FOLLOWERS: &[TokenKind] = &[K::Newline, K::Comma, K::Else, K::Until, K::Eof];

/// Parse a complete source file.
pub fn parse(source: &str, errors: &mut ErrorLog) -> Result<TranslationUnit, InternalError> {
    let mut text = source.replace("\r\n", "\n");
    if !text.ends_with('\n') {
        text.push('\n');
    }
    let tokens = tokenize(&text, errors);
    let mut parser = Parser {
        tokens,
        pos: 0,
        errors,
    };
    parser.translation_unit()
}

enum ParseError {
    /// Index of the offending token.
    Syntax(usize),
    Internal(InternalError),
}

impl From<InternalError> for ParseError {
    fn from(err: InternalError) -> Self {
        ParseError::Internal(err)
    }
}

type ParseResult<T> = Result<T, ParseError>;

struct Parser<'e> {
    tokens: Vec<Token>,
    pos: usize,
    errors: &'e mut ErrorLog,
}

impl Parser<'_> {
    // Token access

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(K::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind())
    }

    fn at_line_end(&self) -> bool {
        self.at_any(&[K::Newline, K::Eof])
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != K::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        self.at(kind).then(|| self.bump())
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        self.expect_any(&[kind])
    }

    fn expect_any(&mut self, kinds: &[TokenKind]) -> ParseResult<Token> {
        if self.at_any(kinds) {
            Ok(self.bump())
        } else {
            Err(ParseError::Syntax(self.pos))
        }
    }

    fn unexpected<T>(&self) -> ParseResult<T> {
        Err(ParseError::Syntax(self.pos))
    }

    fn ident(&mut self) -> ParseResult<Name> {
        Ok(Name::new(self.expect(K::Identifier)?.text))
    }

    // Error recovery

    fn report(&mut self, at: usize) {
        let token = &self.tokens[at.min(self.tokens.len() - 1)];
        let message = if token.kind == K::Eof {
            "unexpected end of input".to_string()
        } else {
            format!("invalid syntax at '{}'", token.text.escape_debug())
        };
        tracing::trace!(line = token.line, lexeme = %token.text, "recovering from syntax error");
        self.errors.syntax(message, token.line);
    }

    fn skip_line(&mut self) {
        while !self.at_line_end() {
            self.bump();
        }
    }

    /// Consumes a newline run, or nothing at end of input.
    fn newline(&mut self) -> Newline {
        match self.eat(K::Newline) {
            Some(token) => Newline::from_raw(&token.text),
            None => Newline::default(),
        }
    }

    // Translation unit

    fn translation_unit(&mut self) -> Result<TranslationUnit, InternalError> {
        let leading = self.at(K::Newline).then(|| self.newline());
        let body = if self.at_any(&[K::Pro, K::Function]) {
            UnitBody::Program(self.program()?)
        } else {
            UnitBody::Statements(self.statement_list(&[])?)
        };
        if !self.at(K::Eof) {
            let token = self.peek();
            return Err(InternalError::UnexpectedToken {
                expected: "end of input",
                found: token.text.clone(),
                line: token.line,
            });
        }
        Ok(TranslationUnit { leading, body })
    }

    fn program(&mut self) -> Result<Vec<SubroutineDefinition>, InternalError> {
        let mut routines = Vec::new();
        while !self.at(K::Eof) {
            if self.at_any(&[K::Pro, K::Function]) {
                if let Some(routine) = self.routine()? {
                    routines.push(routine);
                }
            } else {
                self.report(self.pos);
                self.skip_line();
                self.newline();
            }
        }
        Ok(routines)
    }

    fn routine(&mut self) -> Result<Option<SubroutineDefinition>, InternalError> {
        let keyword = self.bump();
        let kind = if keyword.kind == K::Pro {
            RoutineKind::Procedure
        } else {
            RoutineKind::Function
        };

        let Some(name) = self.eat(K::Identifier).map(|t| Name::new(t.text)) else {
            self.report(self.pos);
            while !self.at_any(&[K::End, K::Eof]) {
                self.bump();
            }
            self.eat(K::End);
            self.skip_line();
            self.newline();
            return Ok(None);
        };

        let mut params = Vec::new();
        while self.eat(K::Comma).is_some() {
            match self.parameter() {
                Ok(param) => params.push(param),
                Err(ParseError::Syntax(at)) => {
                    self.report(at);
                    self.skip_line();
                    break;
                }
                Err(ParseError::Internal(err)) => return Err(err),
            }
        }
        if !self.at_line_end() {
            self.report(self.pos);
            self.skip_line();
        }
        let header_newline = self.newline();
        let body = self.statement_list(&[K::End])?;
        if self.eat(K::End).is_none() {
            self.report(self.pos);
        }
        let end_newline = self.newline();

        Ok(Some(SubroutineDefinition {
            line: keyword.line,
            kind,
            name,
            params,
            header_newline,
            body,
            end_newline,
        }))
    }

    fn parameter(&mut self) -> ParseResult<Parameter> {
        if self.at(K::Extra) {
            let extra = self.bump().text.to_ascii_uppercase();
            self.expect(K::Equals)?;
            let var = self.expect_any(&[K::Identifier, K::Extra])?.text;
            return Ok(Parameter::Extra { extra, var });
        }
        let name = self.ident()?;
        if self.eat(K::Equals).is_some() {
            let var = self.ident()?;
            return Ok(Parameter::Keyword { key: name, var });
        }
        Ok(Parameter::Positional(name))
    }

    // Statements

    /// Statements up to (not including) one of `stop`, or end of input.
    fn statement_list(&mut self, stop: &[TokenKind]) -> Result<StatementList, InternalError> {
        let mut lines = Vec::new();
        while !self.at(K::Eof) && !self.at_any(stop) {
            let statement = self.statement_or_error()?;
            let newline = self.newline();
            lines.push(StatementLine { statement, newline });
        }
        Ok(StatementList { lines })
    }

    /// A statement that must end its line, or the error node replacing it.
    fn statement_or_error(&mut self) -> Result<Statement, InternalError> {
        let start = self.pos;
        let line = self.peek().line;
        let failed_at = match self.statement() {
            Ok(statement) if self.at_line_end() => return Ok(statement),
            Ok(_) => self.pos,
            Err(ParseError::Syntax(at)) => at,
            Err(ParseError::Internal(err)) => return Err(err),
        };
        self.report(failed_at);
        self.skip_line();
        let text = self.tokens[start..self.pos]
            .iter()
            .filter(|t| t.kind != K::Newline)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Statement::Error { line, text })
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        match self.kind() {
            K::If => self.if_statement(),
            K::Case | K::Switch => self.selection_statement(),
            K::For => self.for_statement(),
            K::Foreach => self.foreach_statement(),
            K::While => self.while_statement(),
            K::Repeat => self.repeat_statement(),
            K::Identifier if self.nth(1) == K::Colon => self.labeled_statement(),
            _ => Ok(Statement::Simple(self.simple_statement()?)),
        }
    }

    fn labeled_statement(&mut self) -> ParseResult<Statement> {
        let line = self.peek().line;
        let label = self.ident()?;
        self.expect(K::Colon)?;
        let newline = self.at(K::Newline).then(|| self.newline());
        let statement = self.statement()?;
        Ok(Statement::Labeled {
            line,
            label,
            newline,
            statement: Box::new(statement),
        })
    }

    /// `BEGIN` block closed by one of `ends`, or a single statement.
    fn body(&mut self, ends: &[TokenKind]) -> ParseResult<Body> {
        if self.eat(K::Begin).is_none() {
            return Ok(Body::Single(Box::new(self.statement()?)));
        }
        let newline = Newline::from_raw(&self.expect(K::Newline)?.text);
        let statements = self.statement_list(BLOCK_ENDS)?;
        let end = self.expect_any(ends)?.text.to_ascii_uppercase();
        Ok(Body::Block {
            newline,
            statements,
            end,
        })
    }

    fn if_statement(&mut self) -> ParseResult<Statement> {
        let line = self.bump().line;
        let condition = self.expression()?;
        self.expect(K::Then)?;
        let then_body = self.body(&[K::EndIf, K::End])?;
        let else_body = match self.eat(K::Else) {
            Some(_) => Some(self.body(&[K::EndElse, K::End])?),
            None => None,
        };
        Ok(Statement::If(IfStatement {
            line,
            condition,
            then_body,
            else_body,
        }))
    }

    fn selection_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.bump();
        let (kind, ends) = if keyword.kind == K::Case {
            (SelectionKind::Case, [K::EndCase, K::End])
        } else {
            (SelectionKind::Switch, [K::EndSwitch, K::End])
        };
        let subject = self.expression()?;
        self.expect(K::Of)?;
        let newline = Newline::from_raw(&self.expect(K::Newline)?.text);

        let mut clauses = Vec::new();
        while !self.at(K::Else) && !self.at(K::Eof) && !self.at_any(BLOCK_ENDS) {
            let value = self.expression()?;
            let body = self.clause_body()?;
            clauses.push(SelectionClause { value, body });
        }
        let else_clause = match self.eat(K::Else) {
            Some(_) => Some(self.clause_body()?),
            None => None,
        };
        let end = self.expect_any(&ends)?.text.to_ascii_uppercase();

        Ok(Statement::Selection(SelectionStatement {
            line: keyword.line,
            kind,
            subject,
            newline,
            clauses,
            else_clause,
            end,
        }))
    }

    fn clause_body(&mut self) -> ParseResult<ClauseBody> {
        self.expect(K::Colon)?;
        if self.at(K::Newline) {
            return Ok(ClauseBody::Empty(self.newline()));
        }
        if self.eat(K::Begin).is_some() {
            let open = Newline::from_raw(&self.expect(K::Newline)?.text);
            let statements = self.statement_list(BLOCK_ENDS)?;
            self.expect(K::End)?;
            let close = Newline::from_raw(&self.expect(K::Newline)?.text);
            return Ok(ClauseBody::Block {
                open,
                statements,
                close,
            });
        }
        let statement = self.statement_or_error()?;
        let newline = Newline::from_raw(&self.expect(K::Newline)?.text);
        Ok(ClauseBody::Single(Box::new(statement), newline))
    }

    fn for_statement(&mut self) -> ParseResult<Statement> {
        let line = self.bump().line;
        let var = self.ident()?;
        self.expect(K::Equals)?;
        let start = self.expression()?;
        self.expect(K::Comma)?;
        let limit = self.expression()?;
        let step = match self.eat(K::Comma) {
            Some(_) => Some(self.expression()?),
            None => None,
        };
        self.expect(K::Do)?;
        let body = self.body(&[K::EndFor, K::End])?;
        Ok(Statement::For(ForStatement {
            line,
            var,
            start,
            limit,
            step,
            body,
        }))
    }

    fn foreach_statement(&mut self) -> ParseResult<Statement> {
        let line = self.bump().line;
        let var = self.ident()?;
        self.expect(K::Comma)?;
        let iterable = self.expression()?;
        let key = match self.eat(K::Comma) {
            Some(_) => Some(self.ident()?),
            None => None,
        };
        self.expect(K::Do)?;
        let body = self.body(&[K::EndForeach, K::End])?;
        Ok(Statement::Foreach(ForeachStatement {
            line,
            var,
            iterable,
            key,
            body,
        }))
    }

    fn while_statement(&mut self) -> ParseResult<Statement> {
        let line = self.bump().line;
        let condition = self.expression()?;
        self.expect(K::Do)?;
        let body = self.body(&[K::EndWhile, K::End])?;
        Ok(Statement::While(WhileStatement {
            line,
            condition,
            body,
        }))
    }

    fn repeat_statement(&mut self) -> ParseResult<Statement> {
        let line = self.bump().line;
        let body = self.body(&[K::EndRep, K::End])?;
        self.expect(K::Until)?;
        let condition = self.expression()?;
        Ok(Statement::Repeat(RepeatStatement {
            line,
            body,
            condition,
        }))
    }

    fn simple_statement(&mut self) -> ParseResult<SimpleStatement> {
        let line = self.peek().line;
        match self.kind() {
            K::Common => {
                self.bump();
                let names = self.identifier_list()?;
                Ok(SimpleStatement::Common { line, names })
            }
            K::CompileOpt => {
                self.bump();
                let names = self.identifier_list()?;
                Ok(SimpleStatement::CompileOpt { line, names })
            }
            K::ForwardFunction => {
                self.bump();
                let names = self.identifier_list()?;
                Ok(SimpleStatement::ForwardFunction { line, names })
            }
            K::Return => {
                self.bump();
                let value = match self.eat(K::Comma) {
                    Some(_) => Some(self.expression()?),
                    None => None,
                };
                Ok(SimpleStatement::Jump(Jump::Return { line, value }))
            }
            K::Goto => {
                self.bump();
                self.expect(K::Comma)?;
                let label = self.ident()?;
                Ok(SimpleStatement::Jump(Jump::Goto { line, label }))
            }
            K::Break => {
                self.bump();
                Ok(SimpleStatement::Jump(Jump::Break { line }))
            }
            K::Continue => {
                self.bump();
                Ok(SimpleStatement::Jump(Jump::Continue { line }))
            }
            K::Identifier if CALL_FOLLOWERS.contains(&self.nth(1)) => {
                let name = self.ident()?;
                let args = match self.eat(K::Comma) {
                    Some(_) => self.argument_list()?,
                    None => Vec::new(),
                };
                Ok(SimpleStatement::Call(ProcedureCall { line, name, args }))
            }
            K::PlusPlus | K::MinusMinus => {
                let decrement = self.bump().kind == K::MinusMinus;
                let target = self.pointer_expression()?;
                Ok(SimpleStatement::Increment(Increment {
                    line,
                    target,
                    decrement,
                    prefix: true,
                }))
            }
            _ => {
                let target = self.pointer_expression()?;
                match self.kind() {
                    K::PlusPlus | K::MinusMinus => {
                        let decrement = self.bump().kind == K::MinusMinus;
                        Ok(SimpleStatement::Increment(Increment {
                            line,
                            target,
                            decrement,
                            prefix: false,
                        }))
                    }
                    K::Equals | K::OpEquals => {
                        Ok(SimpleStatement::Assign(self.assignment(line, target)?))
                    }
                    _ => self.unexpected(),
                }
            }
        }
    }

    fn identifier_list(&mut self) -> ParseResult<Vec<Name>> {
        let mut names = vec![self.ident()?];
        while self.eat(K::Comma).is_some() {
            names.push(self.ident()?);
        }
        Ok(names)
    }

    /// The operator and value of an assignment whose target is parsed.
    fn assignment(&mut self, line: u32, target: Expr) -> ParseResult<Assignment> {
        let token = self.expect_any(&[K::Equals, K::OpEquals])?;
        let op = AssignOp::from_lexeme(&token.text).ok_or(ParseError::Syntax(self.pos - 1))?;
        let value = self.expression()?;
        Ok(Assignment {
            line,
            target,
            op,
            value,
        })
    }

    fn argument_list(&mut self) -> ParseResult<Vec<Argument>> {
        let mut args = vec![self.argument()?];
        while self.eat(K::Comma).is_some() {
            args.push(self.argument()?);
        }
        Ok(args)
    }

    fn argument(&mut self) -> ParseResult<Argument> {
        match (self.kind(), self.nth(1)) {
            (K::Divide, _) => {
                self.bump();
                Ok(Argument::Flag(self.ident()?))
            }
            (K::Extra, K::Equals) => {
                let extra = self.bump().text.to_ascii_uppercase();
                self.bump();
                let var = self.expect_any(&[K::Identifier, K::Extra])?.text;
                Ok(Argument::Extra { extra, var })
            }
            (K::Identifier, K::Equals) => {
                let name = self.ident()?;
                self.bump();
                let value = self.expression()?;
                Ok(Argument::Keyword { name, value })
            }
            _ => Ok(Argument::Positional(self.expression()?)),
        }
    }

    // Expressions, lowest precedence first

    fn expression(&mut self) -> ParseResult<Expr> {
        let line = self.peek().line;
        let expr = self.conditional()?;
        if self.at_any(&[K::Equals, K::OpEquals]) && expr.is_pointer_expression() {
            let assignment = self.assignment(line, expr)?;
            return Ok(Expr::Assign(Box::new(assignment)));
        }
        Ok(expr)
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let condition = self.logical()?;
        if self.eat(K::Question).is_none() {
            return Ok(condition);
        }
        let then_value = self.expression()?;
        self.expect(K::Colon)?;
        let else_value = self.conditional()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        })
    }

    fn logical(&mut self) -> ParseResult<Expr> {
        let mut lhs = if self.eat(K::Tilde).is_some() {
            unary(UnaryOp::LogicalNot, self.bitwise()?)
        } else {
            self.bitwise()?
        };
        loop {
            let op = match self.kind() {
                K::AmpAmp => BinaryOp::LogicalAnd,
                K::PipePipe => BinaryOp::LogicalOr,
                _ => return Ok(lhs),
            };
            self.bump();
            lhs = binary(op, lhs, self.bitwise()?);
        }
    }

    fn bitwise(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.kind() {
                K::And => BinaryOp::BitAnd,
                K::Or => BinaryOp::BitOr,
                K::Xor => BinaryOp::BitXor,
                _ => return Ok(lhs),
            };
            self.bump();
            lhs = binary(op, lhs, self.relational()?);
        }
    }

    fn relational(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.kind() {
                K::Eq => BinaryOp::Eq,
                K::Ne => BinaryOp::Ne,
                K::Le => BinaryOp::Le,
                K::Lt => BinaryOp::Lt,
                K::Ge => BinaryOp::Ge,
                K::Gt => BinaryOp::Gt,
                _ => return Ok(lhs),
            };
            self.bump();
            lhs = binary(op, lhs, self.additive()?);
        }
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = if self.eat(K::Not).is_some() {
            unary(UnaryOp::BitNot, self.multiplicative()?)
        } else {
            self.multiplicative()?
        };
        loop {
            let op = match self.kind() {
                K::Plus => BinaryOp::Add,
                K::Minus => BinaryOp::Sub,
                K::LessThan => BinaryOp::Min,
                K::GreaterThan => BinaryOp::Max,
                _ => return Ok(lhs),
            };
            self.bump();
            lhs = binary(op, lhs, self.multiplicative()?);
        }
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.exponent()?;
        loop {
            let op = match self.kind() {
                K::Times => BinaryOp::Mul,
                K::Pound => BinaryOp::ColMatMul,
                K::PoundPound => BinaryOp::MatMul,
                K::Divide => BinaryOp::Div,
                K::Mod => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.bump();
            lhs = binary(op, lhs, self.exponent()?);
        }
    }

    fn exponent(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        while self.eat(K::Caret).is_some() {
            lhs = binary(BinaryOp::Pow, lhs, self.unary()?);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let line = self.peek().line;
        match self.kind() {
            K::Plus => {
                self.bump();
                Ok(unary(UnaryOp::Plus, self.pointer_expression()?))
            }
            K::Minus => {
                self.bump();
                Ok(unary(UnaryOp::Minus, self.pointer_expression()?))
            }
            K::PlusPlus | K::MinusMinus => {
                let decrement = self.bump().kind == K::MinusMinus;
                let target = self.pointer_expression()?;
                Ok(Expr::Increment(Box::new(Increment {
                    line,
                    target,
                    decrement,
                    prefix: true,
                })))
            }
            _ => {
                let target = self.pointer_expression()?;
                if !self.at_any(&[K::PlusPlus, K::MinusMinus]) {
                    return Ok(target);
                }
                let decrement = self.bump().kind == K::MinusMinus;
                Ok(Expr::Increment(Box::new(Increment {
                    line,
                    target,
                    decrement,
                    prefix: false,
                })))
            }
        }
    }

    fn pointer_expression(&mut self) -> ParseResult<Expr> {
        if self.eat(K::Times).is_some() {
            return Ok(Expr::Deref(Box::new(self.pointer_expression()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = if self.at(K::Identifier) && self.nth(1) == K::LParen {
            let name = self.ident()?;
            self.bump();
            let args = if self.at(K::RParen) {
                Vec::new()
            } else {
                self.argument_list()?
            };
            self.expect(K::RParen)?;
            Expr::Call { name, args }
        } else {
            self.primary()?
        };

        loop {
            match self.kind() {
                K::LBracket => {
                    self.bump();
                    let subscripts = self.subscript_list()?;
                    self.expect(K::RBracket)?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        subscripts,
                    };
                }
                K::Dot => {
                    self.bump();
                    if self.eat(K::LParen).is_some() {
                        let index = self.expression()?;
                        self.expect(K::RParen)?;
                        expr = Expr::FieldIndex {
                            base: Box::new(expr),
                            index: Box::new(index),
                        };
                    } else {
                        let field = self.ident()?;
                        expr = Expr::Member {
                            base: Box::new(expr),
                            field,
                        };
                    }
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            K::Identifier => {
                self.bump();
                Ok(Expr::Name(Name::new(token.text)))
            }
            K::SysVar => {
                self.bump();
                Ok(Expr::SysVar(Name::new(token.text)))
            }
            K::Number => {
                self.bump();
                let number =
                    Number::parse(&token.text).ok_or_else(|| InternalError::InvalidNumber {
                        lexeme: token.text.clone(),
                        line: token.line,
                    })?;
                Ok(Expr::Number(number))
            }
            K::String => {
                self.bump();
                Ok(Expr::Str(StringLit::new(token.text)))
            }
            K::LParen => {
                self.bump();
                let inner = self.expression()?;
                self.expect(K::RParen)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            K::LBracket => {
                self.bump();
                let mut items = vec![self.expression()?];
                while self.eat(K::Comma).is_some() {
                    items.push(self.expression()?);
                }
                self.expect(K::RBracket)?;
                Ok(Expr::Array(items))
            }
            K::LBrace => {
                self.bump();
                let body = self.structure_body()?;
                self.expect(K::RBrace)?;
                Ok(Expr::Struct(body))
            }
            _ => self.unexpected(),
        }
    }

    fn subscript_list(&mut self) -> ParseResult<Vec<Subscript>> {
        let mut subscripts = vec![self.subscript()?];
        while self.eat(K::Comma).is_some() {
            subscripts.push(self.subscript()?);
        }
        Ok(subscripts)
    }

    fn subscript(&mut self) -> ParseResult<Subscript> {
        if self.at(K::Times) && matches!(self.nth(1), K::RBracket | K::Comma) {
            self.bump();
            return Ok(Subscript::All);
        }
        let start = self.expression()?;
        if self.eat(K::Colon).is_none() {
            return Ok(Subscript::Index(start));
        }
        let end = if self.at(K::Times) && matches!(self.nth(1), K::RBracket | K::Comma | K::Colon)
        {
            self.bump();
            None
        } else {
            Some(self.expression()?)
        };
        let step = match self.eat(K::Colon) {
            Some(_) => Some(self.expression()?),
            None => None,
        };
        Ok(Subscript::Range { start, end, step })
    }

    fn structure_body(&mut self) -> ParseResult<StructBody> {
        let mut name = None;
        if self.at(K::Identifier) && matches!(self.nth(1), K::Comma | K::RBrace) {
            name = Some(self.ident()?);
            if self.eat(K::Comma).is_none() {
                return Ok(StructBody {
                    name,
                    fields: Vec::new(),
                });
            }
        }
        let mut fields = vec![self.structure_field()?];
        while self.eat(K::Comma).is_some() {
            fields.push(self.structure_field()?);
        }
        Ok(StructBody { name, fields })
    }

    fn structure_field(&mut self) -> ParseResult<StructField> {
        if self.eat(K::Inherits).is_some() {
            return Ok(StructField::Inherits(self.ident()?));
        }
        let name = self.ident()?;
        self.expect(K::Colon)?;
        let value = self.expression()?;
        Ok(StructField::Field { name, value })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> TranslationUnit {
        let mut errors = ErrorLog::new();
        let unit = parse(source, &mut errors).unwrap();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        unit
    }

    fn statements(source: &str) -> Vec<Statement> {
        match parse_ok(source).body {
            UnitBody::Statements(list) => list.lines.into_iter().map(|l| l.statement).collect(),
            UnitBody::Program(_) => panic!("expected main-level statements"),
        }
    }

    fn expr(source: &str) -> Expr {
        match statements(&format!("x = {source}")).remove(0) {
            Statement::Simple(SimpleStatement::Assign(a)) => a.value,
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    fn name(s: &str) -> Box<Expr> {
        Box::new(Expr::Name(Name::new(s)))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(expr("a + b * c").to_string(), "A + B * C");
        let Expr::Binary { op, rhs, .. } = expr("a + b * c") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));

        // NOT binds to the first multiplicative operand only
        let Expr::Binary { op, lhs, .. } = expr("not a + b") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*lhs, Expr::Unary { op: UnaryOp::BitNot, .. }));

        // exponent is left associative and binds tighter than unary minus's operand
        let Expr::Binary { op, lhs, .. } = expr("-a ^ 2") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Pow);
        assert!(matches!(*lhs, Expr::Unary { op: UnaryOp::Minus, .. }));
    }

    #[test]
    fn test_ternary_and_relational() {
        assert_eq!(
            expr("a gt 0 ? a : -a"),
            Expr::Ternary {
                condition: Box::new(Expr::Binary {
                    op: BinaryOp::Gt,
                    lhs: name("a"),
                    rhs: Box::new(Expr::Number(Number::parse("0").unwrap())),
                }),
                then_value: name("a"),
                else_value: Box::new(Expr::Unary {
                    op: UnaryOp::Minus,
                    operand: name("a"),
                }),
            }
        );
    }

    #[test]
    fn test_postfix_forms() {
        assert_eq!(expr("a[*, 1:*:2]").to_string(), "A[*, 1:*:2]");
        assert_eq!(expr("s.f[0].g").to_string(), "S.F[0].G");
        assert_eq!(expr("s.(1)").to_string(), "S.(1)");
        assert_eq!(expr("*p").to_string(), "*P");
        assert_eq!(expr("f()").to_string(), "F()");
        assert_eq!(expr("f(a, /b, c=1)").to_string(), "F(A, /B, C=1)");
        assert_eq!(expr("[1, 2, 3]").to_string(), "[1, 2, 3]");
        assert_eq!(expr("{pt, x: 1, inherits base}").to_string(), "{PT, X: 1, INHERITS BASE}");
        assert_eq!(expr("{pt}").to_string(), "{PT}");
    }

    #[test]
    fn test_procedure_calls() {
        let stmts = statements("plot, x, y, /xlog, title='T', _extra=e\nclose\n");
        let Statement::Simple(SimpleStatement::Call(call)) = &stmts[0] else {
            panic!("expected call");
        };
        assert_eq!(call.name.upper(), "PLOT");
        assert_eq!(call.args.len(), 5);
        assert!(matches!(&call.args[2], Argument::Flag(n) if n.upper() == "XLOG"));
        assert!(matches!(&call.args[3], Argument::Keyword { name, .. } if name.upper() == "TITLE"));
        assert!(matches!(&call.args[4], Argument::Extra { extra, var } if extra == "_EXTRA" && var == "e"));
        assert!(
            matches!(&stmts[1], Statement::Simple(SimpleStatement::Call(c)) if c.args.is_empty())
        );
    }

    #[test]
    fn test_assignments_and_increments() {
        let stmts = statements("x += 1\na[i] = 2\ny++\n--z\n");
        assert!(matches!(
            &stmts[0],
            Statement::Simple(SimpleStatement::Assign(a)) if a.op == AssignOp::Add
        ));
        assert!(matches!(
            &stmts[1],
            Statement::Simple(SimpleStatement::Assign(Assignment { target: Expr::Index { .. }, .. }))
        ));
        assert!(matches!(
            &stmts[2],
            Statement::Simple(SimpleStatement::Increment(Increment { decrement: false, prefix: false, .. }))
        ));
        assert!(matches!(
            &stmts[3],
            Statement::Simple(SimpleStatement::Increment(Increment { decrement: true, prefix: true, .. }))
        ));
    }

    #[test]
    fn test_compound_statements() {
        let source = "\
if x gt 0 then begin
  y = 1
endif else y = 2
for i = 0, n - 1 do s += i
foreach v, list, k do print, v
while i lt 10 do i++
repeat begin
  i--
endrep until i eq 0
case x of
  1: y = 1
  2: begin
    y = 2
  end
  3:
  else: y = 0
endcase
";
        let stmts = statements(source);
        assert_eq!(stmts.len(), 6);
        assert!(matches!(&stmts[0], Statement::If(s) if s.else_body.is_some()));
        assert!(matches!(&stmts[1], Statement::For(s) if s.step.is_none()));
        assert!(matches!(&stmts[2], Statement::Foreach(s) if s.key.is_some()));
        assert!(matches!(&stmts[3], Statement::While(_)));
        assert!(matches!(&stmts[4], Statement::Repeat(_)));
        let Statement::Selection(case) = &stmts[5] else {
            panic!("expected selection");
        };
        assert_eq!(case.kind, SelectionKind::Case);
        assert_eq!(case.clauses.len(), 3);
        assert!(matches!(case.clauses[1].body, ClauseBody::Block { .. }));
        assert!(matches!(case.clauses[2].body, ClauseBody::Empty(_)));
        assert!(case.else_clause.is_some());
        assert_eq!(case.end, "ENDCASE");
    }

    #[test]
    fn test_labels_and_jumps() {
        let stmts = statements("retry: x = 1\ndone:\n  goto, retry\n");
        assert!(matches!(&stmts[0], Statement::Labeled { newline: None, .. }));
        let Statement::Labeled { newline, statement, .. } = &stmts[1] else {
            panic!("expected label");
        };
        assert!(newline.is_some());
        assert!(matches!(**statement, Statement::Simple(SimpleStatement::Jump(Jump::Goto { .. }))));
    }

    #[test]
    fn test_program() {
        let unit = parse_ok(
            "; leading\npro hello, a, key=k, _extra=e\n  print, a\nend\n\nfunction sq, x\n  return, x^2\nend\n",
        );
        assert!(unit.leading.is_some());
        let UnitBody::Program(routines) = unit.body else {
            panic!("expected program");
        };
        assert_eq!(routines.len(), 2);
        assert_eq!(routines[0].kind, RoutineKind::Procedure);
        assert_eq!(routines[0].params.len(), 3);
        assert_eq!(routines[1].name.upper(), "SQ");
        assert_eq!(routines[1].line, 6);
        assert_eq!(routines[1].body.lines.len(), 1);
    }

    #[test]
    fn test_syntax_error_recovery() {
        let mut errors = ErrorLog::new();
        let unit = parse("x = 1\ny = * ]\nz = 3\n", &mut errors).unwrap();
        let rendered: Vec<String> = errors.iter().map(|d| d.to_string()).collect();
        assert_eq!(rendered, vec!["2: syntax error: invalid syntax at ']'"]);
        let UnitBody::Statements(list) = unit.body else {
            panic!("expected statements");
        };
        assert_eq!(list.lines.len(), 3);
        assert_eq!(
            list.lines[1].statement,
            Statement::Error {
                line: 2,
                text: "y = * ]".to_string()
            }
        );
    }

    #[test]
    fn test_missing_end() {
        let mut errors = ErrorLog::new();
        let unit = parse("pro p\n  x = 1\n", &mut errors).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(unit.body, UnitBody::Program(r) if r.len() == 1));
    }

    #[test]
    fn test_source_round_trip() {
        let source = "\
pro p, a, b ; header
  compile_opt idl2
  if a then begin
    b = a[1:*] # 2
  endif else b = 0
  case a of
    1: b = 1
    else:
  endcase
end
";
        let first = parse_ok(source).to_string();
        let second = parse_ok(&first).to_string();
        assert_eq!(first, second);
        assert!(first.starts_with("PRO P, A, B ; header\n    COMPILE_OPT IDL2\n"));
    }
}
