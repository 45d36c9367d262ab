//! IDL tokenizer.
//!
//! IDL is case-insensitive; lexemes keep their original spelling and the
//! parser compares kinds. Runs of line ends, `;` comments and `&`
//! separators collapse into a single [`TokenKind::Newline`] token, and `$`
//! continuations are skipped.

use std::fmt;

use crate::error::ErrorLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Punctuation
    MinusMinus,
    PipePipe,
    PlusPlus,
    PoundPound,
    AmpAmp,
    Caret,
    Colon,
    Comma,
    Divide,
    Dot,
    Equals,
    GreaterThan,
    LBrace,
    LessThan,
    LParen,
    LBracket,
    Minus,
    Plus,
    Pound,
    Question,
    RBrace,
    RParen,
    RBracket,
    Tilde,
    Times,
    /// Compound assignment such as `+=` or `AND=`.
    OpEquals,

    // Reserved words
    And,
    Begin,
    Break,
    Case,
    Common,
    CompileOpt,
    Continue,
    Do,
    Else,
    End,
    EndCase,
    EndElse,
    EndFor,
    EndForeach,
    EndIf,
    EndRep,
    EndSwitch,
    EndWhile,
    Eq,
    For,
    Foreach,
    ForwardFunction,
    Function,
    Ge,
    Goto,
    Gt,
    If,
    Inherits,
    Le,
    Lt,
    Mod,
    Ne,
    Not,
    Of,
    Or,
    Pro,
    Repeat,
    Return,
    Switch,
    Then,
    Until,
    While,
    Xor,

    // Values
    Extra,
    Identifier,
    SysVar,
    Number,
    String,
    Newline,
    Eof,
}

impl TokenKind {
    fn keyword(word: &str) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match word {
            "AND" => And,
            "BEGIN" => Begin,
            "BREAK" => Break,
            "CASE" => Case,
            "COMMON" => Common,
            "COMPILE_OPT" => CompileOpt,
            "CONTINUE" => Continue,
            "DO" => Do,
            "ELSE" => Else,
            "END" => End,
            "ENDCASE" => EndCase,
            "ENDELSE" => EndElse,
            "ENDFOR" => EndFor,
            "ENDFOREACH" => EndForeach,
            "ENDIF" => EndIf,
            "ENDREP" => EndRep,
            "ENDSWITCH" => EndSwitch,
            "ENDWHILE" => EndWhile,
            "EQ" => Eq,
            "FOR" => For,
            "FOREACH" => Foreach,
            "FORWARD_FUNCTION" => ForwardFunction,
            "FUNCTION" => Function,
            "GE" => Ge,
            "GOTO" => Goto,
            "GT" => Gt,
            "IF" => If,
            "INHERITS" => Inherits,
            "LE" => Le,
            "LT" => Lt,
            "MOD" => Mod,
            "NE" => Ne,
            "NOT" => Not,
            "OF" => Of,
            "OR" => Or,
            "PRO" => Pro,
            "REPEAT" => Repeat,
            "RETURN" => Return,
            "SWITCH" => Switch,
            "THEN" => Then,
            "UNTIL" => Until,
            "WHILE" => While,
            "XOR" => Xor,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
}

const OP_EQUALS: &[&str] = &[
    "and=", "mod=", "xor=", "eq=", "ge=", "gt=", "le=", "lt=", "ne=", "or=", "##=", "+=", "-=",
    "*=", "/=", "^=", "#=", "<=", ">=",
];

const PUNCTUATION: &[(&str, TokenKind)] = &[
    ("--", TokenKind::MinusMinus),
    ("||", TokenKind::PipePipe),
    ("++", TokenKind::PlusPlus),
    ("##", TokenKind::PoundPound),
    ("^", TokenKind::Caret),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    ("/", TokenKind::Divide),
    (".", TokenKind::Dot),
    ("=", TokenKind::Equals),
    (">", TokenKind::GreaterThan),
    ("{", TokenKind::LBrace),
    ("<", TokenKind::LessThan),
    ("(", TokenKind::LParen),
    ("[", TokenKind::LBracket),
    ("-", TokenKind::Minus),
    ("+", TokenKind::Plus),
    ("#", TokenKind::Pound),
    ("?", TokenKind::Question),
    ("}", TokenKind::RBrace),
    (")", TokenKind::RParen),
    ("]", TokenKind::RBracket),
    ("~", TokenKind::Tilde),
    ("*", TokenKind::Times),
];

/// Tokenizes `source`. Illegal characters are reported to `errors` and
/// skipped. The stream always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str, errors: &mut ErrorLog) -> Vec<Token> {
    let mut lexer = Lexer {
        src: source,
        pos: 0,
        line: 1,
        tokens: Vec::new(),
    };
    lexer.run(errors);
    lexer.tokens
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let text = &self.src[self.pos..self.pos + len];
        self.tokens.push(Token {
            kind,
            text: text.to_string(),
            line: self.line,
        });
        self.line += text.matches('\n').count() as u32;
        self.pos += len;
    }

    fn run(&mut self, errors: &mut ErrorLog) {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if let Some(len) = string_len(rest) {
                self.push(TokenKind::String, len);
            } else if let Some(len) = number_len(rest) {
                self.push(TokenKind::Number, len);
            } else if let Some(len) = op_equals_len(rest) {
                self.push(TokenKind::OpEquals, len);
            } else if let Some(len) = extra_len(rest) {
                self.push(TokenKind::Extra, len);
            } else if let Some(len) = identifier_len(rest) {
                let word = rest[..len].to_ascii_uppercase();
                let kind = if word.starts_with('!') {
                    TokenKind::SysVar
                } else {
                    TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier)
                };
                self.push(kind, len);
            } else if let Some(len) = continuation_len(rest) {
                self.line += rest[..len].matches('\n').count() as u32;
                self.pos += len;
            } else if rest.starts_with("&&") {
                self.push(TokenKind::AmpAmp, 2);
            } else if let Some(len) = newline_len(rest) {
                self.push(TokenKind::Newline, len);
            } else if let Some(len) = blank_len(rest) {
                self.pos += len;
            } else if let Some((text, kind)) =
                PUNCTUATION.iter().find(|(text, _)| rest.starts_with(text))
            {
                self.push(*kind, text.len());
            } else {
                let ch = rest.chars().next().unwrap_or('\0');
                errors.syntax(format!("illegal character '{}'", ch.escape_debug()), self.line);
                self.pos += ch.len_utf8().max(1);
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            line: self.line,
        });
    }
}

fn count_while(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|&(_, c)| !pred(c))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// `'...'` or `"..."` on one line, doubled quotes escaping. A closing quote
/// followed by a radix letter belongs to a number instead.
fn string_len(s: &str) -> Option<usize> {
    let quote = s.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let bytes = s.as_bytes();
    let mut i = 1;
    loop {
        match bytes.get(i) {
            None | Some(b'\n') => return None,
            Some(&b) if b == quote as u8 => {
                if bytes.get(i + 1) == Some(&(quote as u8)) {
                    i += 2;
                    continue;
                }
                let end = i + 1;
                if matches!(
                    bytes.get(end).map(u8::to_ascii_lowercase),
                    Some(b'x' | b'o' | b'b')
                ) {
                    return None;
                }
                return Some(end);
            }
            Some(_) => i += 1,
        }
    }
}

fn number_len(s: &str) -> Option<usize> {
    float_len(s).or_else(|| integer_len(s))
}

fn float_len(s: &str) -> Option<usize> {
    let digits = count_while(s, |c| c.is_ascii_digit());
    let after = &s[digits..];
    let mantissa = if let Some(frac) = after.strip_prefix('.') {
        let frac_digits = count_while(frac, |c| c.is_ascii_digit());
        if digits == 0 && frac_digits == 0 {
            return None;
        }
        digits + 1 + frac_digits
    } else if digits > 0 && after.starts_with(['e', 'E', 'd', 'D']) {
        digits
    } else {
        return None;
    };

    let rest = &s[mantissa..];
    if !rest.starts_with(['e', 'E', 'd', 'D']) {
        return Some(mantissa);
    }
    let exp = &rest[1..];
    let sign = usize::from(exp.starts_with(['+', '-']));
    let exp_digits = count_while(&exp[sign..], |c| c.is_ascii_digit());
    if exp_digits > 0 {
        Some(mantissa + 1 + sign + exp_digits)
    } else {
        Some(mantissa + 1)
    }
}

fn integer_len(s: &str) -> Option<usize> {
    let value = quoted_integer_len(s).or_else(|| {
        let digits = count_while(s, |c| c.is_ascii_digit());
        (digits > 0).then_some(digits)
    })?;
    Some(value + type_suffix_len(&s[value..]))
}

/// `'FF'x`, `'17'o`, `'101'b` and `"17`.
fn quoted_integer_len(s: &str) -> Option<usize> {
    if let Some(rest) = s.strip_prefix('"') {
        let digits = count_while(rest, |c| c.is_digit(8));
        return (digits > 0).then_some(1 + digits);
    }
    let rest = s.strip_prefix('\'')?;
    let body = count_while(rest, |c| c.is_ascii_hexdigit());
    if body == 0 || !rest[body..].starts_with('\'') {
        return None;
    }
    let digits = &rest[..body];
    let marker = rest[body + 1..].chars().next()?.to_ascii_lowercase();
    let valid = match marker {
        'x' => true,
        'o' => digits.chars().all(|c| c.is_digit(8)),
        'b' => digits.chars().all(|c| c == '0' || c == '1'),
        _ => false,
    };
    valid.then_some(body + 3)
}

/// `b`, or `u` followed by an optional `s`, `l` or `ll`.
fn type_suffix_len(s: &str) -> usize {
    let lower: String = s.chars().take(3).collect::<String>().to_ascii_lowercase();
    if lower.starts_with('b') {
        return 1;
    }
    let mut len = usize::from(lower.starts_with('u'));
    let rest = &lower[len..];
    if rest.starts_with("ll") {
        len += 2;
    } else if rest.starts_with('l') || rest.starts_with('s') {
        len += 1;
    }
    len
}

fn op_equals_len(s: &str) -> Option<usize> {
    let head: String = s.chars().take(4).collect::<String>().to_ascii_lowercase();
    OP_EQUALS
        .iter()
        .find(|op| head.starts_with(*op))
        .map(|op| op.len())
}

/// `_EXTRA` or `_REF_EXTRA`.
fn extra_len(s: &str) -> Option<usize> {
    let head: String = s.chars().take(10).collect::<String>().to_ascii_lowercase();
    if head.starts_with("_ref_extra") {
        Some(10)
    } else if head.starts_with("_extra") {
        Some(6)
    } else {
        None
    }
}

/// `!?[a-z][a-z0-9_$]*`
fn identifier_len(s: &str) -> Option<usize> {
    let bang = usize::from(s.starts_with('!'));
    let first = s[bang..].chars().next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let tail = count_while(&s[bang + 1..], |c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    Some(bang + 1 + tail)
}

/// `$` then, repeatedly, optional blanks and comment up to a line end.
fn continuation_len(s: &str) -> Option<usize> {
    s.strip_prefix('$')?;
    let mut pos = 1;
    let mut lines = 0;
    loop {
        let rest = &s[pos..];
        let blanks = count_while(rest, |c| c == ' ' || c == '\t' || c == '\r');
        let after = &rest[blanks..];
        let comment = if after.starts_with(';') {
            count_while(after, |c| c != '\n')
        } else {
            0
        };
        if after[comment..].starts_with('\n') {
            pos += blanks + comment + 1;
            lines += 1;
        } else {
            break;
        }
    }
    (lines > 0).then_some(pos)
}

/// `([ \t]*((;.*)?\n|&)[ \t]*)+`, where a lone `&` separates statements.
fn newline_len(s: &str) -> Option<usize> {
    let mut pos = 0;
    let mut matched = false;
    loop {
        let rest = &s[pos..];
        let blanks = count_while(rest, |c| c == ' ' || c == '\t' || c == '\r');
        let after = &rest[blanks..];
        let comment = if after.starts_with(';') {
            count_while(after, |c| c != '\n')
        } else {
            0
        };
        let tail = &after[comment..];
        let step = if tail.starts_with('\n') {
            1
        } else if comment == 0 && tail.starts_with('&') && !tail.starts_with("&&") {
            1
        } else {
            break;
        };
        pos += blanks + comment + step;
        matched = true;
        pos += count_while(&s[pos..], |c| c == ' ' || c == '\t' || c == '\r');
    }
    matched.then_some(pos)
}

fn blank_len(s: &str) -> Option<usize> {
    let len = count_while(s, |c| c == ' ' || c == '\t' || c == '\r');
    (len > 0).then_some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut errors = ErrorLog::new();
        let tokens = tokenize(source, &mut errors);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<std::string::String> {
        let mut errors = ErrorLog::new();
        tokenize(source, &mut errors)
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_statement_tokens() {
        assert_eq!(
            kinds("x = a[i] + 1\n"),
            vec![
                Identifier, Equals, Identifier, LBracket, Identifier, RBracket, Plus, Number,
                Newline, Eof
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("If x eq 1 Then print, !pi\n"),
            vec![If, Identifier, Eq, Number, Then, Identifier, Comma, SysVar, Newline, Eof]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(
            texts("'FF'x 'abc' \"ab\" 1.5e3 2d 10L 'it''s' \"17"),
            vec!["'FF'x", "'abc'", "\"ab\"", "1.5e3", "2d", "10L", "'it''s'", "\"17", ""]
        );
        assert_eq!(
            kinds("'FF'x 'abc' \"17 1."),
            vec![Number, String, Number, Number, Eof]
        );
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("x += 1 & y AND= 2 & z ##= m\n"),
            vec![
                Identifier, OpEquals, Number, Newline, Identifier, OpEquals, Number, Newline,
                Identifier, OpEquals, Identifier, Newline, Eof
            ]
        );
        assert_eq!(
            kinds("a && b || c ++ --"),
            vec![Identifier, AmpAmp, Identifier, PipePipe, Identifier, PlusPlus, MinusMinus, Eof]
        );
        assert_eq!(kinds("a[*]=0"), vec![Identifier, LBracket, Times, RBracket, Equals, Number, Eof]);
        // No method-call or static-scope tokens.
        assert_eq!(kinds("o->m"), vec![Identifier, Minus, GreaterThan, Identifier, Eof]);
        assert_eq!(kinds("a::b"), vec![Identifier, Colon, Colon, Identifier, Eof]);
    }

    #[test]
    fn test_newline_runs_merge() {
        let mut errors = ErrorLog::new();
        let tokens = tokenize("x = 1 ; first\n\n   ; second\n  y = 2\n", &mut errors);
        let newlines: Vec<&Token> = tokens.iter().filter(|t| t.kind == Newline).collect();
        assert_eq!(newlines.len(), 2);
        assert_eq!(newlines[0].text, " ; first\n\n   ; second\n  ");
        assert_eq!(newlines[0].line, 1);
        let y = tokens.iter().find(|t| t.text == "y").unwrap();
        assert_eq!(y.line, 4);
    }

    #[test]
    fn test_continuation() {
        let mut errors = ErrorLog::new();
        let tokens = tokenize("x = 1 + $ ; more\n    2\ny = 3\n", &mut errors);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![Identifier, Equals, Number, Plus, Number, Newline, Identifier, Equals, Number, Newline, Eof]
        );
        assert_eq!(tokens[4].line, 2);
        assert_eq!(tokens[6].line, 3);
    }

    #[test]
    fn test_extra_and_illegal() {
        assert_eq!(kinds("_EXTRA=e"), vec![Extra, Equals, Identifier, Eof]);
        let mut errors = ErrorLog::new();
        let tokens = tokenize("x = 1 @ 2\n", &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.iter().next().map(|d| d.to_string()).unwrap(),
            "1: syntax error: illegal character '@'"
        );
        assert_eq!(tokens.len(), 6);
    }
}
