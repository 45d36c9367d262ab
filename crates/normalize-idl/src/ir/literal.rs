//! Leaf literals: numbers, strings and newline runs.

use std::fmt;

/// Radix of an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    Hex,
    Octal,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NumberKind {
    Integer {
        digits: String,
        radix: Radix,
        /// Type suffix such as `L`, `UL` or `B`; dropped on output.
        suffix: String,
    },
    Float {
        mantissa: String,
        /// `Some` when an `E` or `D` marker was present; the inner value is
        /// `None` when the exponent digits were elided (`1e`).
        exponent: Option<Option<String>>,
    },
}

/// A numeric literal, keeping its lexeme for source reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Number {
    raw: String,
    kind: NumberKind,
}

impl Number {
    /// Parses a lexeme produced by the lexer's number rule.
    pub fn parse(lexeme: &str) -> Option<Number> {
        let upper = lexeme.to_ascii_uppercase();
        let kind = if let Some(rest) = upper.strip_prefix('\'') {
            let close = rest.find('\'')?;
            let digits = &rest[..close];
            let mut tail = rest[close + 1..].chars();
            let radix = match tail.next()? {
                'X' => Radix::Hex,
                'O' => Radix::Octal,
                'B' => Radix::Binary,
                _ => return None,
            };
            let suffix: String = tail.collect();
            integer(digits, radix, &suffix)?
        } else if let Some(rest) = upper.strip_prefix('"') {
            let end = rest
                .find(|c: char| !c.is_digit(8))
                .unwrap_or(rest.len());
            integer(&rest[..end], Radix::Octal, &rest[end..])?
        } else {
            decimal(&upper)?
        };
        Some(Number { raw: upper, kind })
    }

    pub fn kind(&self) -> &NumberKind {
        &self.kind
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, NumberKind::Integer { .. })
    }

    /// Python rendering of the literal.
    pub fn to_python(&self) -> String {
        match &self.kind {
            NumberKind::Integer { digits, radix, .. } => match radix {
                Radix::Decimal => {
                    let trimmed = digits.trim_start_matches('0');
                    if trimmed.is_empty() {
                        "0".to_string()
                    } else {
                        trimmed.to_string()
                    }
                }
                Radix::Hex => format!("0x{}", digits.to_ascii_lowercase()),
                Radix::Octal => format!("0o{digits}"),
                Radix::Binary => format!("0b{digits}"),
            },
            NumberKind::Float { mantissa, exponent } => match exponent {
                None => mantissa.clone(),
                Some(value) => format!("{mantissa}e{}", value.as_deref().unwrap_or("0")),
            },
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn integer(digits: &str, radix: Radix, suffix: &str) -> Option<NumberKind> {
    let base = match radix {
        Radix::Decimal => 10,
        Radix::Hex => 16,
        Radix::Octal => 8,
        Radix::Binary => 2,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(base)) {
        return None;
    }
    if !is_type_suffix(suffix) {
        return None;
    }
    Some(NumberKind::Integer {
        digits: digits.to_string(),
        radix,
        suffix: suffix.to_string(),
    })
}

/// `B`, or `U` followed by an optional `S`, `L` or `LL`.
fn is_type_suffix(suffix: &str) -> bool {
    if suffix == "B" {
        return true;
    }
    let rest = suffix.strip_prefix('U').unwrap_or(suffix);
    matches!(rest, "" | "S" | "L" | "LL")
}

fn decimal(text: &str) -> Option<NumberKind> {
    let int_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (int_part, rest) = text.split_at(int_end);

    let (mantissa, rest) = if let Some(after_dot) = rest.strip_prefix('.') {
        let frac_end = after_dot
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_dot.len());
        if int_part.is_empty() && frac_end == 0 {
            return None;
        }
        (
            &text[..int_end + 1 + frac_end],
            &after_dot[frac_end..],
        )
    } else if rest.starts_with('E') || rest.starts_with('D') {
        if int_part.is_empty() {
            return None;
        }
        (int_part, rest)
    } else {
        return integer(int_part, Radix::Decimal, rest);
    };

    let exponent = match rest.chars().next() {
        None => None,
        Some('E') | Some('D') => {
            let value = &rest[1..];
            let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
            if value.is_empty() {
                Some(None)
            } else if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                Some(Some(value.to_string()))
            } else {
                return None;
            }
        }
        Some(_) => return None,
    };
    Some(NumberKind::Float {
        mantissa: mantissa.to_string(),
        exponent,
    })
}

/// A quoted string literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLit {
    raw: String,
}

impl StringLit {
    /// `raw` includes the surrounding quotes.
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Python rendering: backslashes are escaped (IDL has no escapes) and a
    /// doubled quote becomes an escaped quote.
    pub fn to_python(&self) -> String {
        let mut chars = self.raw.chars();
        let quote = chars.next().unwrap_or('\'');
        let inner = self
            .raw
            .get(1..self.raw.len().saturating_sub(1))
            .unwrap_or("");
        let doubled: String = [quote, quote].iter().collect();
        let escaped = inner
            .replace('\\', "\\\\")
            .replace(&doubled, &format!("\\{quote}"));
        format!("{quote}{escaped}{quote}")
    }
}

impl fmt::Display for StringLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A run of line terminators, `;` comments and `&` separators.
///
/// Stored as physical line fragments: the first is kept verbatim (it may
/// carry spacing before a trailing comment), later ones are trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Newline {
    lines: Vec<String>,
}

impl Newline {
    pub fn from_raw(raw: &str) -> Self {
        let lines = raw
            .split('\n')
            .enumerate()
            .map(|(i, fragment)| {
                let fragment = if i == 0 { fragment } else { fragment.trim() };
                if fragment.trim().is_empty() {
                    return String::new();
                }
                let mut fragment = fragment.to_string();
                if fragment.starts_with('&') {
                    fragment.insert(0, ' ');
                }
                if fragment.ends_with('&') {
                    fragment.push(' ');
                }
                fragment
            })
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Python rendering: `;` comment marks become `#`, `&` becomes `;`.
    pub fn to_python(&self) -> String {
        self.lines
            .iter()
            .map(|line| python_fragment(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Docstring for a `;+ ... ;-` comment block, quoted and ready to emit.
    pub fn docstring(&self) -> Option<String> {
        let python = self.to_python();
        let text = python.trim();
        if !text.starts_with("#+") || !text.ends_with("#-") {
            return None;
        }
        let lines: Vec<&str> = text.split('\n').collect();
        if lines.len() < 2 {
            return None;
        }
        let body: Vec<String> = lines[1..lines.len() - 1]
            .iter()
            .map(|line| line.replacen('#', "", 1))
            .collect();
        Some(format!("\"\"\"\n{}\n\"\"\"", body.join("\n")))
    }
}

fn python_fragment(line: &str) -> String {
    let (code, comment) = match line.find(';') {
        Some(pos) => line.split_at(pos),
        None => (line, ""),
    };
    let marks = comment.len() - comment.trim_start_matches(';').len();
    format!(
        "{}{}{}",
        code.replace('&', ";"),
        "#".repeat(marks),
        &comment[marks..]
    )
}

impl fmt::Display for Newline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn py(lexeme: &str) -> String {
        Number::parse(lexeme).expect("valid number").to_python()
    }

    #[test]
    fn test_integer_rendering() {
        assert_eq!(py("42"), "42");
        assert_eq!(py("42L"), "42");
        assert_eq!(py("7ull"), "7");
        assert_eq!(py("007"), "7");
        assert_eq!(py("0"), "0");
        assert_eq!(py("'FF'x"), "0xff");
        assert_eq!(py("'17'o"), "0o17");
        assert_eq!(py("\"17"), "0o17");
        assert_eq!(py("'101'b"), "0b101");
        assert_eq!(py("12b"), "12");
    }

    #[test]
    fn test_float_rendering() {
        assert_eq!(py("1.5"), "1.5");
        assert_eq!(py("1."), "1.");
        assert_eq!(py(".5"), ".5");
        assert_eq!(py("1.5e3"), "1.5e3");
        assert_eq!(py("2d-4"), "2e-4");
        assert_eq!(py("3e"), "3e0");
        assert_eq!(py("1.0D"), "1.0e0");
    }

    #[test]
    fn test_number_source_is_upper_case() {
        let n = Number::parse("'ff'x").unwrap();
        assert_eq!(n.to_string(), "'FF'X");
        assert!(n.is_integer());
        assert!(!Number::parse("1e5").unwrap().is_integer());
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(Number::parse("'GG'x").is_none());
        assert!(Number::parse("'12'b").is_none());
        assert!(Number::parse("12q").is_none());
        assert!(Number::parse(".").is_none());
    }

    #[test]
    fn test_string_rendering() {
        assert_eq!(StringLit::new("'it''s'").to_python(), "'it\\'s'");
        assert_eq!(StringLit::new("\"a\"\"b\"").to_python(), "\"a\\\"b\"");
        assert_eq!(StringLit::new("'C:\\tmp'").to_python(), "'C:\\\\tmp'");
    }

    #[test]
    fn test_newline_fragments() {
        let nl = Newline::from_raw("  ; comment\n    ;; more\n   ");
        assert_eq!(nl.lines(), &["  ; comment", ";; more", ""]);
        assert_eq!(nl.to_python(), "  # comment\n## more\n");
        assert_eq!(nl.to_string(), "  ; comment\n;; more\n");
    }

    #[test]
    fn test_newline_separator() {
        let nl = Newline::from_raw(" & ");
        assert_eq!(nl.lines(), &[" & "]);
        assert_eq!(nl.to_python(), " ; ");
        let nl = Newline::from_raw("&");
        assert_eq!(nl.to_python(), " ; ");
    }

    #[test]
    fn test_docstring() {
        let nl = Newline::from_raw("\n;+\n; Adds numbers.\n;   x: input\n;-\n");
        assert_eq!(
            nl.docstring().as_deref(),
            Some("\"\"\"\n Adds numbers.\n   x: input\n\"\"\"")
        );
        let plain = Newline::from_raw("\n; just a comment\n");
        assert_eq!(plain.docstring(), None);
        let unbalanced = Newline::from_raw("\n;+\n; text\n");
        assert_eq!(unbalanced.docstring(), None);
    }
}
