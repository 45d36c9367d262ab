//! Constant folding of generated Python arithmetic.
//!
//! Loop bounds, slice ends and case labels are produced as text such as
//! `(10)+(1)`. When the text is integer arithmetic it is replaced by its
//! value; anything else is returned untouched.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok {
    Int(i128),
    Plus,
    Minus,
    Star,
    Power,
    Percent,
    LParen,
    RParen,
}

/// Folds `text` to an integer literal when it is constant arithmetic.
pub fn reduce_expression(text: &str) -> String {
    match evaluate(text) {
        Some(value) => value.to_string(),
        None => text.to_string(),
    }
}

/// Value of `text` when it is integer arithmetic over `+ - * % **`.
pub fn evaluate(text: &str) -> Option<i128> {
    let tokens = tokenize(text)?;
    let mut folder = Folder { tokens, pos: 0 };
    let value = folder.sum()?;
    if folder.pos == folder.tokens.len() {
        Some(value)
    } else {
        None
    }
}

fn tokenize(text: &str) -> Option<Vec<Tok>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' => i += 1,
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                    return None;
                }
                tokens.push(Tok::Int(text[start..i].parse().ok()?));
            }
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                tokens.push(Tok::Power);
                i += 2;
            }
            _ => {
                tokens.push(match c {
                    b'+' => Tok::Plus,
                    b'-' => Tok::Minus,
                    b'*' => Tok::Star,
                    b'%' => Tok::Percent,
                    b'(' => Tok::LParen,
                    b')' => Tok::RParen,
                    _ => return None,
                });
                i += 1;
            }
        }
    }
    Some(tokens)
}

/// Recursive descent with Python's precedence: `**` binds tighter than a
/// unary sign on its left and is right-associative.
struct Folder {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Folder {
    fn peek(&self) -> Option<Tok> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    fn sum(&mut self) -> Option<i128> {
        let mut value = self.product()?;
        loop {
            match self.peek() {
                Some(Tok::Plus) => {
                    self.pos += 1;
                    value = value.checked_add(self.product()?)?;
                }
                Some(Tok::Minus) => {
                    self.pos += 1;
                    value = value.checked_sub(self.product()?)?;
                }
                _ => return Some(value),
            }
        }
    }

    fn product(&mut self) -> Option<i128> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Tok::Star) => {
                    self.pos += 1;
                    value = value.checked_mul(self.unary()?)?;
                }
                Some(Tok::Percent) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0 {
                        return None;
                    }
                    // Python's modulo takes the sign of the divisor.
                    let rem = value.checked_rem(divisor)?;
                    value = if rem != 0 && (rem < 0) != (divisor < 0) {
                        rem + divisor
                    } else {
                        rem
                    };
                }
                _ => return Some(value),
            }
        }
    }

    fn unary(&mut self) -> Option<i128> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.pos += 1;
                self.unary()?.checked_neg()
            }
            Some(Tok::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Option<i128> {
        let base = self.atom()?;
        if self.peek() != Some(Tok::Power) {
            return Some(base);
        }
        self.pos += 1;
        let exponent = self.unary()?;
        // A negative exponent yields a float in Python.
        let exponent = u32::try_from(exponent).ok()?;
        base.checked_pow(exponent)
    }

    fn atom(&mut self) -> Option<i128> {
        match self.next()? {
            Tok::Int(value) => Some(value),
            Tok::LParen => {
                let value = self.sum()?;
                match self.next()? {
                    Tok::RParen => Some(value),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
