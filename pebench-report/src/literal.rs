//! Parser for the Python literal cells of the benchmark CSV.
//!
//! The estimator harness writes its dict and list columns with Python's
//! `repr`, e.g. `{'k5': 0.539, 'k6': 0.672}` and `[['k5', '0.54'], ['x1', 1.2]]`.
//! This module parses that subset: strings, numbers, lists, tuples, dicts,
//! `True`, `False` and `None`.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors from parsing a literal cell.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("trailing input at offset {0}")]
    TrailingInput(usize),

    #[error("expected {expected}, found {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },
}

/// A parsed Python literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    None,
    List(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    fn kind(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Num(_) => "number",
            Literal::Bool(_) => "bool",
            Literal::None => "None",
            Literal::List(_) => "list",
            Literal::Dict(_) => "dict",
        }
    }

    /// Numeric value, accepting quoted numbers such as `'0.54'`.
    pub fn as_f64(&self) -> Result<f64, LiteralError> {
        match self {
            Literal::Num(v) => Ok(*v),
            Literal::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| LiteralError::InvalidNumber(s.clone())),
            other => Err(LiteralError::Shape {
                expected: "number",
                found: other.kind(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, LiteralError> {
        match self {
            Literal::Str(s) => Ok(s),
            other => Err(LiteralError::Shape {
                expected: "string",
                found: other.kind(),
            }),
        }
    }
}

/// Parse a complete literal; trailing non-whitespace is an error.
pub fn parse(input: &str) -> Result<Literal, LiteralError> {
    let mut p = Parser {
        chars: input.char_indices().collect(),
        pos: 0,
    };
    let value = p.value()?;
    p.skip_ws();
    if let Some(&(offset, _)) = p.chars.get(p.pos) {
        return Err(LiteralError::TrailingInput(offset));
    }
    Ok(value)
}

fn is_blank(cell: &str) -> bool {
    let t = cell.trim();
    t.is_empty() || t.eq_ignore_ascii_case("nan")
}

/// Parse a dict cell (`{'k': 1.0}`) into name → value. Blank cells are empty.
pub fn parse_value_dict(cell: &str) -> Result<BTreeMap<String, f64>, LiteralError> {
    if is_blank(cell) {
        return Ok(BTreeMap::new());
    }
    match parse(cell)? {
        Literal::Dict(entries) => entries
            .iter()
            .map(|(k, v)| Ok((k.as_str()?.to_string(), v.as_f64()?)))
            .collect(),
        other => Err(LiteralError::Shape {
            expected: "dict",
            found: other.kind(),
        }),
    }
}

/// Parse a result cell (`[['k', 1.0], ...]`) into name → value. Blank cells are empty.
pub fn parse_pair_list(cell: &str) -> Result<BTreeMap<String, f64>, LiteralError> {
    if is_blank(cell) {
        return Ok(BTreeMap::new());
    }
    let items = match parse(cell)? {
        Literal::List(items) => items,
        other => {
            return Err(LiteralError::Shape {
                expected: "list",
                found: other.kind(),
            })
        }
    };
    let mut out = BTreeMap::new();
    for item in &items {
        match item {
            Literal::List(pair) if pair.len() >= 2 => {
                out.insert(pair[0].as_str()?.to_string(), pair[1].as_f64()?);
            }
            other => {
                return Err(LiteralError::Shape {
                    expected: "[name, value] pair",
                    found: other.kind(),
                })
            }
        }
    }
    Ok(out)
}

// ─── Recursive descent ───────────────────────────────────────────────

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or_else(|| self.chars.last().map(|&(o, c)| o + c.len_utf8()).unwrap_or(0))
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        let offset = self.offset();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(found) => Err(LiteralError::UnexpectedChar { found, offset }),
            None => Err(LiteralError::UnexpectedEnd),
        }
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        self.skip_ws();
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('[') => self.sequence('[', ']').map(Literal::List),
            Some('(') => self.sequence('(', ')').map(Literal::List),
            Some('{') => self.dict(),
            Some(q @ ('\'' | '"')) => self.string(q).map(Literal::Str),
            Some(c) if c.is_ascii_alphabetic() => self.word(),
            Some(_) => self.number(),
        }
    }

    /// Comma-separated values between `open` and `close`, trailing comma allowed.
    fn sequence(&mut self, open: char, close: char) -> Result<Vec<Literal>, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        offset: self.offset(),
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn dict(&mut self) -> Result<Literal, LiteralError> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Literal::Dict(entries));
            }
            let key = self.value()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                Some(found) => {
                    return Err(LiteralError::UnexpectedChar {
                        found,
                        offset: self.offset(),
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(LiteralError::UnexpectedEnd),
                Some('\\') => match self.bump() {
                    None => return Err(LiteralError::UnexpectedEnd),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn word(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().map(|&(_, c)| c).collect();
        match word.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            "inf" => Ok(Literal::Num(f64::INFINITY)),
            "nan" => Ok(Literal::Num(f64::NAN)),
            _ => Err(LiteralError::InvalidNumber(word)),
        }
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-' | '_'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            let offset = self.offset();
            let found = self.peek().unwrap_or(' ');
            return Err(LiteralError::UnexpectedChar { found, offset });
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .map(|&(_, c)| c)
            .filter(|&c| c != '_')
            .collect();
        text.parse::<f64>()
            .map(Literal::Num)
            .map_err(|_| LiteralError::InvalidNumber(text))
    }
}
