//! Forward-only token streams.
//!
//! The engine never materializes an event as a tree. It walks a
//! [`TokenStream`] one token at a time, so a compound value can only be
//! inspected by stepping into it (see [`crate::infer`]).

use crate::error::{IngestError, IngestResult};

/// Deepest container nesting accepted by default, matching serde_json's
/// recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Fails when entering one more container would exceed `max_depth`.
pub(crate) fn enter_container(depth: usize, max_depth: usize) -> IngestResult<usize> {
    if depth >= max_depth {
        return Err(IngestError::malformed(format!(
            "value nested deeper than {max_depth} levels"
        )));
    }
    Ok(depth + 1)
}

/// One lexical unit of a JSON-like document.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    FieldName(String),
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Token {
    /// Name of the value shape this token starts, for error messages.
    pub fn value_kind(&self) -> &'static str {
        match self {
            Token::StartObject => "map",
            Token::StartArray => "array",
            Token::String(_) => "string",
            Token::Int(_) => "long",
            Token::Float(_) => "double",
            Token::Bool(_) => "boolean",
            Token::Null => "null",
            Token::EndObject => "end of object",
            Token::EndArray => "end of array",
            Token::FieldName(_) => "field name",
        }
    }
}

/// A forward-only cursor over tokens.
///
/// `current` is the token the cursor sits on; `next_token` moves forward and
/// returns the new current token. Running out of input while a token is
/// expected is [`IngestError::MalformedInput`].
pub trait TokenStream {
    fn current(&self) -> Option<&Token>;

    fn next_token(&mut self) -> IngestResult<&Token>;
}

/// Skips the value under the cursor. Scalars are already consumed by being
/// current; containers are skipped up to and including their end token.
pub fn skip_value<S: TokenStream + ?Sized>(stream: &mut S) -> IngestResult<()> {
    match stream.current() {
        Some(Token::StartObject | Token::StartArray) => skip_open(stream, 1),
        _ => Ok(()),
    }
}

/// Consumes tokens until `levels` already-opened containers are closed.
pub(crate) fn skip_open<S: TokenStream + ?Sized>(stream: &mut S, levels: usize) -> IngestResult<()> {
    let mut depth = levels;
    while depth > 0 {
        match stream.next_token()? {
            Token::StartObject | Token::StartArray => depth += 1,
            Token::EndObject | Token::EndArray => depth -= 1,
            _ => {}
        }
    }
    Ok(())
}

/// Reads the value under the cursor into a `serde_json::Value`.
///
/// Only used for small envelope sections; event properties are never
/// materialized this way. Nesting is limited to [`DEFAULT_MAX_DEPTH`].
pub fn read_json<S: TokenStream + ?Sized>(stream: &mut S) -> IngestResult<serde_json::Value> {
    read_json_at(stream, 0)
}

fn read_json_at<S: TokenStream + ?Sized>(
    stream: &mut S,
    depth: usize,
) -> IngestResult<serde_json::Value> {
    use serde_json::Value;

    let value = match stream.current() {
        Some(Token::Null) => Value::Null,
        Some(Token::Bool(b)) => Value::Bool(*b),
        Some(Token::Int(v)) => Value::from(*v),
        Some(Token::Float(v)) => match serde_json::Number::from_f64(*v) {
            Some(number) => Value::Number(number),
            None => return Err(IngestError::malformed(format!("non-finite number {v}"))),
        },
        Some(Token::String(s)) => Value::String(s.clone()),
        Some(Token::StartArray) => {
            let depth = enter_container(depth, DEFAULT_MAX_DEPTH)?;
            let mut items = Vec::new();
            while !matches!(stream.next_token()?, Token::EndArray) {
                items.push(read_json_at(stream, depth)?);
            }
            Value::Array(items)
        }
        Some(Token::StartObject) => {
            let depth = enter_container(depth, DEFAULT_MAX_DEPTH)?;
            let mut map = serde_json::Map::new();
            loop {
                let key = match stream.next_token()? {
                    Token::EndObject => break,
                    Token::FieldName(name) => name.clone(),
                    other => {
                        return Err(IngestError::malformed(format!(
                            "expected field name, found {}",
                            other.value_kind()
                        )));
                    }
                };
                stream.next_token()?;
                map.insert(key, read_json_at(stream, depth)?);
            }
            Value::Object(map)
        }
        Some(other) => {
            return Err(IngestError::malformed(format!(
                "expected a value, found {}",
                other.value_kind()
            )));
        }
        None => return Err(IngestError::malformed("expected a value, found nothing")),
    };
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// What the tokenizer accepts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    NameOrEnd,
    Colon,
    ValueOrEnd,
    SeparatorOrEnd,
    Done,
}

/// Pull tokenizer over a JSON document held in memory.
///
/// Integers that do not fit an `i64` are reported as [`Token::Float`].
/// Leading zeros, raw control characters inside strings and numbers outside
/// the `f64` range are rejected, as is nesting deeper than the tokenizer's
/// limit.
#[derive(Debug)]
pub struct JsonTokenizer<'a> {
    text: &'a str,
    pos: usize,
    stack: Vec<Container>,
    max_depth: usize,
    expect: Expect,
    current: Option<Token>,
}

impl<'a> JsonTokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::with_max_depth(text, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(text: &'a str, max_depth: usize) -> Self {
        Self {
            text,
            pos: 0,
            stack: Vec::new(),
            max_depth,
            expect: Expect::Value,
            current: None,
        }
    }

    /// Byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> IngestError {
        IngestError::malformed(format!("{message} at offset {}", self.pos))
    }

    fn after_value(&mut self) {
        self.expect = if self.stack.is_empty() {
            Expect::Done
        } else {
            Expect::SeparatorOrEnd
        };
    }

    fn read_token(&mut self) -> IngestResult<Token> {
        self.skip_whitespace();
        match self.expect {
            Expect::Done => Err(self.error("unexpected end of input")),
            Expect::Value => self.read_value(),
            Expect::Colon => {
                if self.peek() != Some(b':') {
                    return Err(self.error("expected ':'"));
                }
                self.pos += 1;
                self.skip_whitespace();
                self.read_value()
            }
            Expect::NameOrEnd => match self.peek() {
                Some(b'}') => Ok(self.close(Container::Object)),
                Some(b'"') => self.read_name(),
                _ => Err(self.error("expected field name or '}'")),
            },
            Expect::ValueOrEnd => match self.peek() {
                Some(b']') => Ok(self.close(Container::Array)),
                _ => self.read_value(),
            },
            Expect::SeparatorOrEnd => match (self.peek(), self.stack.last().copied()) {
                (Some(b','), Some(Container::Object)) => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some(b'"') {
                        self.read_name()
                    } else {
                        Err(self.error("expected field name"))
                    }
                }
                (Some(b','), Some(Container::Array)) => {
                    self.pos += 1;
                    self.skip_whitespace();
                    self.read_value()
                }
                (Some(b'}'), Some(Container::Object)) => Ok(self.close(Container::Object)),
                (Some(b']'), Some(Container::Array)) => Ok(self.close(Container::Array)),
                (None, _) => Err(self.error("unexpected end of input")),
                _ => Err(self.error("expected ',' or end of container")),
            },
        }
    }

    fn close(&mut self, container: Container) -> Token {
        self.pos += 1;
        self.stack.pop();
        self.after_value();
        match container {
            Container::Object => Token::EndObject,
            Container::Array => Token::EndArray,
        }
    }

    fn read_name(&mut self) -> IngestResult<Token> {
        let name = self.read_string()?;
        self.expect = Expect::Colon;
        Ok(Token::FieldName(name))
    }

    fn open(&mut self, container: Container) -> IngestResult<()> {
        if self.stack.len() >= self.max_depth {
            return Err(self.error(&format!("nesting deeper than {} levels", self.max_depth)));
        }
        self.pos += 1;
        self.stack.push(container);
        Ok(())
    }

    fn read_value(&mut self) -> IngestResult<Token> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => {
                self.open(Container::Object)?;
                self.expect = Expect::NameOrEnd;
                Ok(Token::StartObject)
            }
            Some(b'[') => {
                self.open(Container::Array)?;
                self.expect = Expect::ValueOrEnd;
                Ok(Token::StartArray)
            }
            Some(b'"') => {
                let s = self.read_string()?;
                self.after_value();
                Ok(Token::String(s))
            }
            Some(b't') => self.read_literal("true", Token::Bool(true)),
            Some(b'f') => self.read_literal("false", Token::Bool(false)),
            Some(b'n') => self.read_literal("null", Token::Null),
            Some(b'-' | b'0'..=b'9') => self.read_number(),
            Some(other) => Err(self.error(&format!("unexpected character '{}'", other as char))),
        }
    }

    fn read_literal(&mut self, word: &str, token: Token) -> IngestResult<Token> {
        if self.text.as_bytes()[self.pos..].starts_with(word.as_bytes()) {
            self.pos += word.len();
            self.after_value();
            Ok(token)
        } else {
            Err(self.error("invalid literal"))
        }
    }

    fn read_string(&mut self) -> IngestResult<String> {
        let text = self.text;
        let bytes = text.as_bytes();
        let start = self.pos;
        let mut end = start + 1;
        let mut escaped = false;
        loop {
            match bytes.get(end) {
                None => return Err(self.error("unterminated string")),
                Some(b'\\') => {
                    escaped = true;
                    end += 2;
                }
                Some(b'"') => break,
                Some(0x00..=0x1f) => {
                    return Err(IngestError::malformed(format!(
                        "control character in string at offset {end}"
                    )));
                }
                Some(_) => end += 1,
            }
        }
        self.pos = end + 1;

        let raw = &text[start..=end];
        if escaped {
            serde_json::from_str::<String>(raw)
                .map_err(|e| IngestError::malformed(format!("invalid string at offset {start}: {e}")))
        } else {
            Ok(raw[1..raw.len() - 1].to_string())
        }
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Scans `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`.
    fn read_number(&mut self) -> IngestResult<Token> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let int_start = self.pos;
        if self.skip_digits() == 0 {
            return Err(self.error("expected digit"));
        }
        if self.text.as_bytes()[int_start] == b'0' && self.pos - int_start > 1 {
            return Err(IngestError::malformed(format!(
                "leading zero in number at offset {int_start}"
            )));
        }

        let mut fractional = false;
        if self.peek() == Some(b'.') {
            fractional = true;
            self.pos += 1;
            if self.skip_digits() == 0 {
                return Err(self.error("expected digit after '.'"));
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            fractional = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.skip_digits() == 0 {
                return Err(self.error("expected digit in exponent"));
            }
        }

        let text = self.text;
        let raw = &text[start..self.pos];
        if !fractional && let Ok(v) = raw.parse::<i64>() {
            self.after_value();
            return Ok(Token::Int(v));
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => {
                self.after_value();
                Ok(Token::Float(v))
            }
            _ => Err(IngestError::malformed(format!(
                "number '{raw}' out of range at offset {start}"
            ))),
        }
    }
}

impl TokenStream for JsonTokenizer<'_> {
    fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    fn next_token(&mut self) -> IngestResult<&Token> {
        let token = self.read_token()?;
        Ok(self.current.insert(token))
    }
}
