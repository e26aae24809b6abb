//! Parser for the small, indentation-based YAML subset used by the
//! table/form configuration file.
//!
//! Supported:
//! - nested mappings (`key: value`, or `key:` followed by a deeper block)
//! - sequences (`- item`), where an item is a scalar, a `key: value` pair
//!   whose mapping continues on lines aligned with the first key, or a
//!   deeper block after a bare `-`
//! - scalars: quoted strings, `true`/`false`, `null`/`~`, integers,
//!   floats, and otherwise the raw text
//! - `#` comments and blank lines
//!
//! Tabs count as four spaces. A block may not mix list items and
//! `key: value` entries at the same indentation; that is rejected rather
//! than guessed at. Flow collections, anchors, multi-line scalars and
//! multiple documents are not supported.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: block mixes list items and key/value entries at the same indentation")]
    MixedBlock { line: usize },
    #[error("line {line}: unexpected indentation")]
    UnexpectedIndent { line: usize },
    #[error("line {line}: expected `key: value`")]
    MissingKey { line: usize },
    #[error("line {line}: unterminated quoted string")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: duplicate key `{key}`")]
    DuplicateKey { line: usize, key: String },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::MixedBlock { line }
            | ParseError::UnexpectedIndent { line }
            | ParseError::MissingKey { line }
            | ParseError::UnterminatedQuote { line }
            | ParseError::DuplicateKey { line, .. } => *line,
        }
    }
}

/// Parses `input` into a JSON value. An input with no content lines
/// parses to `null`.
pub fn parse(input: &str) -> Result<Value, ParseError> {
    let lines = input
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| Line::read(i + 1, raw))
        .collect::<Vec<_>>();

    let Some(root_indent) = lines.first().map(|l| l.indent) else {
        return Ok(Value::Null);
    };

    let mut parser = Parser { lines, pos: 0 };
    let value = parser.parse_block(root_indent)?;
    if let Some(line) = parser.lines.get(parser.pos) {
        return Err(ParseError::UnexpectedIndent { line: line.number });
    }
    Ok(value)
}

#[derive(Debug)]
struct Line {
    number: usize,
    indent: usize,
    text: String,
}

impl Line {
    fn read(number: usize, raw: &str) -> Option<Line> {
        let expanded = raw.replace('\t', "    ");
        let content = strip_comment(&expanded).trim_end();
        let text = content.trim_start_matches(' ');
        if text.is_empty() {
            return None;
        }
        Some(Line {
            number,
            indent: content.len() - text.len(),
            text: text.to_string(),
        })
    }
}

struct Parser {
    lines: Vec<Line>,
    pos: usize,
}

impl Parser {
    fn parse_block(&mut self, indent: usize) -> Result<Value, ParseError> {
        if is_list_item(&self.lines[self.pos].text) {
            self.parse_list(indent)
        } else {
            self.parse_map(indent)
        }
    }

    fn parse_list(&mut self, indent: usize) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseError::UnexpectedIndent { line: line.number });
            }
            if !is_list_item(&line.text) {
                return Err(ParseError::MixedBlock { line: line.number });
            }

            let number = line.number;
            let rest = &line.text[1..];
            let content = rest.trim_start();
            if content.is_empty() {
                self.pos += 1;
                items.push(self.parse_nested(indent)?);
                continue;
            }

            if is_list_item(content) || split_key_value(content).is_some() {
                // Re-read the item body as a block starting at its own column.
                let column = indent + 1 + (rest.len() - content.len());
                let content = content.to_string();
                let line = &mut self.lines[self.pos];
                line.indent = column;
                line.text = content;
                items.push(self.parse_block(column)?);
            } else {
                let value = parse_scalar(content, number)?;
                self.pos += 1;
                items.push(value);
            }
        }
        Ok(Value::Array(items))
    }

    fn parse_map(&mut self, indent: usize) -> Result<Value, ParseError> {
        let mut map = Map::new();
        while let Some(line) = self.lines.get(self.pos) {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseError::UnexpectedIndent { line: line.number });
            }
            if is_list_item(&line.text) {
                return Err(ParseError::MixedBlock { line: line.number });
            }

            let number = line.number;
            let (key, rest) = split_key_value(&line.text)
                .filter(|(key, _)| !key.is_empty())
                .ok_or(ParseError::MissingKey { line: number })?;
            if map.contains_key(&key) {
                return Err(ParseError::DuplicateKey { line: number, key });
            }

            let rest = rest.trim();
            let value = if rest.is_empty() {
                self.pos += 1;
                self.parse_nested(indent)?
            } else {
                let value = parse_scalar(rest, number)?;
                self.pos += 1;
                value
            };
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    /// Parses the block below a bare `key:` or `-`, or null if the next
    /// line is not indented deeper than `parent_indent`.
    fn parse_nested(&mut self, parent_indent: usize) -> Result<Value, ParseError> {
        match self.lines.get(self.pos) {
            Some(next) if next.indent > parent_indent => {
                let indent = next.indent;
                self.parse_block(indent)
            }
            _ => Ok(Value::Null),
        }
    }
}

fn is_list_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

/// Splits `key: rest` (or `key:` at end of line). Quoted keys are
/// unquoted. Returns None when the text is not a mapping entry.
fn split_key_value(text: &str) -> Option<(String, &str)> {
    if let Some(quote) = text.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close = find_closing_quote(text, quote)?;
        let after = &text[close + 1..];
        let rest = after.strip_prefix(':')?;
        if !rest.is_empty() && !rest.starts_with(' ') {
            return None;
        }
        let key = unquote(&text[..=close], quote);
        return Some((key, rest));
    }

    let bytes = text.as_bytes();
    let colon = (0..bytes.len())
        .find(|&i| bytes[i] == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' '))?;
    Some((text[..colon].trim_end().to_string(), &text[colon + 1..]))
}

fn parse_scalar(text: &str, line: usize) -> Result<Value, ParseError> {
    if let Some(quote) = text.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close =
            find_closing_quote(text, quote).ok_or(ParseError::UnterminatedQuote { line })?;
        if close == text.len() - 1 {
            return Ok(Value::String(unquote(text, quote)));
        }
        return Ok(Value::String(text.to_string()));
    }

    Ok(match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" | "~" => Value::Null,
        _ => parse_number(text)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
    })
}

fn parse_number(text: &str) -> Option<Number> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    let numeric = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !numeric || !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Byte index of the quote closing the one at index 0.
fn find_closing_quote(text: &str, quote: char) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
        } else if c == quote {
            if quote == '\'' && chars.peek().map(|(_, n)| *n) == Some('\'') {
                chars.next();
            } else {
                return Some(i);
            }
        }
    }
    None
}

fn unquote(text: &str, quote: char) -> String {
    let inner = &text[1..text.len() - 1];
    if quote == '\'' {
        return inner.replace("''", "'");
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Cuts a `#` comment that starts the line or follows whitespace, unless
/// it is inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if q == '"' && c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                let at_boundary = prev.map_or(true, |p| p == ' ');
                if c == '#' && at_boundary {
                    return &line[..i];
                }
                if (c == '"' || c == '\'') && at_boundary {
                    quote = Some(c);
                }
            }
        }
        prev = Some(c);
    }
    line
}
