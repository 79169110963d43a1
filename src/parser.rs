use std::borrow::Cow;
use std::collections::HashMap;

use crate::env::SourceEnv;
use crate::error::{Error, ParseError, ParseErrorKind};
use crate::model::Entry;

/// Parse dotenv entries from UTF-8 text.
///
/// Keys are unique in the result. When a key is assigned more than once the
/// last value wins and the entry keeps the position of its first assignment.
///
/// `$NAME` and `${NAME}` in unquoted and double-quoted values resolve to an
/// earlier entry, then to the process environment, and otherwise to an empty
/// string. Single-quoted and backtick values are never expanded.
pub fn parse_str(input: &str) -> Result<Vec<Entry>, Error> {
    parse_str_with_env(input, &SourceEnv::process())
}

/// Like [`parse_str`], resolving references the file does not define in `env`.
pub fn parse_str_with_env(input: &str, env: &SourceEnv) -> Result<Vec<Entry>, Error> {
    parse_entries(input, env).map_err(Error::from)
}

/// Parse dotenv entries from UTF-8 bytes.
pub fn parse_bytes(input: &[u8]) -> Result<Vec<Entry>, Error> {
    parse_bytes_with_env(input, &SourceEnv::process())
}

pub fn parse_bytes_with_env(input: &[u8], env: &SourceEnv) -> Result<Vec<Entry>, Error> {
    let text = std::str::from_utf8(input)?;
    parse_str_with_env(text, env)
}

fn parse_entries(input: &str, env: &SourceEnv) -> Result<Vec<Entry>, ParseError> {
    let normalized = normalize_newlines(input);

    let mut entries: Vec<Entry> = Vec::new();
    let mut positions = HashMap::<String, usize>::new();

    for (line, statement) in Statements::new(&normalized) {
        let Some(assignment) = parse_statement(statement, line)? else {
            continue;
        };

        let value = match assignment.value {
            RawValue::Literal(value) => value,
            RawValue::Expandable(value) => expand(&value, |name| {
                positions
                    .get(name)
                    .map(|&idx| entries[idx].value.clone())
                    .or_else(|| env.var(name))
            }),
        };
        let entry = Entry {
            key: assignment.key,
            value,
            line,
        };

        match positions.get(&entry.key) {
            Some(&idx) => entries[idx] = entry,
            None => {
                positions.insert(entry.key.clone(), entries.len());
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

/// Splits input into statements: usually one line, more when a quoted value
/// spans several lines.
struct Statements<'a> {
    input: &'a str,
    offset: usize,
    line: u32,
}

impl<'a> Statements<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
        }
    }
}

impl<'a> Iterator for Statements<'a> {
    type Item = (u32, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.input.as_bytes();
        if self.offset >= bytes.len() {
            return None;
        }

        let start = self.offset;
        let start_line = self.line;
        let mut idx = start;
        // Quotes inside a comment line never open a value.
        let mut scan = if self.input[start..]
            .trim_start_matches([' ', '\t'])
            .starts_with('#')
        {
            Scan::Comment
        } else {
            Scan::Key
        };

        while idx < bytes.len() {
            let byte = bytes[idx];
            if byte == b'\n' {
                if !matches!(scan, Scan::Quoted(_)) {
                    break;
                }
                self.line += 1;
                idx += 1;
                continue;
            }

            scan = match scan {
                Scan::Key if byte == b'=' => Scan::ValueStart,
                Scan::ValueStart if matches!(byte, b'"' | b'\'' | b'`') => Scan::Quoted(byte),
                Scan::ValueStart if byte == b' ' || byte == b'\t' => Scan::ValueStart,
                Scan::ValueStart => Scan::Unquoted,
                Scan::Quoted(quote) if byte == quote && !is_escaped(bytes, idx) => Scan::Unquoted,
                other => other,
            };
            idx += 1;
        }

        let statement = &self.input[start..idx];
        if idx < bytes.len() {
            // consume the terminating newline
            idx += 1;
            self.line += 1;
        }
        self.offset = idx;

        Some((start_line, statement))
    }
}

#[derive(Clone, Copy)]
enum Scan {
    Comment,
    Key,
    ValueStart,
    Unquoted,
    Quoted(u8),
}

fn normalize_newlines(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }

    Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
}

fn is_escaped(bytes: &[u8], idx: usize) -> bool {
    let backslashes = bytes[..idx]
        .iter()
        .rev()
        .take_while(|byte| **byte == b'\\')
        .count();
    backslashes % 2 == 1
}

/// A value before variable expansion.
enum RawValue {
    Literal(String),
    Expandable(String),
}

struct Assignment {
    key: String,
    value: RawValue,
}

/// 1-based column, in characters, of byte offset `offset` within `text`.
fn column_at(text: &str, offset: usize) -> u32 {
    text[..offset].chars().count() as u32 + 1
}

fn parse_statement(statement: &str, line: u32) -> Result<Option<Assignment>, ParseError> {
    let mut rest = statement.trim_start();
    if rest.is_empty() || rest.starts_with('#') {
        return Ok(None);
    }

    if let Some(after) = rest.strip_prefix("export")
        && after.starts_with(char::is_whitespace)
    {
        rest = after.trim_start();
    }

    let Some((raw_key, raw_value)) = rest.split_once('=') else {
        if rest.is_empty() {
            return Err(ParseError::new(line, 1, ParseErrorKind::MissingKey));
        }
        let column = column_at(statement, statement.len());
        return Err(ParseError::new(
            line,
            column,
            ParseErrorKind::InvalidSyntax,
        ));
    };

    let key = raw_key.trim_end();
    if key.is_empty() {
        return Err(ParseError::new(line, 1, ParseErrorKind::MissingKey));
    }
    if !key.chars().all(is_key_char) {
        return Err(ParseError::new(line, 1, ParseErrorKind::InvalidKey));
    }

    let value_text = raw_value.trim_start();
    let column = column_at(statement, statement.len() - value_text.len());
    let value = parse_value(value_text, line, column)?;

    Ok(Some(Assignment {
        key: key.to_owned(),
        value,
    }))
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

fn parse_value(input: &str, line: u32, column: u32) -> Result<RawValue, ParseError> {
    match input.chars().next() {
        None => Ok(RawValue::Literal(String::new())),
        Some('"') => parse_double_quoted(input, line, column).map(RawValue::Expandable),
        Some(quote @ ('\'' | '`')) => {
            parse_literal_quoted(input, quote, line, column).map(RawValue::Literal)
        }
        Some(_) => {
            let value = match input.split_once(" #") {
                Some((head, _)) => head,
                None => input,
            };
            Ok(RawValue::Expandable(value.trim().to_owned()))
        }
    }
}

/// Single-quoted and backtick values are kept verbatim.
fn parse_literal_quoted(
    input: &str,
    quote: char,
    line: u32,
    column: u32,
) -> Result<String, ParseError> {
    let end = input
        .char_indices()
        .skip(1)
        .find(|&(idx, ch)| ch == quote && !is_escaped(input.as_bytes(), idx))
        .map(|(idx, _)| idx)
        .ok_or_else(|| ParseError::new(line, column, ParseErrorKind::UnterminatedQuote))?;

    check_trailing(input, end, line, column)?;
    Ok(input[1..end].to_owned())
}

fn parse_double_quoted(input: &str, line: u32, column: u32) -> Result<String, ParseError> {
    let mut out = String::with_capacity(input.len());
    let mut escaped = false;
    let mut end = None;

    for (idx, ch) in input.char_indices().skip(1) {
        if escaped {
            let unescaped = match ch {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                // left for `expand`, which reads `\$` as a literal dollar
                '$' => {
                    out.push('\\');
                    '$'
                }
                other => other,
            };
            out.push(unescaped);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => escaped = true,
            '"' => {
                end = Some(idx);
                break;
            }
            _ => out.push(ch),
        }
    }

    let Some(end) = end else {
        return Err(ParseError::new(
            line,
            column,
            ParseErrorKind::UnterminatedQuote,
        ));
    };

    check_trailing(input, end, line, column)?;
    Ok(out)
}

/// Only a comment may follow the closing quote.
fn check_trailing(input: &str, end: usize, line: u32, column: u32) -> Result<(), ParseError> {
    let tail = input[end + 1..].trim_start();
    if tail.is_empty() || tail.starts_with('#') {
        return Ok(());
    }
    Err(ParseError::new(
        line,
        column + input[..=end].chars().count() as u32,
        ParseErrorKind::InvalidSyntax,
    ))
}

/// Substitute `$NAME` and `${NAME}` through `lookup`; unresolved names become
/// empty. `\$` is a literal dollar sign.
fn expand(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    if !input.contains('$') {
        return input.to_owned();
    }

    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] != b'$' {
            idx += 1;
            continue;
        }

        if is_escaped(bytes, idx) {
            out.push_str(&input[cursor..idx - 1]);
            out.push('$');
            idx += 1;
            cursor = idx;
            continue;
        }

        let Some((name, end)) = placeholder(input, idx) else {
            idx += 1;
            continue;
        };
        out.push_str(&input[cursor..idx]);
        out.push_str(&lookup(name).unwrap_or_default());
        idx = end;
        cursor = end;
    }

    out.push_str(&input[cursor..]);
    out
}

/// Name and end offset of the reference starting at the `$` at `start`.
fn placeholder(input: &str, start: usize) -> Option<(&str, usize)> {
    let rest = &input[start + 1..];
    if let Some(braced) = rest.strip_prefix('{') {
        let len = braced.find('}')?;
        let name = &braced[..len];
        if name.is_empty() || !name.bytes().all(is_var_byte) {
            return None;
        }
        return Some((name, start + len + 3));
    }

    let len = rest.bytes().take_while(|byte| is_var_byte(*byte)).count();
    (len > 0).then(|| (&rest[..len], start + 1 + len))
}

fn is_var_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
