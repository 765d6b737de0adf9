//! Cell-header tokenizer.
//!
//! Tokenizes the remainder of a ` ```cell ` fence line into `key[=value]`
//! pairs. This is a small hand-rolled lexer, line-oriented and
//! regex-assisted — the grammar is three rules deep and doesn't earn a
//! parser generator.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{ParseError, Position};

/// A single `key=value` (or bare `key`) token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub value: String,
}

fn key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+").unwrap())
}

fn bare_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^[A-Za-z0-9_.,:/@-]+"#).unwrap())
}

/// Tokenizes `line` (the text after ` ```cell `, already whitespace-trimmed
/// on the left) into an ordered list of tokens. Duplicate keys are rejected.
pub fn tokenize(line: &str, pos: Position) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut rest = line;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let Some(key_match) = key_re().find(rest) else {
            return Err(ParseError::BadTokenSyntax(pos, rest.to_string()));
        };
        let key = key_match.as_str().to_string();
        rest = &rest[key_match.end()..];

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            rest = after_eq;
            if let Some(after_quote) = rest.strip_prefix('"') {
                let (value, remainder) = parse_quoted(after_quote, pos)?;
                rest = remainder;
                value
            } else if let Some(bare_match) = bare_value_re().find(rest) {
                let value = bare_match.as_str().to_string();
                rest = &rest[bare_match.end()..];
                value
            } else {
                return Err(ParseError::BadTokenSyntax(pos, rest.to_string()));
            }
        } else {
            "true".to_string()
        };

        if !seen.insert(key.clone()) {
            return Err(ParseError::DuplicateToken(pos, key));
        }
        tokens.push(Token { key, value });
    }

    Ok(tokens)
}

/// Parses a double-quoted value starting just past the opening `"`.
/// Supports `\"` and `\\`; any other backslash escape is preserved literally.
fn parse_quoted(rest: &str, pos: Position) -> Result<(String, &str), ParseError> {
    let mut value = String::new();
    let mut chars = rest.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &rest[i + 1..])),
            '\\' => match chars.peek().copied() {
                Some((_, '"')) => {
                    value.push('"');
                    chars.next();
                }
                Some((_, '\\')) => {
                    value.push('\\');
                    chars.next();
                }
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                    chars.next();
                }
                None => {
                    return Err(ParseError::BadTokenSyntax(pos, rest.to_string()));
                }
            },
            other => value.push(other),
        }
    }

    Err(ParseError::BadTokenSyntax(pos, rest.to_string()))
}

/// Splits a `deps=` or `tags=` value on `,`, dropping empty segments.
#[must_use]
pub fn split_multi_value(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Double-quotes and escapes `value` if it contains any character outside
/// the bare token set, else returns it unchanged.
#[must_use]
pub fn format_value(value: &str) -> String {
    if !value.is_empty() && bare_value_re().find(value).is_some_and(|m| m.end() == value.len()) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new(1, 1)
    }

    #[test]
    fn tokenizes_bare_and_valued() {
        let tokens = tokenize("id=a type=code disabled", pos()).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token { key: "id".into(), value: "a".into() },
                Token { key: "type".into(), value: "code".into() },
                Token { key: "disabled".into(), value: "true".into() },
            ]
        );
    }

    #[test]
    fn quoted_value_with_space() {
        let tokens = tokenize(r#"id=a name="my cell""#, pos()).unwrap();
        assert_eq!(tokens[1].value, "my cell");
    }

    #[test]
    fn quoted_value_with_escapes() {
        let tokens = tokenize(r#"name="a\"b\\c""#, pos()).unwrap();
        assert_eq!(tokens[0].value, "a\"b\\c");
    }

    #[test]
    fn unknown_escape_preserved_literally() {
        let tokens = tokenize(r#"name="a\nb""#, pos()).unwrap();
        assert_eq!(tokens[0].value, "a\\nb");
    }

    #[test]
    fn duplicate_key_is_an_error() {
        let err = tokenize("id=a id=b", pos()).unwrap_err();
        assert_eq!(err.code(), "DuplicateToken");
    }

    #[test]
    fn multi_value_splits_and_drops_empty() {
        assert_eq!(
            split_multi_value("a,,b, c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn format_value_quotes_when_needed() {
        assert_eq!(format_value("abc"), "abc");
        assert_eq!(format_value("my cell"), "\"my cell\"");
        assert_eq!(format_value("a\"b"), "\"a\\\"b\"");
    }
}
