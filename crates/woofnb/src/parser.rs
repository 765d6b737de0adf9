//! Source → [`Notebook`].
//!
//! Line-oriented over UTF-8: a single forward pass with no backtracking,
//! producing either a [`Notebook`] or a positioned [`ParseError`].

use crate::error::{ParseError, Position};
use crate::header::HeaderView;
use crate::model::{Cell, CellType, Header, Notebook, SideFx};
use crate::tokenizer::{self, Token};

/// A line of source together with the byte range it (and its terminator)
/// occupies in the original text, so callers can slice back into `source`
/// for byte-exact preservation.
struct Line<'a> {
    content: &'a str,
    /// Start of this line's content.
    start: usize,
    /// Start of the *next* line (i.e. just past this line's terminator, or
    /// `source.len()` for the last line).
    next: usize,
    number: usize,
}

fn split_lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut number = 1usize;
    let bytes = source.as_bytes();

    while start <= source.len() {
        if start == source.len() {
            break;
        }
        let mut end = start;
        while end < source.len() && bytes[end] != b'\n' {
            end += 1;
        }
        let content_end = if end > start && bytes[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };
        let next = if end < source.len() { end + 1 } else { end };
        lines.push(Line {
            content: &source[start..content_end],
            start,
            next,
            number,
        });
        start = next;
        number += 1;
    }

    lines
}

fn is_cell_fence_open(trimmed: &str) -> bool {
    trimmed
        .strip_prefix("```cell")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

fn is_cell_fence_close(trimmed: &str) -> bool {
    trimmed == "```"
}

/// Parses a complete WOOFNB source file into a [`Notebook`].
pub fn parse(source: &str) -> Result<Notebook, ParseError> {
    let lines = split_lines(source);

    let magic_idx = lines
        .iter()
        .position(|l| l.content.trim_start().starts_with(crate::model::MAGIC))
        .ok_or(ParseError::MissingMagic(Position::new(1, 1)))?;

    let magic_line = &lines[magic_idx];
    let magic_pos = Position::new(magic_line.number, 1);
    let mut magic_tokens = magic_line.content.trim().split_whitespace();
    let _magic = magic_tokens.next();
    let version = magic_tokens
        .next()
        .ok_or_else(|| ParseError::MissingMagic(magic_pos))?;
    let major = version
        .split('.')
        .next()
        .ok_or_else(|| ParseError::UnsupportedVersion(magic_pos, version.to_string()))?;
    if major != "1" {
        return Err(ParseError::UnsupportedVersion(magic_pos, version.to_string()));
    }

    let fence_idx = lines[magic_idx + 1..]
        .iter()
        .position(|l| is_cell_fence_open(l.content.trim_start()))
        .map(|rel| magic_idx + 1 + rel);

    let header_end_byte = fence_idx.map_or(source.len(), |idx| lines[idx].start);
    let raw_text = source[..header_end_byte].to_string();

    let yaml_body = lines[..fence_idx.unwrap_or(lines.len())]
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != magic_idx)
        .map(|(_, l)| l.content)
        .collect::<Vec<_>>()
        .join("\n");

    let view = HeaderView::parse(&yaml_body).map_err(|_| ParseError::MissingMagic(magic_pos))?;
    let header = Header { raw_text, view };

    let mut cells = Vec::new();
    let Some(mut idx) = fence_idx else {
        return Ok(Notebook { header, cells });
    };

    while idx < lines.len() {
        let open = &lines[idx];
        let trimmed = open.content.trim_start();
        debug_assert!(is_cell_fence_open(trimmed));
        let pos = Position::new(open.number, 1);

        let raw_remainder = &trimmed["```cell".len()..];
        let tokens = tokenizer::tokenize(raw_remainder, pos)?;
        let header_tokens_raw = raw_remainder.to_string();

        let body_start = open.next;
        let close_rel = lines[idx + 1..]
            .iter()
            .position(|l| is_cell_fence_close(l.content.trim()));
        let Some(close_rel) = close_rel else {
            let id = tokens
                .iter()
                .find(|t| t.key == "id")
                .map_or_else(String::new, |t| t.value.clone());
            return Err(ParseError::UnterminatedCell(pos, id));
        };
        let close_idx = idx + 1 + close_rel;
        let close_line = &lines[close_idx];

        let mut body = source[body_start..close_line.start].to_string();
        if body.ends_with("\r\n") {
            body.truncate(body.len() - 2);
        } else if body.ends_with('\n') {
            body.pop();
        }

        idx = close_idx + 1;
        // Everything between this cell's closing fence and the next cell's
        // opening fence (blank lines, stray prose) is preserved verbatim so
        // lossless serialize can reproduce it.
        let mut next_idx = idx;
        while next_idx < lines.len() && !is_cell_fence_open(lines[next_idx].content.trim_start()) {
            next_idx += 1;
        }
        let trailing_start = lines[close_idx].next;
        let trailing_end = if next_idx < lines.len() {
            lines[next_idx].start
        } else {
            source.len()
        };
        let trailing_raw = source[trailing_start..trailing_end].to_string();

        cells.push(build_cell(
            tokens,
            header_tokens_raw,
            body,
            trailing_raw,
            cells.len(),
            pos,
        )?);

        idx = next_idx;
    }

    Ok(Notebook { header, cells })
}

fn build_cell(
    tokens: Vec<Token>,
    header_tokens_raw: String,
    body: String,
    trailing_raw: String,
    file_index: usize,
    pos: Position,
) -> Result<Cell, ParseError> {
    let mut id = None;
    let mut cell_type = None;
    let mut name = None;
    let mut deps = Vec::new();
    let mut timeout_sec = None;
    let mut memory_mb = None;
    let mut sidefx = SideFx::None;
    let mut tags = Vec::new();
    let mut retries = 0u32;
    let mut priority = 0i64;
    let mut disabled = false;
    let mut lang = None;
    let mut unknown_tokens = Vec::new();

    for token in tokens {
        match token.key.as_str() {
            "id" => id = Some(token.value),
            "type" => cell_type = Some(token.value),
            "name" => name = Some(token.value),
            "deps" => deps = tokenizer::split_multi_value(&token.value),
            "tags" => tags = tokenizer::split_multi_value(&token.value),
            "timeout" => {
                timeout_sec = token
                    .value
                    .parse()
                    .map_err(|_| ParseError::BadTokenSyntax(pos, token.value.clone()))?;
            }
            "memory_mb" => {
                memory_mb = Some(
                    token
                        .value
                        .parse()
                        .map_err(|_| ParseError::BadTokenSyntax(pos, token.value.clone()))?,
                );
            }
            "sidefx" => {
                sidefx = SideFx::from_str(&token.value)
                    .ok_or_else(|| ParseError::BadTokenSyntax(pos, token.value.clone()))?;
            }
            "retries" => {
                retries = token
                    .value
                    .parse()
                    .map_err(|_| ParseError::BadTokenSyntax(pos, token.value.clone()))?;
            }
            "priority" => {
                priority = token
                    .value
                    .parse()
                    .map_err(|_| ParseError::BadTokenSyntax(pos, token.value.clone()))?;
            }
            "disabled" => disabled = token.value == "true",
            "lang" => lang = Some(token.value),
            other => unknown_tokens.push((other.to_string(), token.value)),
        }
    }

    let id = id.ok_or_else(|| ParseError::BadTokenSyntax(pos, "missing `id`".to_string()))?;
    let cell_type = cell_type
        .as_deref()
        .and_then(CellType::from_str)
        .ok_or_else(|| ParseError::BadTokenSyntax(pos, "missing or unknown `type`".to_string()))?;

    Ok(Cell {
        id,
        cell_type,
        name,
        deps,
        timeout_sec,
        memory_mb,
        sidefx,
        tags,
        retries,
        priority,
        disabled,
        lang,
        body,
        header_tokens_raw,
        trailing_raw,
        unknown_tokens,
        file_index,
    })
}
