//! [`Notebook`] → source: a lossless `serialize` used by every
//! command that round-trips a notebook unchanged, and a canonical `format`
//! used by `woof fmt`.

use crate::header::HeaderView;
use crate::model::Notebook;
use crate::tokenizer::format_value;

/// Reconstructs source text byte-for-byte equal to whatever `parser::parse`
/// read, using the verbatim header text and each cell's preserved raw
/// fragments. `serialize(parse(x)) == x` for any syntactically valid `x`.
#[must_use]
pub fn serialize(notebook: &Notebook) -> String {
    let mut out = String::with_capacity(notebook.header.raw_text.len() + 256);
    out.push_str(&notebook.header.raw_text);

    for cell in &notebook.cells {
        out.push_str("```cell");
        out.push_str(&cell.header_tokens_raw);
        out.push('\n');
        out.push_str(&cell.body);
        if !cell.body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
        out.push_str(&cell.trailing_raw);
    }

    out
}

/// Renders canonical form: known header keys in fixed order,
/// unknown keys sorted, cell-header tokens in `id, type, name, lang, deps,
/// tags, sidefx, timeout, memory_mb, retries, priority, disabled` order with
/// any unrecognized tokens appended lexicographically, two-space YAML
/// indentation (`serde_yaml`'s default), and a single blank line between
/// cells. Idempotent: `format(format(x)) == format(x)`.
///
/// # Errors
/// Returns an error if the header's typed view fails to re-serialize as
/// YAML (it was already validated by [`crate::parser::parse`], so this is
/// only reachable if the view was built programmatically with invalid data).
pub fn format(notebook: &Notebook) -> Result<String, crate::header::HeaderError> {
    let mut out = String::new();
    out.push_str(crate::model::MAGIC);
    out.push_str(" 1.0\n");
    out.push_str(&notebook.header.view.to_canonical_yaml()?);
    while out.ends_with('\n') {
        out.pop();
    }
    out.push('\n');

    for cell in &notebook.cells {
        out.push('\n');
        out.push_str("```cell ");
        out.push_str(&canonical_cell_header(cell));
        out.push('\n');
        out.push_str(&cell.body);
        if !cell.body.is_empty() && !cell.body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
    }

    Ok(out)
}

fn canonical_cell_header(cell: &crate::model::Cell) -> String {
    let mut parts = Vec::new();
    parts.push(format!("id={}", format_value(&cell.id)));
    parts.push(format!("type={}", cell.cell_type.as_str()));
    if let Some(name) = &cell.name {
        parts.push(format!("name={}", format_value(name)));
    }
    if let Some(lang) = &cell.lang {
        parts.push(format!("lang={}", format_value(lang)));
    }
    if !cell.deps.is_empty() {
        parts.push(format!("deps={}", cell.deps.join(",")));
    }
    if !cell.tags.is_empty() {
        parts.push(format!("tags={}", cell.tags.join(",")));
    }
    if cell.sidefx != crate::model::SideFx::None {
        parts.push(format!("sidefx={}", cell.sidefx.as_str()));
    }
    if let Some(timeout) = cell.timeout_sec {
        parts.push(format!("timeout={timeout}"));
    }
    if let Some(mem) = cell.memory_mb {
        parts.push(format!("memory_mb={mem}"));
    }
    if cell.retries != 0 {
        parts.push(format!("retries={}", cell.retries));
    }
    if cell.priority != 0 {
        parts.push(format!("priority={}", cell.priority));
    }
    if cell.disabled {
        parts.push("disabled".to_string());
    }

    let mut unknown = cell.unknown_tokens.clone();
    unknown.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in unknown {
        if value == "true" {
            parts.push(key);
        } else {
            parts.push(format!("{key}={}", format_value(&value)));
        }
    }

    parts.join(" ")
}

/// Resolves a header's YAML body to a typed view the way the parser would,
/// used by the formatter's own tests to avoid hand-building [`HeaderView`]s
/// field by field.
#[cfg(test)]
fn view_of(yaml: &str) -> HeaderView {
    HeaderView::parse(yaml).unwrap()
}
