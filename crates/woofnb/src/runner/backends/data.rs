//! `data` cell backend: the body isn't a program, it's a literal JSON or
//! YAML document. Running a `data` cell means validating it parses and
//! surfacing a short repr of the value — never shelling out, so there's no
//! timeout to enforce.

use std::time::Duration;

use super::{Backend, BackendResult};
use crate::error::ExecErrorName;
use crate::model::{Cell, Output};

/// A `data` cell's value isn't bound into any backend's symbol table here —
/// no concrete per-language binding convention exists for it (open question,
/// `DESIGN.md`) — but the repr output is unconditional.
const REPR_MAX_LEN: usize = 200;

fn parse_body(trimmed: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return Some(value);
    }
    serde_yaml::from_str::<serde_yaml::Value>(trimmed)
        .ok()
        .and_then(|v| serde_json::to_value(v).ok())
}

fn short_repr(value: &serde_json::Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= REPR_MAX_LEN {
        rendered
    } else {
        let truncated: String = rendered.chars().take(REPR_MAX_LEN).collect();
        format!("{truncated}…")
    }
}

pub struct DataBackend;

impl Backend for DataBackend {
    fn run(&self, cell: &Cell, _lang: &str, _timeout: Duration) -> BackendResult {
        let value = parse_body(cell.body.trim()).ok_or_else(|| {
            (
                ExecErrorName::InvalidDataBody,
                "cell body is not valid JSON or YAML".to_string(),
            )
        })?;

        Ok(vec![Output::ExecuteResult { repr: short_repr(&value) }])
    }
}
