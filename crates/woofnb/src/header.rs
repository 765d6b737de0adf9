//! The typed view over the notebook header, produced by the YAML
//! collaborator. Field declaration order below is exactly the canonical key
//! order `woof fmt` renders, and within `env`: `interpreter_version`,
//! `requirements`, `container` — so a plain derived [`serde::Serialize`] on
//! [`HeaderView`] already emits canonical order; only the passthrough tail
//! needs an explicit sort, which a `BTreeMap` gives us for free.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{CacheMode, ExecutionOrder};

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Env {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    #[serde(default)]
    pub order: ExecutionOrder,
    #[serde(default)]
    pub cache: CacheMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IoPolicy {
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_files: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_network: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_shell: bool,
}

/// Typed view of the header, minus its leading `%WOOFNB` magic line.
///
/// `parameters`, `version`, `provenance` and `metadata` are opaque
/// passthrough: the core never inspects them beyond using `parameters` for
/// cache-key hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderView {
    pub name: String,
    pub language: String,
    #[serde(default)]
    pub env: Env,
    #[serde(default)]
    pub parameters: serde_yaml::Value,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub execution: Execution,
    #[serde(default)]
    pub io_policy: IoPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_yaml::Value>,
    /// Forward-compatible unknown keys, preserved and otherwise ignored.
    #[serde(flatten)]
    pub passthrough: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("header is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("header is missing required key `{0}`")]
    MissingKey(&'static str),
}

impl HeaderView {
    /// Parse the typed view from the header text with its leading magic
    /// line already stripped.
    pub fn parse(yaml_body: &str) -> Result<Self, HeaderError> {
        let view: HeaderView = serde_yaml::from_str(yaml_body)?;
        if view.name.is_empty() {
            return Err(HeaderError::MissingKey("name"));
        }
        if view.language.is_empty() {
            return Err(HeaderError::MissingKey("language"));
        }
        Ok(view)
    }

    /// Render canonical YAML (known keys first, in fixed order), used by
    /// `woof fmt`.
    pub fn to_canonical_yaml(&self) -> Result<String, HeaderError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Stable textual form used for the cache key: sorted-key JSON with no
    /// insignificant whitespace. `serde_json::Map` is backed
    /// by a `BTreeMap` unless the `preserve_order` feature is enabled (it
    /// isn't here), so this is sorted automatically.
    #[must_use]
    pub fn parameters_canonical_json(&self) -> String {
        canonical_json(&self.parameters)
    }

    #[must_use]
    pub fn env_canonical_json(&self) -> String {
        serde_json::json!({
            "interpreter_version": self.env.interpreter_version,
            "requirements": self.env.requirements,
            "container": self.env.container.as_ref().map(|c| &c.image),
        })
        .to_string()
    }
}

#[must_use]
pub fn canonical_json(value: &serde_yaml::Value) -> String {
    let as_json: serde_json::Value =
        serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
    as_json.to_string()
}
