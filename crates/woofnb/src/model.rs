//! Typed entities shared by every other module: [`Notebook`], [`Header`],
//! [`Cell`], [`Output`], [`CacheEntry`].
//!
//! The model uses tagged sums for anything that varies in kind (`Output`,
//! `CellType`) rather than stringly-typed maps, and keeps the header's
//! verbatim source text alongside its typed view so non-format operations
//! can round-trip byte-for-byte.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::header::HeaderView;

/// The `%WOOFNB <major>.<minor>` line every notebook starts with.
pub const MAGIC: &str = "%WOOFNB";

/// Cell kinds recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Md,
    Data,
    Test,
    Viz,
    Bash,
    Raw,
}

impl CellType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Md => "md",
            CellType::Data => "data",
            CellType::Test => "test",
            CellType::Viz => "viz",
            CellType::Bash => "bash",
            CellType::Raw => "raw",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "code" => Some(CellType::Code),
            "md" => Some(CellType::Md),
            "data" => Some(CellType::Data),
            "test" => Some(CellType::Test),
            "viz" => Some(CellType::Viz),
            "bash" => Some(CellType::Bash),
            "raw" => Some(CellType::Raw),
            _ => None,
        }
    }

    /// Non-executable types are dropped from the plan but still participate
    /// in dependency resolution.
    #[must_use]
    pub fn is_executable(self) -> bool {
        !matches!(self, CellType::Md | CellType::Raw | CellType::Viz)
    }
}

/// Declared side-effect intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideFx {
    #[default]
    None,
    Fs,
    Net,
    Shell,
    Isolated,
}

impl SideFx {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SideFx::None => "none",
            SideFx::Fs => "fs",
            SideFx::Net => "net",
            SideFx::Shell => "shell",
            SideFx::Isolated => "isolated",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(SideFx::None),
            "fs" => Some(SideFx::Fs),
            "net" => Some(SideFx::Net),
            "shell" => Some(SideFx::Shell),
            "isolated" => Some(SideFx::Isolated),
            _ => None,
        }
    }
}

/// Execution/scheduling order (header key `execution.order`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOrder {
    #[default]
    Linear,
    Graph,
}

/// Cache mode (header key `execution.cache`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    ContentHash,
    #[default]
    None,
}

/// A single notebook cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: String,
    pub cell_type: CellType,
    pub name: Option<String>,
    pub deps: Vec<String>,
    pub timeout_sec: Option<u64>,
    pub memory_mb: Option<u64>,
    pub sidefx: SideFx,
    pub tags: Vec<String>,
    pub retries: u32,
    pub priority: i64,
    pub disabled: bool,
    pub lang: Option<String>,
    pub body: String,
    /// Exact substring between ` ```cell ` and the end of the fence line,
    /// preserved so lossless re-emit doesn't depend on the
    /// canonical-token regenerator agreeing byte-for-byte with the source.
    pub header_tokens_raw: String,
    /// Exact bytes between this cell's closing fence and the next cell's
    /// opening fence (or end of file), preserved for lossless serialize.
    pub trailing_raw: String,
    /// Any cell-header tokens the tokenizer didn't recognize, kept in
    /// first-seen order so `fmt` can still re-emit them (canonical order
    /// puts unrecognized tokens last, lexicographically).
    pub unknown_tokens: Vec<(String, String)>,
    /// Position in the original source, used for tie-breaking
    /// and diagnostics.
    pub file_index: usize,
}

impl Cell {
    /// The language a backend should use: cell override, else notebook default.
    #[must_use]
    pub fn effective_lang<'a>(&'a self, notebook_language: &'a str) -> &'a str {
        self.lang.as_deref().unwrap_or(notebook_language)
    }
}

/// Dual representation of the notebook header: the verbatim
/// source text for byte-lossless round-trip, and a typed view for
/// lint/plan/cache.
#[derive(Debug, Clone)]
pub struct Header {
    pub raw_text: String,
    pub view: HeaderView,
}

/// An ordered sequence of cells plus a header.
#[derive(Debug, Clone)]
pub struct Notebook {
    pub header: Header,
    pub cells: Vec<Cell>,
}

impl Notebook {
    #[must_use]
    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.header.view.language
    }
}

/// MIME-tagged display payload. Text payloads are
/// stored as strings; anything else is stored as base64 the way Jupyter's
/// own `.ipynb` schema does for binary `display_data` attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MimeValue {
    Text(String),
    Binary(Vec<u8>),
}

/// Tagged output variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        name: StreamName,
        text: String,
    },
    DisplayData {
        data: BTreeMap<String, MimeValue>,
    },
    ExecuteResult {
        repr: String,
    },
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl Output {
    #[must_use]
    pub fn error(ename: &str, evalue: impl Into<String>) -> Self {
        Output::Error {
            ename: ename.to_string(),
            evalue: evalue.into(),
            traceback: Vec::new(),
        }
    }
}

/// On-disk cached result of running one cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Lowercase hex encoding of the 32-byte digest.
    pub key: String,
    pub cell_id: String,
    pub outputs: Vec<Output>,
    pub elapsed_ms: u64,
    pub runner_version: String,
}
