//! Documentation entries
//!
//! A [`DocEntry`] is a typed record attached to a story or to one of its
//! steps. On the wire it is a flat JSON object discriminated by `kind`, with a
//! constant `phase` marker:
//!
//! ```json
//! { "kind": "kv", "label": "user", "value": "alice", "phase": "runtime" }
//! ```
//!
//! Every constructor here is pure. None of them can fail: [`DocEntry::json`]
//! degrades to a debug rendering when the value cannot be serialized.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// When a doc entry was recorded
///
/// Only `runtime` exists today. The marker distinguishes entries captured
/// during execution from entries a static analysis pass might produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocPhase {
    /// Recorded while the test was executing
    #[default]
    Runtime,
}

/// Kind-specific payload of a doc entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocKind {
    /// Free text note
    Note {
        /// Note text
        text: String,
    },
    /// Tag annotation
    Tag {
        /// Tag names
        names: Vec<String>,
    },
    /// Key/value pair
    Kv {
        /// Key
        label: String,
        /// Arbitrary JSON value
        value: Value,
    },
    /// Code block
    Code {
        /// Caption
        label: String,
        /// Source text
        content: String,
        /// Language hint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },
    /// Table of strings
    Table {
        /// Caption
        label: String,
        /// Column headers
        columns: Vec<String>,
        /// Rows, one string per column
        rows: Vec<Vec<String>>,
    },
    /// Hyperlink
    Link {
        /// Link text
        label: String,
        /// Target URL
        url: String,
    },
    /// Markdown section
    Section {
        /// Section heading
        title: String,
        /// Markdown body
        markdown: String,
    },
    /// Mermaid diagram
    Mermaid {
        /// Diagram source
        code: String,
        /// Optional caption
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// Screenshot reference
    Screenshot {
        /// Image path
        path: String,
        /// Optional alt text
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    /// User-defined entry
    Custom {
        /// User-chosen type name
        #[serde(rename = "type")]
        type_name: String,
        /// Arbitrary JSON payload
        data: Value,
    },
}

/// A documentation record attached to a story or a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocEntry {
    /// Kind-specific fields, flattened next to `phase`
    #[serde(flatten)]
    pub kind: DocKind,
    /// Recording phase
    #[serde(default)]
    pub phase: DocPhase,
}

/// Treat `Some("")` like `None` for optional captions
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

impl DocEntry {
    /// Wrap a payload as a runtime doc entry
    pub fn new(kind: DocKind) -> Self {
        DocEntry {
            kind,
            phase: DocPhase::Runtime,
        }
    }

    /// A text note
    pub fn note(text: impl Into<String>) -> Self {
        Self::new(DocKind::Note { text: text.into() })
    }

    /// One or more tag names
    pub fn tag<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(DocKind::Tag {
            names: names.into_iter().map(Into::into).collect(),
        })
    }

    /// A key/value pair
    pub fn kv(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(DocKind::Kv {
            label: label.into(),
            value: value.into(),
        })
    }

    /// A code block with an optional language
    pub fn code(label: impl Into<String>, content: impl Into<String>, lang: Option<&str>) -> Self {
        Self::new(DocKind::Code {
            label: label.into(),
            content: content.into(),
            lang: non_empty(lang),
        })
    }

    /// A value rendered as pretty-printed JSON in a `code` entry (`lang = json`)
    ///
    /// If the value cannot be serialized (for example a map with non-string
    /// keys) the content falls back to its pretty `Debug` form.
    pub fn json<T>(label: impl Into<String>, value: &T) -> Self
    where
        T: Serialize + Debug + ?Sized,
    {
        let content = serde_json::to_string_pretty(value).unwrap_or_else(|_| format!("{:#?}", value));
        Self::code(label, content, Some("json"))
    }

    /// A table with column headers and rows
    pub fn table<C, S, R, Row, Cell>(label: impl Into<String>, columns: C, rows: R) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Row>,
        Row: IntoIterator<Item = Cell>,
        Cell: Into<String>,
    {
        Self::new(DocKind::Table {
            label: label.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        })
    }

    /// A hyperlink
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(DocKind::Link {
            label: label.into(),
            url: url.into(),
        })
    }

    /// A titled markdown section
    pub fn section(title: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self::new(DocKind::Section {
            title: title.into(),
            markdown: markdown.into(),
        })
    }

    /// A mermaid diagram with an optional title
    pub fn mermaid(code: impl Into<String>, title: Option<&str>) -> Self {
        Self::new(DocKind::Mermaid {
            code: code.into(),
            title: non_empty(title),
        })
    }

    /// A screenshot reference with optional alt text
    pub fn screenshot(path: impl Into<String>, alt: Option<&str>) -> Self {
        Self::new(DocKind::Screenshot {
            path: path.into(),
            alt: non_empty(alt),
        })
    }

    /// A user-defined entry
    pub fn custom(type_name: impl Into<String>, data: impl Into<Value>) -> Self {
        Self::new(DocKind::Custom {
            type_name: type_name.into(),
            data: data.into(),
        })
    }

    /// The `kind` discriminator as it appears on the wire
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            DocKind::Note { .. } => "note",
            DocKind::Tag { .. } => "tag",
            DocKind::Kv { .. } => "kv",
            DocKind::Code { .. } => "code",
            DocKind::Table { .. } => "table",
            DocKind::Link { .. } => "link",
            DocKind::Section { .. } => "section",
            DocKind::Mermaid { .. } => "mermaid",
            DocKind::Screenshot { .. } => "screenshot",
            DocKind::Custom { .. } => "custom",
        }
    }
}
