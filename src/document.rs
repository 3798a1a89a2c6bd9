//! Documents, ingestion chunks and typed metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar value stored in the open part of [`Metadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

/// Document metadata.
///
/// The fields every chunker knows about are typed; anything else goes into
/// `extra`, which is never interpreted by the engine except through a
/// caller-supplied predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Where the text came from (file name, URL, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Human readable title of the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Position of this chunk within its source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,

    /// Schema-less extension fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_chunk_index(mut self, index: usize) -> Self {
        self.chunk_index = Some(index);
        self
    }

    /// Add an extension field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up an extension field.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.extra.get(key)
    }
}

/// Declarative metadata predicate.
///
/// Filtered search accepts any `Fn(&Metadata) -> bool`; this type covers the
/// common cases and can be deserialized from configuration or a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum MetadataFilter {
    /// Matches every document
    All,
    Source { value: String },
    Title { value: String },
    /// Extension field equals the given value
    Field { key: String, value: MetadataValue },
    /// Extension field is present with any value
    HasField { key: String },
    And { filters: Vec<MetadataFilter> },
    Or { filters: Vec<MetadataFilter> },
    Not { filter: Box<MetadataFilter> },
}

impl MetadataFilter {
    pub fn source(value: impl Into<String>) -> Self {
        Self::Source {
            value: value.into(),
        }
    }

    pub fn field(key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        Self::Field {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::All => true,
            Self::Source { value } => metadata.source.as_deref() == Some(value.as_str()),
            Self::Title { value } => metadata.title.as_deref() == Some(value.as_str()),
            Self::Field { key, value } => metadata.get(key) == Some(value),
            Self::HasField { key } => metadata.extra.contains_key(key),
            Self::And { filters } => filters.iter().all(|f| f.matches(metadata)),
            Self::Or { filters } => filters.iter().any(|f| f.matches(metadata)),
            Self::Not { filter } => !filter.matches(metadata),
        }
    }
}

/// A chunk handed over by the document source, before embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An embedded, immutable document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: Metadata,
}

impl Document {
    pub(crate) fn from_chunk(chunk: DocumentChunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id,
            text: chunk.text,
            vector,
            metadata: chunk.metadata,
        }
    }
}
