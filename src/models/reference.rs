use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A citation attached to an answer.
///
/// The answering service has returned references in more than one shape over
/// time: a preformatted label such as `"[1] -> handbook.pdf (chunk 4)"`, or a
/// structured record naming the source document and the chunk it came from.
/// Both are kept as received and rendered through [`fmt::Display`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    /// A preformatted citation label.
    Label(String),
    /// A source document and, optionally, the chunk index within it.
    Chunk {
        source: String,
        #[serde(rename = "chunkIndex", alias = "chunk_index", default)]
        chunk_index: Option<i64>,
    },
    /// Any other JSON value the service sent in the references list.
    Other(Value),
}

impl Reference {
    /// Creates a label reference.
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label(text.into())
    }

    /// Creates a structured reference to a chunk of a source document.
    pub fn chunk(source: impl Into<String>, chunk_index: i64) -> Self {
        Self::Chunk {
            source: source.into(),
            chunk_index: Some(chunk_index),
        }
    }

    /// Interprets one element of a `references` array from a response body.
    ///
    /// Never fails: values that are neither a string nor an object with a
    /// string `source` are kept as [`Reference::Other`]. The chunk index is
    /// read from `chunkIndex` or, failing that, `chunk_index`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(label) => Self::Label(label.clone()),
            Value::Object(map) => match map.get("source").and_then(Value::as_str) {
                Some(source) => Self::Chunk {
                    source: source.to_string(),
                    chunk_index: map
                        .get("chunkIndex")
                        .or_else(|| map.get("chunk_index"))
                        .and_then(Value::as_i64),
                },
                None => Self::Other(value.clone()),
            },
            other => Self::Other(other.clone()),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => f.write_str(label),
            Self::Chunk {
                source,
                chunk_index: Some(index),
            } => write!(f, "{source} (chunk {index})"),
            Self::Chunk {
                source,
                chunk_index: None,
            } => f.write_str(source),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}
