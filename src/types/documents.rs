//! Source documents and the chunks cut from them

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// One page of extracted reference text with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    /// File name the page came from
    pub source: String,
    /// 1-based page number
    pub page: u32,
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A slice of a document sized for embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{source}_{page}_{chunk_id}`
    pub id: String,
    pub text: String,
    pub source: String,
    pub page: u32,
    /// Position of the chunk within its page
    pub chunk_id: usize,
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
}

impl Chunk {
    pub fn from_document(document: &Document, chunk_id: usize, text: String) -> Self {
        Self {
            id: format!("{}_{}_{}", document.source, document.page, chunk_id),
            text,
            source: document.source.clone(),
            page: document.page,
            chunk_id,
            metadata: document.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_inherits_provenance() {
        let doc = Document::new("Asthma is a chronic disease.", "gale.pdf", 12)
            .with_metadata("volume", json!(1));

        let chunk = Chunk::from_document(&doc, 3, "Asthma is".to_string());

        assert_eq!(chunk.id, "gale.pdf_12_3");
        assert_eq!(chunk.source, "gale.pdf");
        assert_eq!(chunk.page, 12);
        assert_eq!(chunk.chunk_id, 3);
        assert_eq!(chunk.metadata.get("volume"), Some(&json!(1)));
    }
}
