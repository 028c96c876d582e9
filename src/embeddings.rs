//! Shared chunk data structures used by the corpus builder and the store.

use serde::{Deserialize, Deserializer, Serialize};

/// Unit of source text retrieved as answer context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document identifier (file name, topic slug, ...).
    #[serde(default, deserialize_with = "default_on_null")]
    pub source: String,
    /// Sequential index of the chunk within its source.
    #[serde(default, alias = "post_number", deserialize_with = "default_on_null")]
    pub chunk_id: usize,
    /// Chunk body text.
    pub content: String,
    /// Origin URL cited back to the user, when known.
    #[serde(default)]
    pub url: Option<String>,
}

impl Chunk {
    /// Builds a chunk record.
    pub fn new(
        source: impl Into<String>,
        chunk_id: usize,
        content: impl Into<String>,
        url: Option<String>,
    ) -> Self {
        Self {
            source: source.into(),
            chunk_id,
            content: content.into(),
            url,
        }
    }

    /// Text submitted to the embedding model for this chunk.
    pub fn embedding_text(&self) -> String {
        self.content.replace('\n', " ")
    }
}

/// Output row emitted by embedding jobs and consumed by the store artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Chunk metadata.
    #[serde(flatten)]
    pub chunk: Chunk,
    /// Model embedding vector.
    pub embedding: Vec<f32>,
}

fn default_on_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn markdown_chunk_parses() {
        let raw = r#"{
            "source": "intro.md",
            "chunk_id": 3,
            "content": "hello\nworld",
            "url": "https://docs.test/intro"
        }"#;
        let chunk: Chunk = serde_json::from_str(raw).expect("chunk parses");
        assert_eq!(
            chunk,
            Chunk::new("intro.md", 3, "hello\nworld", Some("https://docs.test/intro".into()))
        );
        assert_eq!(chunk.embedding_text(), "hello world");
    }

    #[test]
    fn discourse_post_parses_with_defaults() {
        let raw = r#"{
            "id": "991",
            "post_number": 4,
            "content": "<p>reply</p>",
            "url": "https://forum.test/t/slug/12/4",
            "reply_to_post": "None",
            "topic_id": 12,
            "slug": "slug"
        }"#;
        let chunk: Chunk = serde_json::from_str(raw).expect("post parses");
        assert_eq!(chunk.source, "");
        assert_eq!(chunk.chunk_id, 4);
        assert_eq!(chunk.url.as_deref(), Some("https://forum.test/t/slug/12/4"));
    }

    #[test]
    fn null_metadata_falls_back() {
        let raw = r#"{"source": null, "chunk_id": null, "content": "x", "url": null}"#;
        let chunk: Chunk = serde_json::from_str(raw).expect("nulls accepted");
        assert_eq!(chunk, Chunk::new("", 0, "x", None));
    }

    #[test]
    fn embedded_chunk_flattens_metadata() {
        let record = EmbeddedChunk {
            chunk: Chunk::new("a.md", 0, "text", None),
            embedding: vec![0.5, 0.5],
        };
        let value = serde_json::to_value(&record).expect("serializes");
        assert_eq!(value["source"], "a.md");
        assert_eq!(value["embedding"][1], 0.5);
    }
}
