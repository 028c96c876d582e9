//! Read-only in-memory vector store loaded once from a serialized artifact.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::embeddings::{Chunk, EmbeddedChunk};
use crate::error::StoreError;

/// On-disk layout: an N×D matrix plus N parallel metadata records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreArtifact {
    /// Embedding dimension D.
    pub dimension: usize,
    /// N rows of D floats.
    pub embeddings: Vec<Vec<f32>>,
    /// N chunk records, row-aligned with `embeddings`.
    pub metadata: Vec<Chunk>,
}

impl StoreArtifact {
    /// Splits embedded records into the parallel artifact arrays.
    pub fn from_records(records: Vec<EmbeddedChunk>) -> Result<Self, StoreError> {
        let dimension = records.first().map_or(0, |record| record.embedding.len());
        let mut embeddings = Vec::with_capacity(records.len());
        let mut metadata = Vec::with_capacity(records.len());
        for record in records {
            embeddings.push(record.embedding);
            metadata.push(record.chunk);
        }
        let artifact = Self {
            dimension,
            embeddings,
            metadata,
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Reads an artifact from disk.
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = serde_json::from_reader(BufReader::new(file))?;
        Ok(artifact)
    }

    /// Writes the artifact to disk.
    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.embeddings.len() != self.metadata.len() {
            return Err(StoreError::LengthMismatch {
                embeddings: self.embeddings.len(),
                metadata: self.metadata.len(),
            });
        }
        if !self.embeddings.is_empty() && self.dimension == 0 {
            return Err(StoreError::ZeroDimension {
                rows: self.embeddings.len(),
            });
        }
        for (row, values) in self.embeddings.iter().enumerate() {
            if values.len() != self.dimension {
                return Err(StoreError::RaggedRow {
                    row,
                    expected: self.dimension,
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }
}

/// Immutable pairing of embeddings and chunk metadata.
///
/// Row `i` of the matrix always corresponds to chunk `i`. The store is built
/// once at startup and shared read-only behind an `Arc`.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimension: usize,
    matrix: Vec<f32>,
    chunks: Vec<Chunk>,
    normalized: bool,
}

impl VectorStore {
    /// Builds a store from a validated artifact.
    pub fn from_artifact(artifact: StoreArtifact) -> Result<Self, StoreError> {
        artifact.validate()?;
        let StoreArtifact {
            dimension,
            embeddings,
            metadata,
        } = artifact;
        let mut matrix = Vec::with_capacity(dimension * embeddings.len());
        for row in embeddings {
            matrix.extend_from_slice(&row);
        }
        Ok(Self {
            dimension,
            matrix,
            chunks: metadata,
            normalized: false,
        })
    }

    /// Builds a store from parallel rows and chunks, inferring the dimension.
    pub fn from_parts(embeddings: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<Self, StoreError> {
        let dimension = embeddings.first().map_or(0, Vec::len);
        Self::from_artifact(StoreArtifact {
            dimension,
            embeddings,
            metadata: chunks,
        })
    }

    /// Loads the whole artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        Self::from_artifact(StoreArtifact::read(path)?)
    }

    /// Rescales every row to unit length. Zero rows are left untouched.
    pub fn normalized(mut self) -> Self {
        if self.dimension > 0 {
            for row in self.matrix.chunks_exact_mut(self.dimension) {
                normalize(row);
            }
        }
        self.normalized = true;
        self
    }

    /// Whether rows were rescaled at load time.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Embedding dimension D.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored chunks N.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True when the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk at storage index `idx`.
    pub fn chunk(&self, idx: usize) -> Option<&Chunk> {
        self.chunks.get(idx)
    }

    /// Embedding row at storage index `idx`.
    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        if idx >= self.len() {
            return None;
        }
        let start = idx * self.dimension;
        self.matrix.get(start..start + self.dimension)
    }

    /// Scores every row by dot product with `query` and returns the `top_k`
    /// best `(index, score)` pairs, highest first. Equal scores keep storage
    /// order. A query whose length differs from the store dimension matches
    /// nothing.
    pub fn rank(&self, query: &[f32], top_k: usize) -> Vec<(usize, f32)> {
        if top_k == 0 || self.is_empty() || query.len() != self.dimension {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .matrix
            .chunks_exact(self.dimension)
            .map(|row| dot(row, query))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Rescales `vector` to unit L2 norm in place; zero vectors are unchanged.
pub fn normalize(vector: &mut [f32]) {
    let norm = dot(vector, vector).sqrt();
    if norm > 0.0 && norm.is_finite() {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}
