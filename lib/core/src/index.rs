//! Exact nearest-neighbor index over fixed-dimension vectors.
//!
//! Vectors are kept row-major in one contiguous buffer and every search is a full
//! squared-L2 scan. Rows are numbered in insertion order starting at 0.

use crate::simd::l2_squared_simd;
use crate::{Error, Result, Vector};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;

const INDEX_MAGIC: [u8; 4] = *b"FVIX";
const INDEX_FORMAT_VERSION: u32 = 1;

/// A single search result: row position and squared L2 distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub row: usize,
    pub distance: f32,
}

/// Flat (brute-force) squared-L2 index
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    rows: usize,
    data: Vec<f32>,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    magic: [u8; 4],
    version: u32,
    dim: u64,
    rows: u64,
    data: &'a [f32],
}

#[derive(Deserialize)]
struct IndexFile {
    magic: [u8; 4],
    version: u32,
    dim: u64,
    rows: u64,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Empty index of the given dimension
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Configuration(
                "index dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dim,
            rows: 0,
            data: Vec::new(),
        })
    }

    /// Build an index from vectors, assigning rows in iteration order
    pub fn build(vectors: &[Vector]) -> Result<Self> {
        let first = vectors.first().ok_or_else(|| {
            Error::Configuration("cannot build an index from zero vectors".to_string())
        })?;

        let mut index = Self::new(first.dim())?;
        index.data.reserve(first.dim() * vectors.len());
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Append a vector, returning its row position
    pub fn add(&mut self, vector: &Vector) -> Result<usize> {
        if vector.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                row: self.rows,
                expected: self.dim,
                actual: vector.dim(),
            });
        }
        self.data.extend_from_slice(vector.as_slice());
        self.rows += 1;
        Ok(self.rows - 1)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Stored vector at `row`
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    /// The `k` rows closest to `query`, ascending by distance then by row.
    ///
    /// Returns every row when `k` exceeds the row count.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(Error::QueryDimension {
                expected: self.dim,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Err(Error::Configuration("k must be positive".to_string()));
        }

        let k = k.min(self.rows);
        // Max-heap on (distance, row): the root is the worst of the current top-k.
        let mut heap: BinaryHeap<(OrderedFloat<f32>, usize)> = BinaryHeap::with_capacity(k + 1);

        for (row, stored) in self.data.chunks_exact(self.dim).enumerate() {
            let key = (OrderedFloat(l2_squared_simd(query, stored)), row);
            if heap.len() < k {
                heap.push(key);
            } else if heap.peek().is_some_and(|worst| key < *worst) {
                heap.pop();
                heap.push(key);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|(distance, row)| SearchHit {
                row,
                distance: distance.into_inner(),
            })
            .collect())
    }

    /// Run [`FlatIndex::search`] for many queries in parallel
    pub fn search_batch(&self, queries: &[Vector], k: usize) -> Result<Vec<Vec<SearchHit>>> {
        queries
            .par_iter()
            .map(|query| self.search(query.as_slice(), k))
            .collect()
    }

    /// Serialize into the native index artifact
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = IndexFileRef {
            magic: INDEX_MAGIC,
            version: INDEX_FORMAT_VERSION,
            dim: self.dim as u64,
            rows: self.rows as u64,
            data: &self.data,
        };
        Ok(bincode::serialize(&file)?)
    }

    /// Restore an index from [`FlatIndex::to_bytes`] output
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let file: IndexFile = bincode::deserialize(bytes)
            .map_err(|e| Error::ArtifactLoad(format!("index artifact is corrupt: {}", e)))?;

        if file.magic != INDEX_MAGIC {
            return Err(Error::ArtifactLoad("index artifact has a bad magic tag".to_string()));
        }
        if file.version != INDEX_FORMAT_VERSION {
            return Err(Error::ArtifactLoad(format!(
                "unsupported index format version {}",
                file.version
            )));
        }

        let dim = usize::try_from(file.dim)
            .map_err(|_| Error::ArtifactLoad("index dimension overflows usize".to_string()))?;
        let rows = usize::try_from(file.rows)
            .map_err(|_| Error::ArtifactLoad("index row count overflows usize".to_string()))?;
        if dim == 0 {
            return Err(Error::ArtifactLoad("index dimension is zero".to_string()));
        }
        if dim.checked_mul(rows) != Some(file.data.len()) {
            return Err(Error::ArtifactLoad(format!(
                "index holds {} values, expected {} rows x {} dims",
                file.data.len(),
                rows,
                dim
            )));
        }

        Ok(Self {
            dim,
            rows,
            data: file.data,
        })
    }
}
