//! Query resolution: project partial answers into the vector space, search, and
//! translate rows back to food ids.

use crate::index::{FlatIndex, SearchHit};
use crate::model::{validate_value, FoodId, QuestionId};
use crate::space::{FoodIdMap, QuestionMap};
use crate::{Error, Result, Vector};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Coordinate map, id map and index that were built together
#[derive(Debug, Clone)]
pub struct IndexBundle {
    questions: QuestionMap,
    food_ids: FoodIdMap,
    index: FlatIndex,
}

impl IndexBundle {
    /// Package the three artifacts, rejecting mutually inconsistent ones
    pub fn new(questions: QuestionMap, food_ids: FoodIdMap, index: FlatIndex) -> Result<Self> {
        if questions.dim() != index.dim() {
            return Err(Error::ArtifactLoad(format!(
                "question map has {} coordinates but index dimension is {}",
                questions.dim(),
                index.dim()
            )));
        }
        if food_ids.len() != index.len() {
            return Err(Error::ArtifactLoad(format!(
                "food id map has {} entries but index holds {} rows",
                food_ids.len(),
                index.len()
            )));
        }
        Ok(Self {
            questions,
            food_ids,
            index,
        })
    }

    pub fn questions(&self) -> &QuestionMap {
        &self.questions
    }

    pub fn food_ids(&self) -> &FoodIdMap {
        &self.food_ids
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Partial answer vector plus an optional result count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub answers: BTreeMap<QuestionId, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn answer(mut self, question_id: QuestionId, value: f32) -> Self {
        self.answers.insert(question_id, value);
        self
    }

    #[must_use]
    pub fn limit(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }
}

impl FromIterator<(QuestionId, f32)> for Query {
    fn from_iter<I: IntoIterator<Item = (QuestionId, f32)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
            k: None,
        }
    }
}

/// Food id of a hit, or `Unknown` when the row has no reverse mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedFood {
    Known(FoodId),
    Unknown,
}

impl Serialize for MatchedFood {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MatchedFood::Known(id) => serializer.serialize_u64(*id),
            MatchedFood::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for MatchedFood {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(FoodId),
            Tag(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Id(id) => Ok(MatchedFood::Known(id)),
            Repr::Tag(tag) if tag == "unknown" => Ok(MatchedFood::Unknown),
            Repr::Tag(tag) => Err(serde::de::Error::custom(format!(
                "expected a food id or \"unknown\", got {:?}",
                tag
            ))),
        }
    }
}

impl MatchedFood {
    pub fn id(&self) -> Option<FoodId> {
        match self {
            MatchedFood::Known(id) => Some(*id),
            MatchedFood::Unknown => None,
        }
    }
}

impl fmt::Display for MatchedFood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedFood::Known(id) => write!(f, "{}", id),
            MatchedFood::Unknown => write!(f, "unknown"),
        }
    }
}

/// One ranked result, best match first (rank 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoodMatch {
    pub rank: usize,
    pub food: MatchedFood,
    pub distance: f32,
}

impl fmt::Display for FoodMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Food ID: {} (Distance: {:.4})", self.food, self.distance)
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Result count used when a query does not set `k`
    pub default_k: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { default_k: 5 }
    }
}

/// Read-only query path over a loaded [`IndexBundle`]
#[derive(Debug, Clone)]
pub struct QueryResolver {
    bundle: Arc<IndexBundle>,
    config: ResolverConfig,
}

impl QueryResolver {
    pub fn new(bundle: Arc<IndexBundle>, config: ResolverConfig) -> Self {
        Self { bundle, config }
    }

    pub fn bundle(&self) -> &Arc<IndexBundle> {
        &self.bundle
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Project a partial answer set onto the full coordinate space.
    ///
    /// Unspecified coordinates stay neutral; unknown question ids are skipped.
    pub fn project(&self, query: &Query) -> Result<Vector> {
        let questions = self.bundle.questions();
        let mut vector = Vector::zeros(self.bundle.dim());
        let slots = vector.as_mut_slice();

        for (&question_id, &value) in &query.answers {
            match questions.coordinate(question_id) {
                Some(coord) => slots[coord] = validate_value(question_id, value)?,
                None => warn!(question_id, value, "ignoring unknown question id in query"),
            }
        }
        Ok(vector)
    }

    /// Top-k food items for a query, nearest first
    pub fn resolve(&self, query: &Query) -> Result<Vec<FoodMatch>> {
        let k = query.k.unwrap_or(self.config.default_k);
        let vector = self.project(query)?;
        let hits = self.bundle.index().search(vector.as_slice(), k)?;
        Ok(self.translate(&hits))
    }

    /// Resolve several queries; each must succeed for the batch to succeed
    pub fn resolve_batch(&self, queries: &[Query], k: usize) -> Result<Vec<Vec<FoodMatch>>> {
        let vectors = queries
            .iter()
            .map(|query| self.project(query))
            .collect::<Result<Vec<_>>>()?;
        let hits = self.bundle.index().search_batch(&vectors, k)?;
        Ok(hits.iter().map(|h| self.translate(h)).collect())
    }

    fn translate(&self, hits: &[SearchHit]) -> Vec<FoodMatch> {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| FoodMatch {
                rank: i + 1,
                food: self
                    .bundle
                    .food_ids()
                    .food_at(hit.row)
                    .map_or(MatchedFood::Unknown, MatchedFood::Known),
                distance: hit.distance,
            })
            .collect()
    }
}
