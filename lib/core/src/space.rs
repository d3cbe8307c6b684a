//! Vector space construction.
//!
//! Questions become coordinates (ascending question id), food items become rows
//! (snapshot order), and each food's sparse answers are written into a dense,
//! zero-initialized vector. The whole space is rebuilt from a full snapshot; there
//! is no incremental update path.

use crate::index::FlatIndex;
use crate::model::{AnswerSource, FoodId, QuestionId};
use crate::query::IndexBundle;
use crate::{Error, Result, Vector};
use ahash::AHashMap;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Bijection from question id to coordinate index in `[0, N)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionMap {
    coords: BTreeMap<QuestionId, usize>,
}

impl QuestionMap {
    /// Assign coordinates by ascending question id.
    ///
    /// Fails on an empty or duplicated question set.
    pub fn from_question_ids(ids: &[QuestionId]) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::Configuration(
                "no questions: vector space would have dimension 0".to_string(),
            ));
        }

        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::Configuration(format!(
                "duplicate question id {}",
                pair[0]
            )));
        }

        let coords = sorted
            .into_iter()
            .enumerate()
            .map(|(coord, qid)| (qid, coord))
            .collect();
        Ok(Self { coords })
    }

    /// Rebuild from a persisted mapping, checking it is a bijection onto `[0, N)`
    pub fn from_map(coords: BTreeMap<QuestionId, usize>) -> Result<Self> {
        if coords.is_empty() {
            return Err(Error::ArtifactLoad("question map is empty".to_string()));
        }
        check_dense(coords.values().copied(), coords.len(), "question map")?;
        Ok(Self { coords })
    }

    #[inline]
    pub fn coordinate(&self, question_id: QuestionId) -> Option<usize> {
        self.coords.get(&question_id).copied()
    }

    /// Vector space dimension
    #[inline]
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, usize)> + '_ {
        self.coords.iter().map(|(&qid, &coord)| (qid, coord))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.coords)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let coords: BTreeMap<QuestionId, usize> = bincode::deserialize(bytes)
            .map_err(|e| Error::ArtifactLoad(format!("question map is corrupt: {}", e)))?;
        Self::from_map(coords)
    }
}

/// Bijection between food id and row position in the index
#[derive(Debug, Clone)]
pub struct FoodIdMap {
    rows: BTreeMap<FoodId, usize>,
    by_row: AHashMap<usize, FoodId>,
}

impl PartialEq for FoodIdMap {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl FoodIdMap {
    /// Rebuild from a persisted mapping, checking it is a bijection onto `[0, rows)`
    pub fn from_map(rows: BTreeMap<FoodId, usize>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::ArtifactLoad("food id map is empty".to_string()));
        }
        check_dense(rows.values().copied(), rows.len(), "food id map")?;
        let by_row = rows.iter().map(|(&food, &row)| (row, food)).collect();
        Ok(Self { rows, by_row })
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: BTreeMap::new(),
            by_row: AHashMap::with_capacity(capacity),
        }
    }

    fn insert(&mut self, food_id: FoodId, row: usize) -> Result<()> {
        if self.rows.insert(food_id, row).is_some() {
            return Err(Error::Configuration(format!("duplicate food id {}", food_id)));
        }
        self.by_row.insert(row, food_id);
        Ok(())
    }

    #[inline]
    pub fn row(&self, food_id: FoodId) -> Option<usize> {
        self.rows.get(&food_id).copied()
    }

    /// Reverse lookup used to translate search hits
    #[inline]
    pub fn food_at(&self, row: usize) -> Option<FoodId> {
        self.by_row.get(&row).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FoodId, usize)> + '_ {
        self.rows.iter().map(|(&food, &row)| (food, row))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.rows)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let rows: BTreeMap<FoodId, usize> = bincode::deserialize(bytes)
            .map_err(|e| Error::ArtifactLoad(format!("food id map is corrupt: {}", e)))?;
        Self::from_map(rows)
    }
}

fn check_dense(values: impl Iterator<Item = usize>, len: usize, what: &str) -> Result<()> {
    let mut seen = vec![false; len];
    for value in values {
        match seen.get_mut(value) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(Error::ArtifactLoad(format!(
                    "{} maps two keys to position {}",
                    what, value
                )))
            }
            None => {
                return Err(Error::ArtifactLoad(format!(
                    "{} position {} is outside [0, {})",
                    what, value, len
                )))
            }
        }
    }
    Ok(())
}

/// Output of one build pass: coordinate map, id map, and one vector per food
#[derive(Debug, Clone)]
pub struct VectorSpace {
    questions: QuestionMap,
    food_ids: FoodIdMap,
    vectors: Vec<Vector>,
}

impl VectorSpace {
    /// Build the space from a full answer snapshot.
    ///
    /// Answer values are trusted to be in range. A repeated answer to the same
    /// question within one food overwrites the earlier one.
    pub fn build<S: AnswerSource + ?Sized>(source: &S) -> Result<Self> {
        let questions = QuestionMap::from_question_ids(&source.question_ids()?)?;
        let foods = source.food_answers()?;
        if foods.is_empty() {
            return Err(Error::Configuration("no food items to index".to_string()));
        }

        let dim = questions.dim();
        let mut food_ids = FoodIdMap::with_capacity(foods.len());
        let mut vectors = Vec::with_capacity(foods.len());
        let mut neutral = 0usize;

        for (row, food) in foods.iter().enumerate() {
            food_ids.insert(food.food_id, row)?;

            let mut vector = Vector::zeros(dim);
            let slots = vector.as_mut_slice();
            for answer in &food.answers {
                let coord = questions.coordinate(answer.question_id).ok_or_else(|| {
                    Error::Configuration(format!(
                        "food {} answers unknown question {}",
                        food.food_id, answer.question_id
                    ))
                })?;
                slots[coord] = answer.value;
            }

            // Unanswered and all-zero foods end up identical
            if vector.is_neutral() {
                neutral += 1;
                debug!(
                    food_id = food.food_id,
                    answers = food.answers.len(),
                    "food has an all-neutral vector"
                );
            }
            vectors.push(vector);
        }

        info!(
            dim,
            foods = vectors.len(),
            neutral,
            "built vector space"
        );

        Ok(Self {
            questions,
            food_ids,
            vectors,
        })
    }

    pub fn questions(&self) -> &QuestionMap {
        &self.questions
    }

    pub fn food_ids(&self) -> &FoodIdMap {
        &self.food_ids
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.vectors
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.questions.dim()
    }

    /// Vector of a food item, by food id
    pub fn vector_for(&self, food_id: FoodId) -> Option<&Vector> {
        self.food_ids.row(food_id).map(|row| &self.vectors[row])
    }

    /// Index the vectors and package all three artifacts together
    pub fn into_bundle(self) -> Result<IndexBundle> {
        let index = FlatIndex::build(&self.vectors)?;
        IndexBundle::new(self.questions, self.food_ids, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerSnapshot, FoodAnswers};

    fn snapshot() -> AnswerSnapshot {
        AnswerSnapshot::new(
            vec![11, 10, 42],
            vec![
                FoodAnswers::new(7)
                    .answer(10, 2.0)
                    .unwrap()
                    .answer(42, -1.0)
                    .unwrap(),
                FoodAnswers::new(3),
                FoodAnswers::new(5).answer(11, 1.0).unwrap(),
            ],
        )
    }

    #[test]
    fn test_question_map_sorted_bijection() {
        let map = QuestionMap::from_question_ids(&[42, 10, 11]).unwrap();
        assert_eq!(map.dim(), 3);
        assert_eq!(map.coordinate(10), Some(0));
        assert_eq!(map.coordinate(11), Some(1));
        assert_eq!(map.coordinate(42), Some(2));
        assert_eq!(map.coordinate(99), None);

        let again = QuestionMap::from_question_ids(&[11, 42, 10]).unwrap();
        assert_eq!(map, again);
    }

    #[test]
    fn test_question_map_rejects_empty_and_duplicates() {
        assert!(matches!(
            QuestionMap::from_question_ids(&[]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            QuestionMap::from_question_ids(&[1, 2, 1]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_build_dense_vectors() {
        let space = VectorSpace::build(&snapshot()).unwrap();
        assert_eq!(space.dim(), 3);
        assert_eq!(space.vectors().len(), 3);
        assert_eq!(space.vector_for(7).unwrap().as_slice(), &[2.0, 0.0, -1.0]);
        assert_eq!(space.vector_for(5).unwrap().as_slice(), &[0.0, 1.0, 0.0]);
        assert_eq!(space.food_ids().row(7), Some(0));
        assert_eq!(space.food_ids().row(3), Some(1));
        assert_eq!(space.food_ids().food_at(2), Some(5));
    }

    #[test]
    fn test_unanswered_food_is_all_zero() {
        let space = VectorSpace::build(&snapshot()).unwrap();
        let v = space.vector_for(3).unwrap();
        assert_eq!(v.dim(), 3);
        assert!(v.is_neutral());
    }

    #[test]
    fn test_repeated_answer_last_wins() {
        let mut food = FoodAnswers::new(1);
        food.answers.push(crate::model::Answer { question_id: 1, value: 1.0 });
        food.answers.push(crate::model::Answer { question_id: 1, value: -2.0 });
        let space = VectorSpace::build(&AnswerSnapshot::new(vec![1], vec![food])).unwrap();
        assert_eq!(space.vector_for(1).unwrap().as_slice(), &[-2.0]);
    }

    #[test]
    fn test_build_failures() {
        let no_foods = AnswerSnapshot::new(vec![1, 2], vec![]);
        assert!(matches!(VectorSpace::build(&no_foods), Err(Error::Configuration(_))));

        let no_questions = AnswerSnapshot::new(vec![], vec![FoodAnswers::new(1)]);
        assert!(matches!(VectorSpace::build(&no_questions), Err(Error::Configuration(_))));

        let dup_food = AnswerSnapshot::new(vec![1], vec![FoodAnswers::new(1), FoodAnswers::new(1)]);
        assert!(matches!(VectorSpace::build(&dup_food), Err(Error::Configuration(_))));

        let stray = AnswerSnapshot::new(vec![1], vec![FoodAnswers::new(1).answer(2, 1.0).unwrap()]);
        assert!(matches!(VectorSpace::build(&stray), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_maps_bytes_restore() {
        let space = VectorSpace::build(&snapshot()).unwrap();
        let questions = QuestionMap::from_bytes(&space.questions().to_bytes().unwrap()).unwrap();
        let food_ids = FoodIdMap::from_bytes(&space.food_ids().to_bytes().unwrap()).unwrap();
        assert_eq!(&questions, space.questions());
        assert_eq!(&food_ids, space.food_ids());
        assert_eq!(food_ids.food_at(1), Some(3));
    }

    #[test]
    fn test_from_map_rejects_non_bijection() {
        let mut coords = BTreeMap::new();
        coords.insert(1, 0);
        coords.insert(2, 0);
        assert!(matches!(QuestionMap::from_map(coords), Err(Error::ArtifactLoad(_))));

        let mut rows = BTreeMap::new();
        rows.insert(9, 0);
        rows.insert(8, 5);
        assert!(matches!(FoodIdMap::from_map(rows), Err(Error::ArtifactLoad(_))));
    }
}
