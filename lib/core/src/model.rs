//! Answer data consumed from the external question/food store.
//!
//! The store itself (CSV ingestion, relational schema, seeding) lives outside
//! this crate; it only has to hand over question ids and per-food sparse answers
//! through [`AnswerSource`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub type QuestionId = u64;
pub type FoodId = u64;

/// Lowest valid answer value
pub const ANSWER_MIN: f32 = -2.0;
/// Highest valid answer value
pub const ANSWER_MAX: f32 = 2.0;
/// "No preference" answer, also the value of an unanswered coordinate
pub const NEUTRAL: f32 = 0.0;

/// Check that `value` is a finite number inside the answer domain
#[inline]
pub fn validate_value(question_id: QuestionId, value: f32) -> Result<f32> {
    if value.is_finite() && (ANSWER_MIN..=ANSWER_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidAnswer { question_id, value })
    }
}

/// One answer of a food item to one question
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub value: f32,
}

impl Answer {
    /// Create an answer, rejecting values outside [-2.0, 2.0]
    pub fn new(question_id: QuestionId, value: f32) -> Result<Self> {
        let value = validate_value(question_id, value)?;
        Ok(Self { question_id, value })
    }
}

/// All answers recorded for a single food item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodAnswers {
    pub food_id: FoodId,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl FoodAnswers {
    #[must_use]
    pub fn new(food_id: FoodId) -> Self {
        Self {
            food_id,
            answers: Vec::new(),
        }
    }

    /// Builder-style answer append, validating the value
    pub fn answer(mut self, question_id: QuestionId, value: f32) -> Result<Self> {
        self.answers.push(Answer::new(question_id, value)?);
        Ok(self)
    }
}

/// Source of the answer data a vector space is built from
pub trait AnswerSource {
    /// Every question id known at build time
    fn question_ids(&self) -> Result<Vec<QuestionId>>;

    /// Every food item with its answers, in the order rows should be assigned
    fn food_answers(&self) -> Result<Vec<FoodAnswers>>;
}

/// A full in-memory snapshot of questions and answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSnapshot {
    pub questions: Vec<QuestionId>,
    pub foods: Vec<FoodAnswers>,
}

impl AnswerSnapshot {
    #[must_use]
    pub fn new(questions: Vec<QuestionId>, foods: Vec<FoodAnswers>) -> Self {
        Self { questions, foods }
    }

    /// Validate every answer value in the snapshot
    pub fn validate(&self) -> Result<()> {
        for food in &self.foods {
            for answer in &food.answers {
                validate_value(answer.question_id, answer.value)?;
            }
        }
        Ok(())
    }
}

impl AnswerSource for AnswerSnapshot {
    fn question_ids(&self) -> Result<Vec<QuestionId>> {
        Ok(self.questions.clone())
    }

    fn food_answers(&self) -> Result<Vec<FoodAnswers>> {
        Ok(self.foods.clone())
    }
}
