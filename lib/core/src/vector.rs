use crate::model::NEUTRAL;
use serde::{Deserialize, Serialize};

/// A dense vector of answer values, one per coordinate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// All-neutral vector of the given dimension
    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![NEUTRAL; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// True when every coordinate holds the neutral value
    #[inline]
    pub fn is_neutral(&self) -> bool {
        self.data.iter().all(|&x| x == NEUTRAL)
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_is_neutral() {
        let v = Vector::zeros(4);
        assert_eq!(v.dim(), 4);
        assert!(v.is_neutral());
        assert!(!Vector::new(vec![0.0, 1.0]).is_neutral());
    }
}
