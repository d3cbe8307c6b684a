//! # foodvec Core
//!
//! Vector matching core for foodvec.
//!
//! Food items answer a fixed set of yes/no/scalar questions with values in
//! `[-2.0, 2.0]`. This crate turns those sparse answers into dense vectors and
//! finds the food items nearest to a partially specified answer set:
//!
//! - [`VectorSpace`] - Assigns one coordinate per question and one row per food
//! - [`FlatIndex`] - Exact squared-L2 nearest-neighbor scan
//! - [`QueryResolver`] - Projects partial queries and ranks food ids
//!
//! ## Example
//!
//! ```rust
//! use foodvec_core::{AnswerSnapshot, FoodAnswers, Query, QueryResolver, ResolverConfig, VectorSpace};
//! use std::sync::Arc;
//!
//! let snapshot = AnswerSnapshot::new(
//!     vec![10, 11],
//!     vec![
//!         FoodAnswers::new(1).answer(10, 2.0).unwrap().answer(11, -2.0).unwrap(),
//!         FoodAnswers::new(2),
//!     ],
//! );
//!
//! let bundle = VectorSpace::build(&snapshot).unwrap().into_bundle().unwrap();
//! let resolver = QueryResolver::new(Arc::new(bundle), ResolverConfig::default());
//!
//! let matches = resolver.resolve(&Query::new().answer(10, 2.0).limit(1)).unwrap();
//! assert_eq!(matches[0].food.id(), Some(1));
//! ```

pub mod error;
pub mod index;
pub mod model;
pub mod query;
pub mod space;
pub mod vector;

/// Squared-L2 distance kernels
///
/// AVX2/SSE3 on x86_64, NEON on ARM64, scalar elsewhere.
pub mod simd;

pub use error::{Error, Result};
pub use index::{FlatIndex, SearchHit};
pub use model::{Answer, AnswerSnapshot, AnswerSource, FoodAnswers, FoodId, QuestionId};
pub use query::{FoodMatch, IndexBundle, MatchedFood, Query, QueryResolver, ResolverConfig};
pub use space::{FoodIdMap, QuestionMap, VectorSpace};
pub use vector::Vector;
