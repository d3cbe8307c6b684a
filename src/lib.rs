//! # foodvec
//!
//! Match food items to a diner's partial answers.
//!
//! Every food item answers a fixed set of questions ("is it spicy?", "is it
//! sweet?") with a value in `[-2.0, 2.0]`. foodvec builds one dense vector per
//! food, one coordinate per question, and finds the food items nearest to a query
//! that answers only some of the questions.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! foodvec build --snapshot answers.json --artifacts ./artifacts
//! foodvec query --artifacts ./artifacts -a 1=1.0 -a 2=1.0 -k 5
//! ```
//!
//! ### As a library
//!
//! ```rust,no_run
//! use foodvec::prelude::*;
//!
//! # fn main() -> foodvec::Result<()> {
//! let snapshot = AnswerSnapshot::new(
//!     vec![1, 2],
//!     vec![FoodAnswers::new(7).answer(1, 2.0)?.answer(2, -1.0)?],
//! );
//!
//! // Build and publish all three artifacts as one generation
//! let bundle = VectorSpace::build(&snapshot)?.into_bundle()?;
//! let store = ArtifactStore::new("./artifacts")?;
//! store.publish(&bundle)?;
//!
//! // Load the live generation and query it
//! let live = LiveIndex::open(store, ResolverConfig::default())?;
//! for m in live.resolve(&Query::new().answer(1, 1.0))? {
//!     println!("{}", m);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Structure
//!
//! - `foodvec-core` - Answer model, vector space builder, flat L2 index, query resolver
//! - `foodvec-storage` - Artifact files, checksummed manifests, atomic publish and reload

// Re-export core types
pub use foodvec_core::{
    Answer, AnswerSnapshot, AnswerSource, FoodAnswers, FoodId, QuestionId,
    VectorSpace, QuestionMap, FoodIdMap,
    FlatIndex, SearchHit, Vector,
    IndexBundle, Query, QueryResolver, ResolverConfig, FoodMatch, MatchedFood,
    Error, Result,
};

// Re-export storage
pub use foodvec_storage::{ArtifactStore, Generation, LiveIndex, Manifest};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AnswerSnapshot, AnswerSource, FoodAnswers,
        VectorSpace, FlatIndex, Vector,
        IndexBundle, Query, QueryResolver, ResolverConfig, FoodMatch, MatchedFood,
        ArtifactStore, LiveIndex,
        Error, Result,
    };
}
