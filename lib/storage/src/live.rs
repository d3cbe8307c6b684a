use crate::store::ArtifactStore;
use foodvec_core::{FoodMatch, Query, QueryResolver, ResolverConfig, Result};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

struct Loaded {
    generation: String,
    resolver: Arc<QueryResolver>,
}

/// The live generation of a store, swappable while queries run.
///
/// Callers take an `Arc<QueryResolver>` and keep querying it even if a reload
/// swaps in a newer generation underneath.
pub struct LiveIndex {
    store: ArtifactStore,
    config: ResolverConfig,
    current: RwLock<Loaded>,
}

impl LiveIndex {
    /// Load the store's current generation
    pub fn open(store: ArtifactStore, config: ResolverConfig) -> Result<Self> {
        let generation = store.load_current()?;
        let loaded = Loaded {
            generation: generation.manifest.generation,
            resolver: Arc::new(QueryResolver::new(
                Arc::new(generation.bundle),
                config.clone(),
            )),
        };
        info!(generation = %loaded.generation, "opened live index");
        Ok(Self {
            store,
            config,
            current: RwLock::new(loaded),
        })
    }

    /// Open the live generation under an existing artifact root.
    ///
    /// Read-only: a missing root is an error, never created.
    pub fn open_dir<P: AsRef<Path>>(root: P, config: ResolverConfig) -> Result<Self> {
        Self::open(ArtifactStore::open(root)?, config)
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn generation(&self) -> String {
        self.current.read().generation.clone()
    }

    pub fn resolver(&self) -> Arc<QueryResolver> {
        self.current.read().resolver.clone()
    }

    pub fn resolve(&self, query: &Query) -> Result<Vec<FoodMatch>> {
        self.resolver().resolve(query)
    }

    /// Swap in the latest published generation.
    ///
    /// Returns `false` when already up to date. On error the previous generation
    /// stays live.
    pub fn reload(&self) -> Result<bool> {
        let latest = self.store.current_generation()?;
        if latest.as_deref() == Some(self.generation().as_str()) {
            return Ok(false);
        }

        let generation = self.store.load_current()?;
        let resolver = Arc::new(QueryResolver::new(
            Arc::new(generation.bundle),
            self.config.clone(),
        ));

        let mut current = self.current.write();
        info!(
            from = %current.generation,
            to = %generation.manifest.generation,
            "reloaded live index"
        );
        *current = Loaded {
            generation: generation.manifest.generation,
            resolver,
        };
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodvec_core::{AnswerSnapshot, FoodAnswers, MatchedFood, VectorSpace};

    fn publish(store: &ArtifactStore, food_id: u64) {
        let snapshot = AnswerSnapshot::new(
            vec![1],
            vec![FoodAnswers::new(food_id).answer(1, 1.0).unwrap()],
        );
        let bundle = VectorSpace::build(&snapshot).unwrap().into_bundle().unwrap();
        store.publish(&bundle).unwrap();
    }

    #[test]
    fn test_reload_swaps_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        publish(&store, 1);

        let live = LiveIndex::open(ArtifactStore::new(dir.path()).unwrap(), ResolverConfig::default())
            .unwrap();
        let before = live.resolver();
        assert!(!live.reload().unwrap());

        publish(&store, 2);
        assert!(live.reload().unwrap());

        let query = Query::new().answer(1, 1.0);
        assert_eq!(live.resolve(&query).unwrap()[0].food, MatchedFood::Known(2));
        // A resolver handed out earlier keeps answering from its own generation
        assert_eq!(before.resolve(&query).unwrap()[0].food, MatchedFood::Known(1));
    }

    #[test]
    fn test_open_dir_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("never-built");
        assert!(matches!(
            LiveIndex::open_dir(&root, ResolverConfig::default()),
            Err(foodvec_core::Error::ArtifactLoad(_))
        ));
        assert!(!root.exists());
    }

    #[test]
    fn test_failed_reload_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        publish(&store, 1);
        let live = LiveIndex::open(ArtifactStore::new(dir.path()).unwrap(), ResolverConfig::default())
            .unwrap();
        let generation = live.generation();

        std::fs::write(dir.path().join(crate::store::CURRENT_FILE), "gen-99999999-missing").unwrap();
        assert!(live.reload().is_err());
        assert_eq!(live.generation(), generation);
        assert_eq!(live.resolve(&Query::new()).unwrap().len(), 1);
    }
}
