// Integration tests for foodvec
use foodvec::{
    AnswerSnapshot, ArtifactStore, Error, FoodAnswers, LiveIndex, MatchedFood, Query,
    QueryResolver, ResolverConfig, VectorSpace,
};
use std::sync::Arc;

const FOOD_A: u64 = 101;
const FOOD_B: u64 = 102;
const FOOD_C: u64 = 103;

fn scenario_snapshot() -> AnswerSnapshot {
    AnswerSnapshot::new(
        vec![11, 10],
        vec![
            FoodAnswers::new(FOOD_A).answer(10, 2.0).unwrap().answer(11, -2.0).unwrap(),
            FoodAnswers::new(FOOD_B).answer(10, 0.0).unwrap().answer(11, 0.0).unwrap(),
            FoodAnswers::new(FOOD_C).answer(10, 2.0).unwrap().answer(11, 2.0).unwrap(),
        ],
    )
}

fn menu_snapshot() -> AnswerSnapshot {
    // 1: spicy, 2: sweet, 3: vegetarian, 4: served hot
    AnswerSnapshot::new(
        vec![1, 2, 3, 4],
        vec![
            FoodAnswers::new(1).answer(1, 2.0).unwrap().answer(3, -2.0).unwrap().answer(4, 2.0).unwrap(),
            FoodAnswers::new(2).answer(2, 2.0).unwrap().answer(3, 2.0).unwrap().answer(4, -2.0).unwrap(),
            FoodAnswers::new(3).answer(1, 1.0).unwrap().answer(3, 2.0).unwrap().answer(4, 2.0).unwrap(),
            FoodAnswers::new(4),
            FoodAnswers::new(5).answer(2, 1.0).unwrap().answer(4, 1.0).unwrap(),
        ],
    )
}

fn resolver(snapshot: &AnswerSnapshot) -> QueryResolver {
    let bundle = VectorSpace::build(snapshot).unwrap().into_bundle().unwrap();
    QueryResolver::new(Arc::new(bundle), ResolverConfig::default())
}

#[test]
fn test_partial_query_scenario() {
    let resolver = resolver(&scenario_snapshot());
    let matches = resolver.resolve(&Query::new().answer(10, 2.0).limit(2)).unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].food, MatchedFood::Known(FOOD_A));
    assert_eq!(matches[1].food, MatchedFood::Known(FOOD_B));
    assert_eq!(matches[0].distance, 4.0);
    assert_eq!(matches[1].distance, 4.0);
}

#[test]
fn test_coordinate_map_deterministic() {
    let first = VectorSpace::build(&scenario_snapshot()).unwrap();
    let second = VectorSpace::build(&scenario_snapshot()).unwrap();
    assert_eq!(first.questions(), second.questions());

    let coords: Vec<(u64, usize)> = first.questions().iter().collect();
    assert_eq!(coords, vec![(10, 0), (11, 1)]);
}

#[test]
fn test_unknown_question_same_as_empty_query() {
    let resolver = resolver(&scenario_snapshot());
    let empty = resolver.resolve(&Query::new()).unwrap();
    let unknown = resolver.resolve(&Query::new().answer(999, 1.0)).unwrap();
    assert_eq!(empty, unknown);
    assert_eq!(empty[0].food, MatchedFood::Known(FOOD_B));
}

#[test]
fn test_empty_query_prefers_neutral_foods() {
    let resolver = resolver(&menu_snapshot());
    let matches = resolver.resolve(&Query::new().limit(10)).unwrap();

    assert_eq!(matches.len(), 5);
    assert_eq!(matches[0].food, MatchedFood::Known(4));
    assert_eq!(matches[0].distance, 0.0);
    assert_eq!(matches[1].food, MatchedFood::Known(5));
    for pair in matches.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[test]
fn test_menu_query_finds_spicy_hot_dish() {
    let resolver = resolver(&menu_snapshot());
    let matches = resolver
        .resolve(&Query::new().answer(1, 2.0).answer(4, 2.0).limit(3))
        .unwrap();
    assert_eq!(matches[0].food, MatchedFood::Known(1));
    assert_eq!(matches[1].food, MatchedFood::Known(3));
}

#[test]
fn test_persisted_artifacts_answer_identically() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(temp_dir.path()).unwrap();

    let bundle = VectorSpace::build(&menu_snapshot()).unwrap().into_bundle().unwrap();
    let in_memory = QueryResolver::new(Arc::new(bundle.clone()), ResolverConfig::default());
    store.publish(&bundle).unwrap();

    // Simulates a separate query run
    drop(store);
    let live = LiveIndex::open(
        ArtifactStore::new(temp_dir.path()).unwrap(),
        ResolverConfig::default(),
    )
    .unwrap();

    let queries = [
        Query::new(),
        Query::new().answer(2, 1.5),
        Query::new().answer(1, -1.0).answer(3, 2.0).limit(2),
        Query::new().answer(4, 2.0).answer(77, 1.0).limit(50),
    ];
    for query in &queries {
        let expected = in_memory.resolve(query).unwrap();
        let actual = live.resolve(query).unwrap();
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(&actual) {
            assert_eq!(e.food, a.food);
            assert_eq!(e.distance.to_bits(), a.distance.to_bits());
        }
    }
}

#[test]
fn test_failed_build_publishes_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(temp_dir.path()).unwrap();
    store
        .publish(&VectorSpace::build(&scenario_snapshot()).unwrap().into_bundle().unwrap())
        .unwrap();
    let live_before = store.current_generation().unwrap();

    let empty = AnswerSnapshot::new(vec![1, 2], vec![]);
    let result = VectorSpace::build(&empty).and_then(|space| space.into_bundle());
    assert!(matches!(result, Err(Error::Configuration(_))));

    assert_eq!(store.current_generation().unwrap(), live_before);
    assert_eq!(store.list_generations().unwrap().len(), 1);
}

#[test]
fn test_missing_artifacts_fail_to_load() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(temp_dir.path()).unwrap();
    let result = LiveIndex::open(store, ResolverConfig::default());
    assert!(matches!(result, Err(Error::ArtifactLoad(_))));
}

#[test]
fn test_snapshot_json_end_to_end() {
    let json = r#"{
        "questions": [1, 2],
        "foods": [
            {"food_id": 9, "answers": [{"question_id": 1, "value": -2.0}]},
            {"food_id": 8, "answers": [{"question_id": 2, "value": 2.0}]}
        ]
    }"#;
    let snapshot: AnswerSnapshot = serde_json::from_str(json).unwrap();
    snapshot.validate().unwrap();

    let temp_dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(temp_dir.path()).unwrap();
    store
        .publish(&VectorSpace::build(&snapshot).unwrap().into_bundle().unwrap())
        .unwrap();

    let live = LiveIndex::open(store, ResolverConfig { default_k: 1 }).unwrap();
    let matches = live.resolve(&Query::new().answer(2, 1.0)).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].food, MatchedFood::Known(8));
    assert_eq!(matches[0].to_string(), "Food ID: 8 (Distance: 1.0000)");
}
