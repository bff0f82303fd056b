use edtech_backend::knowledge::{KnowledgeError, KnowledgeKey, KnowledgeStateEngine, StatusTier};

mod common;

fn key(subtopic: &str) -> KnowledgeKey {
    KnowledgeKey::new(1, "Algorithms", subtopic)
}

async fn seed(engine: &KnowledgeStateEngine, key: &KnowledgeKey, mastery: u8) {
    engine.update(key, mastery, 300).await.unwrap();
}

#[tokio::test]
async fn first_attempt_at_85_is_expert() {
    let (engine, _) = common::engine();
    let update = engine.update(&key("Sorting"), 85, 240).await.unwrap();

    assert_eq!(update.mastery, 85);
    assert_eq!(update.status, StatusTier::Expert);
    assert_eq!(update.previous_mastery, None);
}

#[tokio::test]
async fn first_attempt_boundaries() {
    let (engine, _) = common::engine();
    for (score, tier) in [
        (49, StatusTier::Novice),
        (50, StatusTier::Competent),
        (79, StatusTier::Competent),
        (80, StatusTier::Expert),
    ] {
        let update = engine.update(&key(&format!("boundary-{score}")), score, 120).await.unwrap();
        assert_eq!(update.mastery, score);
        assert_eq!(update.status, tier, "score {score}");
    }
}

#[tokio::test]
async fn competent_learner_with_strong_attempt_stays_competent() {
    let (engine, _) = common::engine();
    let k = key("Graphs");
    seed(&engine, &k, 60).await;

    let update = engine.update(&k, 90, 200).await.unwrap();
    assert_eq!(update.mastery, 69);
    assert_eq!(update.status, StatusTier::Competent);
    assert_eq!(update.previous_mastery, Some(60));
}

#[tokio::test]
async fn rushing_attempt_is_flagged_without_changing_the_result() {
    let (engine, _) = common::engine();
    let k = key("Heaps");
    seed(&engine, &k, 45).await;

    let update = engine.update(&k, 20, 15).await.unwrap();
    assert_eq!(update.mastery, 37);
    assert_eq!(update.status, StatusTier::Novice);
    assert!(update.rushing_suspected);

    let (twin, _) = common::engine();
    let k2 = key("Heaps");
    seed(&twin, &k2, 45).await;
    let patient = twin.update(&k2, 20, 600).await.unwrap();
    assert_eq!(patient.mastery, update.mastery);
    assert!(!patient.rushing_suspected);
}

#[tokio::test]
async fn repeating_an_update_is_not_idempotent() {
    let (engine, _) = common::engine();
    let k = key("Tries");
    seed(&engine, &k, 40).await;

    let first = engine.update(&k, 100, 300).await.unwrap();
    let second = engine.update(&k, 100, 300).await.unwrap();
    assert_eq!(first.mastery, 58);
    assert_eq!(second.mastery, 70);
}

#[tokio::test]
async fn status_defaults_to_novice_for_unknown_keys() {
    let (engine, _) = common::engine();
    assert_eq!(engine.status_for(&key("Unseen")).await.unwrap(), StatusTier::Novice);
    assert_eq!(engine.mastery_for(&key("Unseen")).await.unwrap(), None);
}

#[tokio::test]
async fn failed_write_leaves_record_unchanged() {
    let (engine, repo) = common::engine();
    let k = key("Hashing");
    seed(&engine, &k, 70).await;

    repo.set_unavailable(true);
    let err = engine.update(&k, 0, 300).await.unwrap_err();
    assert!(matches!(err, KnowledgeError::Repository(_)));

    repo.set_unavailable(false);
    assert_eq!(engine.mastery_for(&k).await.unwrap(), Some(70));
}

#[tokio::test]
async fn progress_lists_only_that_user() {
    let (engine, _) = common::engine();
    seed(&engine, &KnowledgeKey::new(1, "Rust", "Traits"), 90).await;
    seed(&engine, &KnowledgeKey::new(1, "Rust", "Async"), 30).await;
    seed(&engine, &KnowledgeKey::new(2, "Rust", "Traits"), 10).await;

    let progress = engine.progress_for_user(1).await.unwrap();
    let subtopics: Vec<_> = progress.iter().map(|r| r.key.subtopic.as_str()).collect();
    assert_eq!(subtopics, vec!["Async", "Traits"]);
    assert_eq!(progress[1].status(), StatusTier::Expert);
}
