//! Clarification sub-dialogue: suspend, resume, cancel.

use std::sync::Arc;

use askdb::{CheckpointStore, Message, SqliteSaver, TurnKind, Utterance};

use crate::common::{harness, memory_harness, test_prompts, ALICE_SQL};

/// **Scenario**: Two clarifying questions suspend two turns; the third turn is accepted and commits the exchange.
#[tokio::test]
async fn clarification_persists_across_turns() {
    let (h, store) = memory_harness();
    h.script.push("validate", "Which day do you mean?");
    h.script.push("validate", "Which measure?");

    let first = h.orchestrator.run("alice", "sales", "north numbers").await.unwrap();
    assert_eq!(first.kind, TurnKind::Clarification);
    assert_eq!(first.final_sql, None);
    assert_eq!(first.explanation, "Which day do you mean?");
    assert!(first.is_clarification_pending());

    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert_eq!(saved.turns, vec![Utterance::user("north numbers")]);
    assert_eq!(saved.clarification.as_ref().map(|c| c.rounds), Some(1));

    let second = h.orchestrator.run("alice", "sales", "yesterday").await.unwrap();
    assert_eq!(second.kind, TurnKind::Clarification);
    assert_eq!(second.explanation, "Which measure?");
    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert_eq!(saved.clarification.as_ref().map(|c| c.rounds), Some(2));

    let third = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(third.kind, TurnKind::Answer);
    assert_eq!(third.final_sql.as_deref(), Some(ALICE_SQL));

    // classification runs once per request, not per answer
    assert_eq!(h.script.count("intent"), 1);
    assert_eq!(h.script.count("relevance"), 1);

    let validate = h.script.requests("validate");
    assert_eq!(validate.len(), 3);
    assert_eq!(
        &validate[2][1..],
        &[
            Message::user("north numbers"),
            Message::assistant("Which day do you mean?"),
            Message::user("yesterday"),
            Message::assistant("Which measure?"),
            Message::user("revenue"),
        ]
    );

    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert!(saved.clarification.is_none());
    let texts: Vec<&str> = saved.turns.iter().map(|u| u.text.as_str()).collect();
    assert_eq!(
        &texts[..5],
        &["north numbers", "Which day do you mean?", "yesterday", "Which measure?", "revenue"]
    );
    assert_eq!(saved.turns.len(), 6);
    assert!(saved.turns[5].scoped);
}

/// **Scenario**: A stop word during clarification cancels, clears pending state and keeps the history.
#[tokio::test]
async fn stop_word_cancels_pending_clarification() {
    let (h, store) = memory_harness();
    h.script.push("validate", "Which day do you mean?");
    h.orchestrator.run("alice", "sales", "north numbers").await.unwrap();

    let out = h.orchestrator.run("alice", "sales", "Cancel").await.unwrap();
    assert_eq!(out.kind, TurnKind::Cancelled);
    assert_eq!(out.explanation, test_prompts().cancelled);
    assert_eq!(out.final_sql, None);

    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert!(saved.clarification.is_none());
    assert!(saved.pending_instruction.is_none());
    let texts: Vec<&str> = saved.turns.iter().map(|u| u.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "north numbers",
            "Which day do you mean?",
            "Cancel",
            test_prompts().cancelled.as_str()
        ]
    );

    // the next utterance is a fresh request
    let next = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(next.kind, TurnKind::Answer);
    assert_eq!(h.script.count("intent"), 2);
}

/// **Scenario**: Stopping after an answer clears the pending instruction.
#[tokio::test]
async fn stop_after_answer_clears_instruction() {
    let (h, store) = memory_harness();
    h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert!(store
        .load("alice/sales")
        .await
        .unwrap()
        .unwrap()
        .pending_instruction
        .is_some());

    let out = h.orchestrator.run("alice", "sales", "stop").await.unwrap();
    assert_eq!(out.kind, TurnKind::Cancelled);
    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert!(saved.pending_instruction.is_none());
}

/// **Scenario**: Empty input cancels without calling the model and is not recorded.
#[tokio::test]
async fn empty_input_cancels_without_model_calls() {
    let (h, store) = memory_harness();
    let out = h.orchestrator.run("alice", "sales", "   ").await.unwrap();
    assert_eq!(out.kind, TurnKind::Cancelled);
    assert_eq!(h.script.total(), 0);

    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert_eq!(saved.turns.len(), 1);
    assert_eq!(saved.turns[0].text, test_prompts().cancelled);
}

/// **Scenario**: A bare marker fails validation; the turn replies and no SQL is drafted.
#[tokio::test]
async fn bare_marker_fails_validation() {
    let (h, store) = memory_harness();
    h.script.push("validate", "ok");
    let out = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(out.kind, TurnKind::Reply);
    assert_eq!(out.explanation, test_prompts().validation_failed);
    assert_eq!(h.script.count("generate_sql"), 0);
    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert!(saved.pending_instruction.is_none());
}

/// **Scenario**: A suspended clarification survives an orchestrator restart with the SQLite store.
#[tokio::test]
async fn sqlite_checkpoint_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("checkpoints.db");

    let before = harness()
        .checkpoints(Arc::new(SqliteSaver::new(&db).unwrap()))
        .build();
    before.script.push("validate", "Which day do you mean?");
    let out = before.orchestrator.run("alice", "sales", "north numbers").await.unwrap();
    assert_eq!(out.kind, TurnKind::Clarification);
    drop(before);

    let after = harness()
        .checkpoints(Arc::new(SqliteSaver::new(&db).unwrap()))
        .build();
    let out = after.orchestrator.run("alice", "sales", "yesterday").await.unwrap();
    assert_eq!(out.kind, TurnKind::Answer);
    assert_eq!(after.script.count("intent"), 0);
    assert_eq!(after.script.requests("validate")[0].len(), 4);
}
