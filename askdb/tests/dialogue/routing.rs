//! Intent and relevance routing, fail-open classification.

use std::sync::Arc;
use std::time::Duration;

use askdb::{TurnKind, SEPARATOR};

use crate::common::{harness, test_prompts, SMALL_TALK};

/// **Scenario**: A greeting gets a small-talk reply and never reaches validation.
#[tokio::test]
async fn greeting_gets_small_talk() {
    let h = harness().build();
    h.script.set_default("intent", "greeting");
    let out = h.orchestrator.run("alice", "sales", "hi there").await.unwrap();
    assert_eq!(out.kind, TurnKind::Reply);
    assert_eq!(out.explanation, SMALL_TALK);
    assert_eq!(out.final_sql, None);
    assert_eq!(h.script.count("relevance"), 0);
    assert_eq!(h.script.count("validate"), 0);
}

/// **Scenario**: Small-talk failure falls back to the fixed greeting.
#[tokio::test]
async fn chitchat_failure_uses_fallback() {
    let h = harness().build();
    h.script.push("intent", "chitchat");
    h.script.push_err("small_talk");
    let out = h.orchestrator.run("alice", "sales", "how are you").await.unwrap();
    assert_eq!(out.kind, TurnKind::Reply);
    assert_eq!(out.explanation, test_prompts().greeting_fallback);
}

/// **Scenario**: An out-of-domain request is refused with the fixed message.
#[tokio::test]
async fn out_of_domain_is_refused() {
    let h = harness().build();
    h.script.push("relevance", "irrelevant");
    let out = h.orchestrator.run("alice", "sales", "weather tomorrow?").await.unwrap();
    assert_eq!(out.kind, TurnKind::Reply);
    assert_eq!(out.explanation, test_prompts().out_of_domain);
    assert_eq!(h.script.count("validate"), 0);
    assert!(h.script.requests("relevance")[0][0]
        .content()
        .contains("sales(division TEXT"));
}

/// **Scenario**: Classifier errors and unknown labels fail open to the SQL path.
#[tokio::test]
async fn classifier_failures_fail_open() {
    let h = harness().build();
    h.script.push_err("intent");
    h.script.push("relevance", "maybe");
    let out = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(out.kind, TurnKind::Answer);
    assert!(out.final_sql.is_some());
}

/// **Scenario**: Classifiers slower than their deadline fail open; later stages still answer.
#[tokio::test]
async fn slow_classifiers_time_out_and_fail_open() {
    let h = harness()
        .config(|c| c.timeouts.classify = Duration::from_millis(10))
        .llm(|script| Arc::new(script.llm().with_delay(Duration::from_millis(100))))
        .build();
    h.script.set_default("intent", "greeting");
    let out = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(out.kind, TurnKind::Answer);
    assert!(out.final_sql.is_some());
    assert_eq!(h.script.count("small_talk"), 0);
}

/// **Scenario**: Intent classification sees recent user turns but never a scoped answer.
#[tokio::test]
async fn scoped_answers_are_hidden_from_intent() {
    let h = harness().build();
    h.orchestrator.run("alice", "sales", "revenue of north").await.unwrap();
    h.orchestrator.run("alice", "sales", "and for south?").await.unwrap();

    let intent = h.script.requests("intent");
    assert_eq!(intent.len(), 2);
    let history: Vec<&str> = intent[1][1..].iter().map(|m| m.content()).collect();
    assert_eq!(history, vec!["revenue of north", "and for south?"]);
    assert!(intent[1].iter().all(|m| !m.content().contains(SEPARATOR)));

    // validation still sees the full history
    let validate = h.script.requests("validate");
    assert!(validate[1].iter().any(|m| m.content().contains("SELECT")));
}

/// **Scenario**: Intent history is bounded by the configured window.
#[tokio::test]
async fn intent_history_window() {
    let h = harness().config(|c| c.intent_history = 1).build();
    h.script.set_default("intent", "greeting");
    for text in ["one", "two", "three"] {
        h.orchestrator.run("alice", "sales", text).await.unwrap();
    }
    let intent = h.script.requests("intent");
    let last: Vec<&str> = intent[2][1..].iter().map(|m| m.content()).collect();
    assert_eq!(last, vec![SMALL_TALK, "three"]);
}
