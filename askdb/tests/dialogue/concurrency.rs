//! Per-key serialization and checkpoint failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use askdb::{
    CheckpointError, CheckpointStore, ConversationState, MemorySaver, TurnError, TurnKind,
};

use crate::common::harness;

/// **Scenario**: Concurrent turns on one conversation are serialized; no turn overwrites another.
#[tokio::test]
async fn same_key_turns_are_serialized() {
    let store = Arc::new(MemorySaver::new());
    let h = harness()
        .checkpoints(store.clone())
        .llm(|script| Arc::new(script.llm().with_delay(Duration::from_millis(5))))
        .build();

    let turns = ["first", "second", "third"]
        .into_iter()
        .map(|text| h.orchestrator.run("alice", "sales", text));
    for out in join_all(turns).await {
        assert_eq!(out.unwrap().kind, TurnKind::Answer);
    }

    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert_eq!(saved.turns.len(), 6);
    let mut users: Vec<&str> = saved
        .turns
        .iter()
        .filter(|u| !u.scoped)
        .map(|u| u.text.as_str())
        .collect();
    users.sort();
    assert_eq!(users, vec!["first", "second", "third"]);
}

/// **Scenario**: Different subjects on the same conversation key keep separate state.
#[tokio::test]
async fn conversations_are_keyed_by_subject() {
    let store = Arc::new(MemorySaver::new());
    let h = harness().checkpoints(store.clone()).build();
    let (a, b) = futures::join!(
        h.orchestrator.run("alice", "sales", "revenue"),
        h.orchestrator.run("bob", "sales", "revenue"),
    );
    assert!(a.unwrap().final_sql.unwrap().contains("division = '7001'"));
    assert!(!b.unwrap().final_sql.unwrap().contains("division"));
    assert_eq!(store.len(), 2);
}

struct FailingStore {
    fail_load: bool,
    saves: AtomicUsize,
}

#[async_trait]
impl CheckpointStore for FailingStore {
    async fn load(&self, _key: &str) -> Result<Option<ConversationState>, CheckpointError> {
        if self.fail_load {
            Err(CheckpointError::Storage("disk gone".into()))
        } else {
            Ok(None)
        }
    }

    async fn save(&self, _key: &str, _state: &ConversationState) -> Result<(), CheckpointError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(CheckpointError::Storage("read-only".into()))
    }
}

/// **Scenario**: A load failure aborts the turn before any model call.
#[tokio::test]
async fn checkpoint_load_failure_is_fatal() {
    let h = harness()
        .checkpoints(Arc::new(FailingStore {
            fail_load: true,
            saves: AtomicUsize::new(0),
        }))
        .build();
    let err = h.orchestrator.run("alice", "sales", "revenue").await.unwrap_err();
    assert!(matches!(err, TurnError::CheckpointUnavailable(CheckpointError::Storage(_))));
    assert_eq!(err.code(), "CHECKPOINT_UNAVAILABLE");
    assert_eq!(h.script.total(), 0);
}

/// **Scenario**: A save failure is reported even though the graph ran.
#[tokio::test]
async fn checkpoint_save_failure_is_fatal() {
    let store = Arc::new(FailingStore {
        fail_load: false,
        saves: AtomicUsize::new(0),
    });
    let h = harness().checkpoints(store.clone()).build();
    let err = h.orchestrator.run("alice", "sales", "revenue").await.unwrap_err();
    assert!(matches!(err, TurnError::CheckpointUnavailable(_)));
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
}

struct SlowStore;

#[async_trait]
impl CheckpointStore for SlowStore {
    async fn load(&self, _key: &str) -> Result<Option<ConversationState>, CheckpointError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }

    async fn save(&self, _key: &str, _state: &ConversationState) -> Result<(), CheckpointError> {
        Ok(())
    }
}

/// **Scenario**: A checkpoint store slower than its deadline reports a timeout.
#[tokio::test]
async fn checkpoint_timeout_is_fatal() {
    let h = harness()
        .config(|c| c.timeouts.checkpoint = Duration::from_millis(20))
        .checkpoints(Arc::new(SlowStore))
        .build();
    let err = h.orchestrator.run("alice", "sales", "revenue").await.unwrap_err();
    assert!(matches!(
        err,
        TurnError::CheckpointUnavailable(CheckpointError::Timeout(_))
    ));
}
