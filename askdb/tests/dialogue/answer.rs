//! Full turns that reach SQL drafting.

use askdb::{CheckpointStore, Message, TurnKind, TurnOutput, TurnRequest, SEPARATOR};

use crate::common::{
    harness, memory_harness, test_prompts, ALICE_SQL, COMMENT, DRAFT_SQL, INSTRUCTION,
};

/// **Scenario**: An accepted request is resolved, drafted, scoped to the subject's rule and explained.
#[tokio::test]
async fn accepted_request_produces_scoped_sql() {
    let (h, store) = memory_harness();
    let out = h
        .orchestrator
        .run("alice", "sales", "revenue of north yesterday")
        .await
        .unwrap();

    assert_eq!(out.kind, TurnKind::Answer);
    assert_eq!(out.final_sql.as_deref(), Some(ALICE_SQL));
    assert!(out.restriction_applied);
    assert_eq!(out.explanation, COMMENT);

    let rendered = out.render();
    let (sql, explanation) = TurnOutput::split(&rendered);
    assert_eq!(sql, Some(ALICE_SQL));
    assert_eq!(explanation, COMMENT);

    let saved = store.load("alice/sales").await.unwrap().expect("saved");
    assert_eq!(saved.pending_instruction.as_deref(), Some(INSTRUCTION));
    assert_eq!(saved.resolved_filters["North division"].key, "7001");
    assert_eq!(saved.draft_sql.as_deref(), Some(DRAFT_SQL));
    assert_eq!(saved.turns.len(), 2);
    assert!(!saved.turns[0].scoped);
    assert!(saved.turns[1].scoped);
}

/// **Scenario**: A configured marker "accepted" hands the restated instruction to filter extraction.
#[tokio::test]
async fn configured_marker_reaches_entity_resolution() {
    let h = harness()
        .config(|c| c.accepted_marker = "accepted".into())
        .build();
    h.script
        .push("validate", "accepted: show revenue for yesterday");

    let out = h.orchestrator.run("alice", "sales", "revenue?").await.unwrap();
    assert_eq!(out.kind, TurnKind::Answer);

    let extract = h.script.requests("extract_filters");
    assert_eq!(extract.len(), 1);
    assert_eq!(
        extract[0].last(),
        Some(&Message::user("show revenue for yesterday"))
    );
    assert!(h.script.requests("validate")[0][0]
        .content()
        .contains("marker=accepted"));
}

/// **Scenario**: The validation prompt carries the turn's local dates and starts with the seed history.
#[tokio::test]
async fn validation_prompt_has_dates_and_seed_history() {
    let h = harness()
        .config(|c| {
            c.seed_history = vec![
                Message::user("seed question"),
                Message::assistant("ok: seed instruction"),
            ]
        })
        .build();
    h.orchestrator
        .run("alice", "sales", "revenue yesterday")
        .await
        .unwrap();

    let validate = h.script.requests("validate");
    let system = validate[0][0].content();
    assert!(system.contains("today=20240102 yesterday=20240101 marker=ok"));
    assert!(system.contains("7001 North"));
    assert_eq!(validate[0][1], Message::user("seed question"));
    assert_eq!(validate[0][2], Message::assistant("ok: seed instruction"));
    assert_eq!(validate[0].last(), Some(&Message::user("revenue yesterday")));
}

/// **Scenario**: Resolved filters are listed in the drafting prompt; the comment prompt sees the final SQL.
#[tokio::test]
async fn filters_and_final_sql_reach_later_prompts() {
    let h = harness().build();
    h.orchestrator.run("alice", "sales", "north revenue").await.unwrap();

    let generate = h.script.requests("generate_sql");
    assert!(generate[0][0]
        .content()
        .contains("North division -> divisions.7001 (North)"));
    assert_eq!(generate[0].last(), Some(&Message::user(INSTRUCTION)));

    let comment = h.script.requests("comment");
    let system = comment[0][0].content();
    assert!(system.contains(ALICE_SQL));
    assert!(system.contains(test_prompts().restricted_note.trim()));
}

/// **Scenario**: No phrases means no filters and the drafting prompt says so.
#[tokio::test]
async fn no_filter_phrases() {
    let h = harness().build();
    h.script.push("extract_filters", "none");
    h.orchestrator.run("alice", "sales", "total revenue").await.unwrap();

    let generate = h.script.requests("generate_sql");
    assert!(generate[0][0].content().ends_with("filters:\nnone"));
}

/// **Scenario**: An empty draft still renders the separator, with no SQL and the fixed explanation.
#[tokio::test]
async fn generation_failure_renders_separator_without_sql() {
    let (h, store) = memory_harness();
    h.script.push("generate_sql", "```sql\n```");

    let out = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(out.kind, TurnKind::Answer);
    assert_eq!(out.final_sql, None);
    assert!(!out.restriction_applied);
    assert_eq!(out.explanation, test_prompts().generation_failed);
    assert!(out.render().starts_with(SEPARATOR));
    assert_eq!(h.script.count("comment"), 0);

    let saved = store.load("alice/sales").await.unwrap().unwrap();
    assert!(!saved.turns.last().unwrap().scoped);
}

/// **Scenario**: A drafting error behaves like an empty draft.
#[tokio::test]
async fn generation_error_renders_fixed_explanation() {
    let h = harness().build();
    h.script.push_err("generate_sql");
    let out = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(out.final_sql, None);
    assert_eq!(out.explanation, test_prompts().generation_failed);
}

/// **Scenario**: A failing comment collaborator keeps the SQL and uses the placeholder explanation.
#[tokio::test]
async fn comment_failure_uses_placeholder() {
    let h = harness().build();
    h.script.push_err("comment");
    let out = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(out.final_sql.as_deref(), Some(ALICE_SQL));
    assert_eq!(out.explanation, test_prompts().comment_unavailable);
}

/// **Scenario**: A subject without rules gets the deny-all predicate.
#[tokio::test]
async fn subject_without_rules_is_denied() {
    let h = harness().build();
    let out = h.orchestrator.run("carol", "sales", "revenue").await.unwrap();
    let sql = out.final_sql.expect("sql");
    assert!(sql.contains("1 = 0"), "{}", sql);
    assert!(out.restriction_applied);
}

/// **Scenario**: An unrestricted grant leaves the draft unchanged.
#[tokio::test]
async fn unrestricted_rule_leaves_draft() {
    let h = harness().build();
    let out = h.orchestrator.run("bob", "sales", "revenue").await.unwrap();
    assert_eq!(out.final_sql.as_deref(), Some(DRAFT_SQL));
    assert!(out.restriction_applied);
    assert!(h.script.requests("comment")[0][0]
        .content()
        .starts_with("STAGE comment\n"));
}

/// **Scenario**: An explicit resource picks the prefix rule; the checkpoint key stays subject/conversation.
#[tokio::test]
async fn explicit_resource_selects_prefix_rule() {
    let (h, store) = memory_harness();
    let out = h
        .orchestrator
        .run_request(TurnRequest {
            subject: "alice".into(),
            conversation_key: "chat-1".into(),
            resource: Some("report-weekly".into()),
            utterance: "revenue".into(),
        })
        .await
        .unwrap();
    let sql = out.final_sql.unwrap();
    assert!(sql.ends_with("AND (division IN ('7001', '7002'))"), "{}", sql);

    let saved = store.load("alice/chat-1").await.unwrap().unwrap();
    assert_eq!(saved.resource, "report-weekly");
    assert_eq!(saved.subject, "alice");
}

/// **Scenario**: A draft that does not parse is passed through unscoped.
#[tokio::test]
async fn unparsable_draft_is_not_scoped() {
    let h = harness().build();
    h.script.push("generate_sql", "this is not sql");
    let out = h.orchestrator.run("alice", "sales", "revenue").await.unwrap();
    assert_eq!(out.final_sql.as_deref(), Some("this is not sql"));
    assert!(!out.restriction_applied);
}
