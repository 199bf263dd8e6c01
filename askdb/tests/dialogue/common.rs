//! Shared harness: stage-aware mock LLM script, fixed resolver, rules and config.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use askdb::{
    AccessRule, CheckpointStore, Collaborators, EntityResolver, InMemoryRuleStore, LlmClient,
    LlmError, MemorySaver, Message, MockLlm, Orchestrator, OrchestratorConfig, Prompts,
    ResolveError, ResolvedEntity, StageTimeouts,
};

pub const SCHEMA: &str = "sales(division TEXT, day TEXT, revenue REAL)";
pub const DRAFT_SQL: &str = "SELECT revenue FROM sales WHERE day = '20240101'";
pub const ALICE_SQL: &str =
    "SELECT revenue FROM sales WHERE (day = '20240101') AND (division = '7001')";
pub const INSTRUCTION: &str = "revenue of the North division for 20240101";
pub const COMMENT: &str = "Total revenue of the North division yesterday.";
pub const SMALL_TALK: &str = "Hello! What would you like to know?";

/// Prompts whose first line names the stage, so the script can dispatch on it.
pub fn test_prompts() -> Prompts {
    let mut p = askdb::prompts::default_from_embedded();
    p.intent = "STAGE intent".into();
    p.relevance = "STAGE relevance\n{schema}".into();
    p.small_talk = "STAGE small_talk".into();
    p.validate =
        "STAGE validate\ntoday={today} yesterday={yesterday} marker={marker}\n{schema}\n{references}"
            .into();
    p.extract_filters = "STAGE extract_filters".into();
    p.generate_sql = "STAGE generate_sql\nfilters:\n{filters}".into();
    p.comment = "STAGE comment\n{restriction}\n{sql}".into();
    p
}

pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        schema: SCHEMA.to_string(),
        reference_catalogue: "7001 North\n7002 South".to_string(),
        timeouts: StageTimeouts::uniform(Duration::from_secs(2)),
        prompts: test_prompts(),
        ..OrchestratorConfig::default()
    }
}

struct ScriptInner {
    queued: HashMap<String, VecDeque<Result<String, LlmError>>>,
    defaults: HashMap<String, String>,
    requests: Vec<(String, Vec<Message>)>,
}

/// Per-stage replies: queued replies first, then the stage default.
#[derive(Clone)]
pub struct Script {
    inner: Arc<Mutex<ScriptInner>>,
}

impl Script {
    pub fn new() -> Self {
        let defaults = [
            ("intent", "database"),
            ("relevance", "relevant"),
            ("validate", "ok: revenue of the North division for 20240101"),
            ("extract_filters", "North division"),
            (
                "generate_sql",
                "```sql\nSELECT revenue FROM sales WHERE day = '20240101'\n```",
            ),
            ("comment", COMMENT),
            ("small_talk", SMALL_TALK),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            inner: Arc::new(Mutex::new(ScriptInner {
                queued: HashMap::new(),
                defaults,
                requests: Vec::new(),
            })),
        }
    }

    pub fn push(&self, stage: &str, reply: &str) {
        self.queue(stage, Ok(reply.to_string()));
    }

    pub fn push_err(&self, stage: &str) {
        self.queue(stage, Err(LlmError::Api(format!("{} unavailable", stage))));
    }

    fn queue(&self, stage: &str, reply: Result<String, LlmError>) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .queued
            .entry(stage.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn set_default(&self, stage: &str, reply: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.defaults.insert(stage.to_string(), reply.to_string());
    }

    /// Requests received by `stage`, including the system message.
    pub fn requests(&self, stage: &str) -> Vec<Vec<Message>> {
        let inner = self.inner.lock().unwrap();
        inner
            .requests
            .iter()
            .filter(|(s, _)| s == stage)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn count(&self, stage: &str) -> usize {
        self.requests(stage).len()
    }

    pub fn total(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    fn reply(&self, messages: &[Message]) -> Result<String, LlmError> {
        let stage = messages
            .first()
            .and_then(|m| m.content().lines().next())
            .and_then(|l| l.strip_prefix("STAGE "))
            .unwrap_or("unknown")
            .to_string();
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push((stage.clone(), messages.to_vec()));
        if let Some(reply) = inner.queued.get_mut(&stage).and_then(|q| q.pop_front()) {
            return reply;
        }
        inner
            .defaults
            .get(&stage)
            .cloned()
            .ok_or_else(|| LlmError::Api(format!("no reply for stage {}", stage)))
    }

    pub fn llm(&self) -> MockLlm {
        let script = self.clone();
        MockLlm::with_handler(move |messages| script.reply(messages))
    }
}

/// Resolver with a fixed phrase table.
pub struct FixedResolver {
    entries: HashMap<String, ResolvedEntity>,
}

impl FixedResolver {
    pub fn divisions() -> Self {
        let mut entries = HashMap::new();
        for (phrase, key, label) in [("North division", "7001", "North"), ("South", "7002", "South")] {
            entries.insert(
                phrase.to_string(),
                ResolvedEntity {
                    table: "divisions".into(),
                    key: key.into(),
                    label: label.into(),
                    distance: 0.05,
                },
            );
        }
        Self { entries }
    }
}

#[async_trait]
impl EntityResolver for FixedResolver {
    async fn resolve(
        &self,
        phrases: &[String],
    ) -> Result<BTreeMap<String, ResolvedEntity>, ResolveError> {
        Ok(phrases
            .iter()
            .filter_map(|p| self.entries.get(p).map(|e| (p.clone(), e.clone())))
            .collect())
    }
}

pub fn rules() -> InMemoryRuleStore {
    InMemoryRuleStore::from_rules([
        AccessRule::new("alice", "sales", "division = '7001'"),
        AccessRule::new("alice", "report*", "division IN ('7001', '7002')"),
        AccessRule::new("bob", "*", ""),
    ])
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub script: Script,
}

pub struct HarnessBuilder {
    config: OrchestratorConfig,
    script: Script,
    llm: Option<Arc<dyn LlmClient>>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl HarnessBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut OrchestratorConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn llm(mut self, f: impl FnOnce(&Script) -> Arc<dyn LlmClient>) -> Self {
        self.llm = Some(f(&self.script));
        self
    }

    pub fn checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = store;
        self
    }

    pub fn build(self) -> Harness {
        let llm = self.llm.unwrap_or_else(|| Arc::new(self.script.llm()));
        let orchestrator = Orchestrator::new(
            self.config,
            Collaborators {
                llm,
                resolver: Arc::new(FixedResolver::divisions()),
                rules: Arc::new(rules()),
                checkpoints: self.checkpoints,
            },
        )
        .expect("orchestrator builds")
        .with_clock(Arc::new(today));
        Harness {
            orchestrator,
            script: self.script,
        }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder {
        config: test_config(),
        script: Script::new(),
        llm: None,
        checkpoints: Arc::new(MemorySaver::new()),
    }
}

pub fn memory_harness() -> (Harness, Arc<MemorySaver>) {
    let store = Arc::new(MemorySaver::new());
    let h = harness().checkpoints(store.clone()).build();
    (h, store)
}
