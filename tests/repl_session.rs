//! REPL sessions driven from scripted input and an injected interrupt
//!
//! The chat model answers from a script and never returns once the script
//! runs out, which stands in for a hung endpoint.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::BufReader;
use tokio::sync::watch;
use toolbridge::agent::{Orchestrator, Phase, RecapStore};
use toolbridge::core::{Config, Message, Result, RetryPolicy, ToolProviderConfig, ToolResult};
use toolbridge::llm::ChatModel;
use toolbridge::tools::{RemoteTool, ToolConnection, ToolConnector, ToolSession};
use toolbridge::Repl;

#[derive(Default)]
struct ScriptState {
    replies: VecDeque<String>,
    calls: usize,
    system_prompts: Vec<String>,
    cleanups: usize,
}

#[derive(Clone, Default)]
struct ScriptedModel {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Self {
        let model = Self::default();
        model.state.lock().unwrap().replies = replies.iter().map(|r| r.to_string()).collect();
        model
    }

    fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    fn cleanups(&self) -> usize {
        self.state.lock().unwrap().cleanups
    }

    fn first_system_prompt(&self) -> String {
        self.state.lock().unwrap().system_prompts[0].clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, messages: &[Message]) -> String {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            state.system_prompts.push(messages[0].content.clone());
            state.replies.pop_front()
        };
        match next {
            Some(reply) => reply,
            None => std::future::pending().await,
        }
    }

    async fn cleanup(&mut self) {
        self.state.lock().unwrap().cleanups += 1;
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// Provider with no tools that only counts its lifecycle
struct IdleProvider {
    counters: Arc<Counters>,
}

struct IdleConnection {
    counters: Arc<Counters>,
}

#[async_trait]
impl ToolConnector for IdleProvider {
    async fn connect(&self, _config: &ToolProviderConfig) -> Result<Box<dyn ToolConnection>> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(IdleConnection {
            counters: self.counters.clone(),
        }))
    }
}

#[async_trait]
impl ToolConnection for IdleConnection {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>> {
        Ok(Vec::new())
    }

    async fn call_tool(&mut self, name: &str, _arguments: Map<String, Value>) -> Result<ToolResult> {
        Ok(ToolResult::success(name, "ok"))
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn agent(model: &ScriptedModel) -> (Orchestrator, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let connector: Arc<dyn ToolConnector> = Arc::new(IdleProvider {
        counters: counters.clone(),
    });
    let session = ToolSession::new(
        ToolProviderConfig::new("memory", "fake"),
        connector,
        RetryPolicy::default(),
    );
    (
        Orchestrator::new(Box::new(model.clone()), vec![session]),
        counters,
    )
}

fn config(offer_on_start: bool) -> Config {
    let mut config = Config::default();
    config.recap.offer_on_start = offer_on_start;
    config
}

/// Interrupt that is never raised
fn quiet() -> watch::Receiver<bool> {
    watch::channel(false).1
}

fn interrupt_after(delay: Duration) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(true);
    });
    rx
}

#[tokio::test]
async fn end_of_input_closes_the_session() {
    let model = ScriptedModel::new(&["hi there"]);
    let (agent, counters) = agent(&model);
    let mut repl = Repl::new(agent, config(false));

    repl.run_with(BufReader::new(&b"hello\n"[..]), quiet())
        .await
        .unwrap();

    assert_eq!(model.calls(), 1);
    assert_eq!(repl.agent().phase(), Phase::Closed);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    assert_eq!(model.cleanups(), 1);
}

#[tokio::test]
async fn exit_keyword_stops_reading() {
    let model = ScriptedModel::new(&["hi there"]);
    let (agent, _) = agent(&model);
    let mut repl = Repl::new(agent, config(false));

    repl.run_with(BufReader::new(&b"EXIT\nhello\n"[..]), quiet())
        .await
        .unwrap();

    assert_eq!(model.calls(), 0);
    assert_eq!(repl.agent().phase(), Phase::Closed);
}

#[tokio::test]
async fn raised_interrupt_skips_startup() {
    let model = ScriptedModel::new(&["hi there"]);
    let (agent, counters) = agent(&model);
    let mut repl = Repl::new(agent, config(false));

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    repl.run_with(BufReader::new(&b"hello\n"[..]), rx)
        .await
        .unwrap();

    assert_eq!(counters.connects.load(Ordering::SeqCst), 0);
    assert_eq!(model.calls(), 0);
    assert_eq!(repl.agent().phase(), Phase::Closed);
}

#[tokio::test]
async fn interrupt_cancels_a_hung_turn() {
    let model = ScriptedModel::new(&[]);
    let (agent, counters) = agent(&model);
    let mut repl = Repl::new(agent, config(false));

    repl.run_with(
        BufReader::new(&b"hello\n"[..]),
        interrupt_after(Duration::from_millis(20)),
    )
    .await
    .unwrap();

    assert_eq!(model.calls(), 1);
    assert_eq!(repl.agent().phase(), Phase::Closed);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    assert_eq!(model.cleanups(), 1);
}

#[tokio::test]
async fn interrupt_cancels_a_hung_slash_command() {
    let tmp = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(&["hi there"]);
    let (agent, counters) = agent(&model);
    let agent = agent.with_recaps(RecapStore::new(tmp.path()));
    let mut repl = Repl::new(agent, config(false));

    // the summary request behind /remember never returns
    repl.run_with(
        BufReader::new(&b"hello\n/remember\n"[..]),
        interrupt_after(Duration::from_millis(50)),
    )
    .await
    .unwrap();

    assert_eq!(model.calls(), 2);
    assert_eq!(repl.agent().phase(), Phase::Closed);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    assert!(RecapStore::new(tmp.path()).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn interrupt_at_recap_question_ends_the_session() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("recap.txt"), "met on the 3rd").unwrap();

    let model = ScriptedModel::new(&["hi there"]);
    let (agent, counters) = agent(&model);
    let agent = agent.with_recaps(RecapStore::new(tmp.path()));
    let mut repl = Repl::new(agent, config(true));

    // the writer stays open, so the question is never answered
    let (_writer, reader) = tokio::io::duplex(64);
    repl.run_with(
        BufReader::new(reader),
        interrupt_after(Duration::from_millis(20)),
    )
    .await
    .unwrap();

    assert_eq!(model.calls(), 0);
    assert_eq!(repl.agent().phase(), Phase::Closed);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    assert!(!repl.agent().transcript()[0].content.contains("met on the 3rd"));
}

#[tokio::test]
async fn accepted_recap_reaches_the_model() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("recap.txt"), "met on the 3rd").unwrap();

    let model = ScriptedModel::new(&["hi there"]);
    let (agent, _) = agent(&model);
    let agent = agent.with_recaps(RecapStore::new(tmp.path()));
    let mut repl = Repl::new(agent, config(true));

    repl.run_with(BufReader::new(&b"y\nhello\n"[..]), quiet())
        .await
        .unwrap();

    assert_eq!(model.calls(), 1);
    assert!(model.first_system_prompt().contains("met on the 3rd"));
}

#[tokio::test]
async fn unreadable_recap_does_not_end_the_session() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("recap.txt"), [0xff, 0xfe, b'a']).unwrap();

    let model = ScriptedModel::new(&["hi there"]);
    let (agent, _) = agent(&model);
    let agent = agent.with_recaps(RecapStore::new(tmp.path()));
    let mut repl = Repl::new(agent, config(true));

    repl.run_with(BufReader::new(&b"hello\n"[..]), quiet())
        .await
        .unwrap();

    assert_eq!(model.calls(), 1);
    assert_eq!(repl.agent().phase(), Phase::Closed);
}
