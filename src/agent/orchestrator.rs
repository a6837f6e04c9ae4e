//! Agent orchestrator
//!
//! Owns the chat model, every tool session, and the transcript. One user
//! utterance is one turn: ask the model, run any tool calls it requests, and
//! ask again for the final prose answer.

use futures::future::join_all;
use indexmap::IndexMap;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::agent::conversation::Conversation;
use crate::agent::directive::{parse_reply, Reply, DIRECTIVE_KEY};
use crate::agent::recap::{RecapRecord, RecapStore};
use crate::core::{
    BridgeError, Message, Result, ToolDescriptor, ToolInvocationRequest, ToolResult,
};
use crate::llm::{is_fallback, ChatModel};
use crate::tools::{render_catalog, ToolSession};

/// Lifecycle of one interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; nothing started yet
    Unconfigured,
    /// Providers are being started
    Initializing,
    /// Every provider is up and the system prompt is built
    Ready,
    /// At least one turn has run
    Conversing,
    /// Shutdown in progress
    Terminating,
    /// Everything released
    Closed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Unconfigured => "unconfigured",
            Phase::Initializing => "initializing",
            Phase::Ready => "ready",
            Phase::Conversing => "conversing",
            Phase::Terminating => "terminating",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Outcome of one turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Final answer shown to the user
    pub answer: String,
    /// Per-provider tool results, when the model asked for tools
    pub tool_results: Option<IndexMap<String, Value>>,
}

/// Main agent that orchestrates the model and tool providers
pub struct Orchestrator {
    /// Chat model
    llm: Box<dyn ChatModel>,
    /// Tool sessions keyed by provider name, in configuration order
    sessions: IndexMap<String, ToolSession>,
    /// Conversation history
    conversation: Conversation,
    /// Discovered tools across all providers
    catalog: Vec<ToolDescriptor>,
    /// Optional recap storage
    recaps: Option<RecapStore>,
    phase: Phase,
}

impl Orchestrator {
    /// Create an orchestrator. No process is spawned until `initialize`.
    pub fn new(llm: Box<dyn ChatModel>, sessions: Vec<ToolSession>) -> Self {
        let mut by_name = IndexMap::with_capacity(sessions.len());
        for session in sessions {
            let name = session.name().to_string();
            if by_name.insert(name.clone(), session).is_some() {
                warn!(provider = %name, "duplicate provider session replaced");
            }
        }

        Self {
            llm,
            sessions: by_name,
            conversation: Conversation::new(),
            catalog: Vec::new(),
            recaps: None,
            phase: Phase::Unconfigured,
        }
    }

    /// Attach a recap store
    pub fn with_recaps(mut self, store: RecapStore) -> Self {
        self.recaps = Some(store);
        self
    }

    /// Start every provider in turn, then build the system prompt.
    ///
    /// All-or-nothing: the first provider failure shuts everything down and
    /// is returned.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.phase != Phase::Unconfigured {
            return Err(BridgeError::AlreadyInitialized("orchestrator".to_string()));
        }
        self.phase = Phase::Initializing;

        let catalog = match self.start_providers().await {
            Ok(catalog) => catalog,
            Err(e) => {
                self.shutdown().await;
                return Err(e);
            }
        };

        self.conversation
            .set_system_prompt(build_system_prompt(&render_catalog(&catalog)));
        self.catalog = catalog;
        self.phase = Phase::Ready;

        info!(
            providers = self.sessions.len(),
            tools = self.catalog.len(),
            "orchestrator ready"
        );
        Ok(())
    }

    async fn start_providers(&self) -> Result<Vec<ToolDescriptor>> {
        let mut catalog = Vec::new();
        for session in self.sessions.values() {
            let discovered = match session.initialize().await {
                Ok(()) => session.list_tools().await,
                Err(e) => Err(e),
            };
            match discovered {
                Ok(tools) => catalog.extend(tools),
                Err(e) => {
                    error!(provider = %session.name(), error = %e, "startup aborted");
                    return Err(e);
                }
            }
        }
        Ok(catalog)
    }

    /// Append a recap to the system prompt before the first turn
    pub fn attach_recap(&mut self, recap: &str) -> Result<()> {
        if self.phase != Phase::Ready {
            return Err(BridgeError::NotInitialized("orchestrator".to_string()));
        }
        let prompt = self.conversation.system_prompt().unwrap_or_default();
        let prompt = format!(
            "{}\n\nRecap of an earlier conversation with this user:\n{}",
            prompt, recap
        );
        self.conversation.set_system_prompt(prompt);
        Ok(())
    }

    /// Run one turn for a user utterance
    pub async fn process_turn(&mut self, user_input: &str) -> Result<TurnOutcome> {
        if !matches!(self.phase, Phase::Ready | Phase::Conversing) {
            return Err(BridgeError::NotInitialized("orchestrator".to_string()));
        }
        self.phase = Phase::Conversing;

        self.conversation.add_user(user_input);
        let reply = self.llm.chat(&self.conversation.get_messages()).await;
        debug!(reply = %reply, "assistant");
        self.conversation.add_assistant(reply.clone());

        let requests = match parse_reply(&reply)? {
            Reply::Answer => {
                return Ok(TurnOutcome {
                    answer: reply,
                    tool_results: None,
                })
            }
            Reply::Invocations(requests) => requests,
        };

        let results = self.dispatch(&requests).await?;
        let payload = serde_json::to_string(&results)?;
        debug!(payload = %payload, "tool results");
        self.conversation.add_system(payload);

        let answer = self.llm.chat(&self.conversation.get_messages()).await;
        debug!(reply = %answer, "assistant");
        self.conversation.add_assistant(answer.clone());

        Ok(TurnOutcome {
            answer,
            tool_results: Some(results),
        })
    }

    /// Fan the requests out to their providers and wait for all of them.
    ///
    /// Every target is checked before anything is invoked. Tool failures
    /// become error payloads; a provider named twice keeps its last result.
    async fn dispatch(
        &self,
        requests: &[ToolInvocationRequest],
    ) -> Result<IndexMap<String, Value>> {
        if let Some(unknown) = requests
            .iter()
            .find(|r| !self.sessions.contains_key(&r.server))
        {
            return Err(BridgeError::UnknownServer {
                name: unknown.server.clone(),
                available: self
                    .sessions
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let calls = requests.iter().map(|request| async move {
            let session = &self.sessions[&request.server];
            info!(provider = %request.server, tool = %request.tool, "invoking tool");
            let outcome = session
                .invoke(&request.tool, request.arguments.clone())
                .await;
            (request.server.clone(), request.tool.clone(), outcome)
        });

        let mut results = IndexMap::new();
        for (server, tool, outcome) in join_all(calls).await {
            let value = match outcome {
                // raw provider payload stays out of the transcript
                Ok(result) => serde_json::to_value(ToolResult {
                    data: None,
                    ..result
                })?,
                Err(BridgeError::Invoke(failure)) => json!({
                    "tool": failure.tool,
                    "success": false,
                    "error": failure.to_string(),
                    "attempts": failure.attempts,
                }),
                Err(other) => json!({
                    "tool": tool,
                    "success": false,
                    "error": other.to_string(),
                }),
            };
            results.insert(server, value);
        }
        Ok(results)
    }

    /// Ask the model to condense the conversation and store it as a recap
    pub async fn summarize_to_recap(&self) -> Result<RecapRecord> {
        let store = self
            .recaps
            .as_ref()
            .ok_or_else(|| BridgeError::recap("Recap storage is not configured"))?;
        if self.conversation.is_empty() {
            return Err(BridgeError::recap("Nothing to summarize yet"));
        }

        let mut messages = self.conversation.get_messages();
        messages.push(Message::user(
            "Summarize the storyline of this conversation so far in under 500 words. \
             Keep every exact number and date. Reply with the summary text only, \
             without any tool directive.",
        ));

        let summary = self.llm.chat(&messages).await;
        if is_fallback(&summary) || summary.trim().is_empty() {
            return Err(BridgeError::recap("The model did not produce a summary"));
        }
        store.save(summary.trim()).await
    }

    /// Release the model client and every provider. Never fails; safe to repeat.
    pub async fn shutdown(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.phase = Phase::Terminating;
        info!("shutting down");

        self.llm.cleanup().await;
        join_all(self.sessions.values().map(|session| session.cleanup())).await;

        self.phase = Phase::Closed;
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Tools discovered at startup
    pub fn catalog(&self) -> &[ToolDescriptor] {
        &self.catalog
    }

    /// Configured provider names
    pub fn provider_names(&self) -> Vec<&str> {
        self.sessions.keys().map(String::as_str).collect()
    }

    /// Each provider with whether its session is live
    pub async fn provider_status(&self) -> Vec<(String, bool)> {
        let mut status = Vec::with_capacity(self.sessions.len());
        for (name, session) in &self.sessions {
            status.push((name.clone(), session.is_ready().await));
        }
        status
    }

    /// Transcript so far, system prompt first
    pub fn transcript(&self) -> Vec<Message> {
        self.conversation.get_messages()
    }

    /// Get conversation length
    pub fn conversation_length(&self) -> usize {
        self.conversation.len()
    }

    /// Recap store, if configured
    pub fn recaps(&self) -> Option<&RecapStore> {
        self.recaps.as_ref()
    }

    /// Model name
    pub fn model_name(&self) -> &str {
        self.llm.name()
    }
}

/// Splice the rendered tool catalog into the fixed instructions
pub fn build_system_prompt(tools_description: &str) -> String {
    format!(
        r#"You are a helpful assistant with access to these tools:

{tools}

Choose the appropriate tool based on the user's question. If no tool is needed, reply directly.

IMPORTANT: When you need to use tools, you must ONLY respond with the exact JSON object below, nothing else:
{{"{key}": [{{
    "server": "server-name",
    "tool": "tool-name",
    "arguments": {{
        "argument-name": "value"
    }}
}}]}}

After receiving a tool's response:
1. Transform the raw data into a natural, conversational response
2. Keep responses concise but informative
3. Focus on the most relevant information
4. Use appropriate context from the user's question
5. Avoid simply repeating the raw data

Please use only the tools that are explicitly defined above."#,
        tools = tools_description,
        key = DIRECTIVE_KEY,
    )
}
