use crate::response::{parse_agent_response, AgentResponse};
use nlsh_brew::Homebrew;
use nlsh_memory::Context;
use nlsh_providers::{ChatMessage, CompletionProvider};
use nlsh_store::Store;
use nlsh_tools::{auth, run_shell, Registry, ToolResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LEARNED_TOOL_DESCRIPTION: &str = "CLI tool installed via Homebrew";

/// Result of one conversational turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Reply {
        /// The model's stated intent, shown before the result.
        explanation: Option<String>,
        body: String,
        success: bool,
    },
    /// The in-flight request was cancelled; nothing was recorded for the
    /// assistant and the caller should just re-prompt.
    Cancelled,
}

impl TurnOutcome {
    fn error(explanation: Option<String>, message: String) -> Self {
        TurnOutcome::Reply {
            explanation,
            body: message,
            success: false,
        }
    }
}

/// Top-level orchestration loop: one strictly sequential state machine per
/// turn. Ingest -> request -> parse -> resolve dependency -> dispatch ->
/// persist. Every failure past startup degrades to a recorded error string;
/// nothing here terminates the process.
pub struct Agent {
    provider: Arc<dyn CompletionProvider>,
    context: Context,
    registry: Registry,
    brew: Arc<Homebrew>,
    store: Arc<Store>,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        context: Context,
        registry: Registry,
        brew: Arc<Homebrew>,
        store: Arc<Store>,
    ) -> Self {
        Self {
            provider,
            context,
            registry,
            brew,
            store,
        }
    }

    /// Process one user utterance. The remote call is the sole suspension
    /// point; `cancel` aborts it without recording an assistant message.
    pub async fn process(&mut self, input: &str, cancel: &CancellationToken) -> TurnOutcome {
        self.context.record_user(input);

        let messages: Vec<ChatMessage> = self
            .context
            .messages()
            .iter()
            .map(|m| ChatMessage::new(m.role.as_str(), m.content.clone()))
            .collect();
        let system = self.context.render_system_prompt();

        let response = tokio::select! {
            result = self.provider.complete(&messages, &system) => result,
            _ = cancel.cancelled() => {
                tracing::info!("In-flight request cancelled");
                return TurnOutcome::Cancelled;
            }
        };

        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                let message = format!("Error: {}", e);
                self.context.record_assistant(&message);
                return TurnOutcome::error(None, message);
            }
        };

        let Some(parsed) = parse_agent_response(&raw) else {
            // Not a directive; the reply itself is the answer.
            self.context.record_assistant(&raw);
            return TurnOutcome::Reply {
                explanation: None,
                body: raw,
                success: true,
            };
        };

        let mut install_output = None;
        if let Some(package) = parsed.install_via_brew.clone() {
            if !self.brew.is_installed(&package).await {
                let (success, output) = self.brew.install(&package).await;
                if !success {
                    let message = format!("Error: Could not install {}: {}", package, output);
                    self.context.record_assistant(&message);
                    return TurnOutcome::error(Some(parsed.explanation), message);
                }
                self.register_learned_tool(&package, &parsed.action);
                install_output = Some(output);
            }
        }

        let result = self.dispatch(&parsed).await;

        let mut body = if result.success {
            result.output
        } else {
            format!(
                "Error: {}",
                result.error.unwrap_or_else(|| "Unknown error".to_string())
            )
        };
        if let Some(install) = install_output {
            if !install.trim().is_empty() {
                body = format!("{}\n{}", install.trim_end(), body);
            }
        }

        self.context.record_assistant(&body);
        TurnOutcome::Reply {
            explanation: Some(parsed.explanation),
            body,
            success: result.success,
        }
    }

    pub fn clear_context(&mut self) {
        self.context.clear();
    }

    fn register_learned_tool(&mut self, package: &str, action: &str) {
        if let Err(e) =
            self.store
                .upsert_tool(package, LEARNED_TOOL_DESCRIPTION, action, "")
        {
            tracing::warn!("Could not persist learned tool {}: {}", package, e);
        }
        self.registry.register_learned(package, LEARNED_TOOL_DESCRIPTION);
    }

    async fn dispatch(&self, response: &AgentResponse) -> ToolResult {
        // Privileged path sidesteps the registry entirely.
        if response.needs_auth {
            let (success, output) = auth::run_with_auth(&response.action).await;
            return if success {
                ToolResult::ok(output)
            } else {
                ToolResult::fail(output)
            };
        }

        match self.registry.resolve(&response.tool) {
            Some(handler) => handler.execute(&response.action).await,
            None => {
                // No handler by that name: run the action as a literal
                // shell command and classify by exit status.
                let (output, code) = run_shell(&response.action).await;
                if code == 0 {
                    ToolResult::ok(output)
                } else {
                    ToolResult::fail(output)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsh_providers::{MockProvider, PendingProvider};
    use std::time::Duration;

    fn test_agent(provider: Arc<dyn CompletionProvider>) -> (tempfile::TempDir, Agent, Arc<Store>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_at(dir.path().join("test.db")).unwrap());
        let brew = Arc::new(Homebrew::new(store.clone()));
        let context = Context::new(store.clone(), 50);
        let registry = Registry::new(brew.clone());
        let agent = Agent::new(provider, context, registry, brew, store.clone());
        (dir, agent, store)
    }

    #[tokio::test]
    async fn test_end_to_end_list_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beta.txt"), "").unwrap();
        std::fs::write(dir.path().join("alpha.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();

        let response = format!(
            r#"{{"tool":"files","action":"list:{}","explanation":"Listing files"}}"#,
            dir.path().display()
        );
        let provider = Arc::new(MockProvider::new(vec![response]));
        let (_store_dir, mut agent, store) = test_agent(provider);

        let cancel = CancellationToken::new();
        let outcome = agent.process("list files here", &cancel).await;

        match outcome {
            TurnOutcome::Reply {
                explanation,
                body,
                success,
            } => {
                assert!(success);
                assert_eq!(explanation.as_deref(), Some("Listing files"));
                assert_eq!(body, "alpha.txt\nbeta.txt\ndocs/");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // Both sides of the turn were persisted.
        let messages = store.recent_messages(10).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "list files here");
        assert_eq!(messages[1].content, "alpha.txt\nbeta.txt\ndocs/");
    }

    #[tokio::test]
    async fn test_fenced_json_is_extracted() {
        let provider = Arc::new(MockProvider::new(vec![
            "Sure! ```json\n{\"tool\":\"files\",\"action\":\"pwd\",\"explanation\":\"x\"}\n```",
        ]));
        let (_dir, mut agent, _store) = test_agent(provider);

        let outcome = agent.process("where am I", &CancellationToken::new()).await;
        match outcome {
            TurnOutcome::Reply { body, success, .. } => {
                assert!(success);
                assert!(!body.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plain_text_reply_is_recorded_verbatim() {
        let provider = Arc::new(MockProvider::new(vec![
            "I can help with files, apps, and system settings.",
        ]));
        let (_dir, mut agent, store) = test_agent(provider);

        let outcome = agent.process("what can you do", &CancellationToken::new()).await;
        match outcome {
            TurnOutcome::Reply {
                explanation,
                body,
                success,
            } => {
                assert!(success);
                assert!(explanation.is_none());
                assert_eq!(body, "I can help with files, apps, and system settings.");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let messages = store.recent_messages(10).unwrap();
        assert_eq!(
            messages[1].content,
            "I can help with files, apps, and system settings."
        );
    }

    #[tokio::test]
    async fn test_alias_routes_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("only.txt"), "").unwrap();

        let response = format!(
            r#"{{"tool":"filesystem","action":"list:{}","explanation":"x"}}"#,
            dir.path().display()
        );
        let provider = Arc::new(MockProvider::new(vec![response]));
        let (_store_dir, mut agent, _store) = test_agent(provider);

        match agent.process("ls", &CancellationToken::new()).await {
            TurnOutcome::Reply { body, success, .. } => {
                assert!(success);
                assert_eq!(body, "only.txt");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_falls_back_to_literal_command() {
        let provider = Arc::new(MockProvider::new(vec![
            r#"{"tool":"echo","action":"echo fallback works","explanation":"x"}"#,
        ]));
        let (_dir, mut agent, _store) = test_agent(provider);

        match agent.process("say something", &CancellationToken::new()).await {
            TurnOutcome::Reply { body, success, .. } => {
                assert!(success);
                assert_eq!(body, "fallback works");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failing_literal_command_is_failure() {
        let provider = Arc::new(MockProvider::new(vec![
            r#"{"tool":"whatever","action":"exit 2","explanation":"x"}"#,
        ]));
        let (_dir, mut agent, _store) = test_agent(provider);

        match agent.process("fail please", &CancellationToken::new()).await {
            TurnOutcome::Reply { success, body, .. } => {
                assert!(!success);
                assert!(body.starts_with("Error:"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_learned_tool_dispatch() {
        let provider = Arc::new(MockProvider::new(vec![
            r#"{"tool":"echo","action":"echo learned path","explanation":"x"}"#,
        ]));
        let (_dir, mut agent, store) = test_agent(provider);

        // Simulate a tool learned in a previous session.
        store.upsert_tool("echo", "prints text", "echo", "").unwrap();
        store.upsert_package_cache("echo", true, "").unwrap();
        agent.registry.load_learned(&store).unwrap();

        match agent.process("echo it", &CancellationToken::new()).await {
            TurnOutcome::Reply { body, success, .. } => {
                assert!(success);
                assert_eq!(body, "learned path");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_install_failure_short_circuits_action() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("never-written.txt");

        // The brew binary is absent in the test environment, so the install
        // fails; the write action must never run.
        let response = format!(
            r#"{{"tool":"files","action":"write:{}:data","explanation":"x","install_via_brew":"nlsh-test-missing-pkg"}}"#,
            target.display()
        );
        let provider = Arc::new(MockProvider::new(vec![response]));
        let (_store_dir, mut agent, store) = test_agent(provider);

        match agent.process("do it", &CancellationToken::new()).await {
            TurnOutcome::Reply { body, success, .. } => {
                assert!(!success);
                assert!(body.contains("Could not install nlsh-test-missing-pkg"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!target.exists());
        // No tool registration happened either.
        assert!(store.get_tool("nlsh-test-missing-pkg").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_api_error_is_recovered() {
        // Empty script: the first call already errors.
        let provider = Arc::new(MockProvider::new(Vec::<String>::new()));
        let (_dir, mut agent, store) = test_agent(provider);

        match agent.process("hello", &CancellationToken::new()).await {
            TurnOutcome::Reply { body, success, .. } => {
                assert!(!success);
                assert!(body.starts_with("Error:"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // The error is part of the transcript; the loop can continue.
        let messages = store.recent_messages(10).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_cancellation_discards_turn() {
        let provider = Arc::new(PendingProvider);
        let (_dir, mut agent, store) = test_agent(provider);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = agent.process("hang forever", &cancel).await;
        assert_eq!(outcome, TurnOutcome::Cancelled);

        // User message was ingested, but no assistant message was recorded.
        let messages = store.recent_messages(10).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hang forever");
    }

    #[tokio::test]
    async fn test_clear_context_empties_window() {
        let provider = Arc::new(MockProvider::new(vec!["plain reply"]));
        let (_dir, mut agent, store) = test_agent(provider);

        agent.process("hello", &CancellationToken::new()).await;
        agent.clear_context();
        agent.clear_context();

        assert!(store.recent_messages(10).unwrap().is_empty());
        // Raw input history survives a context clear.
        assert_eq!(store.recent_history(10).unwrap().len(), 1);
    }
}
