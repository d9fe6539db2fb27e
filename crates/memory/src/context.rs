use nlsh_store::{Role, Store};
use serde::Serialize;
use std::sync::Arc;

/// One message in the in-memory conversation window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowMessage {
    pub role: Role,
    pub content: String,
}

/// Bounded, store-backed conversation context.
///
/// The window is loaded from the store at startup and trimmed after every
/// append, so it never exceeds the configured limit. The store stays the
/// source of truth; a failed write degrades to in-memory-only for the
/// session and is logged, never fatal.
pub struct Context {
    store: Arc<Store>,
    limit: usize,
    messages: Vec<WindowMessage>,
}

impl Context {
    pub fn new(store: Arc<Store>, limit: usize) -> Self {
        let messages = match store.recent_messages(limit) {
            Ok(messages) => messages
                .into_iter()
                .map(|m| WindowMessage {
                    role: m.role,
                    content: m.content,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("Could not load message history: {}", e);
                Vec::new()
            }
        };

        Self {
            store,
            limit,
            messages,
        }
    }

    pub fn record_user(&mut self, content: &str) {
        self.messages.push(WindowMessage {
            role: Role::User,
            content: content.to_string(),
        });

        if let Err(e) = self.store.append_message(Role::User, content) {
            tracing::warn!("Could not save message: {}", e);
        }
        if let Err(e) = self.store.append_history(content) {
            tracing::warn!("Could not save history entry: {}", e);
        }
        self.trim();
    }

    pub fn record_assistant(&mut self, content: &str) {
        self.messages.push(WindowMessage {
            role: Role::Assistant,
            content: content.to_string(),
        });

        if let Err(e) = self.store.append_message(Role::Assistant, content) {
            tracing::warn!("Could not save message: {}", e);
        }
        self.trim();
    }

    pub fn messages(&self) -> &[WindowMessage] {
        &self.messages
    }

    /// Empty the window and truncate the store's message table. The raw
    /// history log and learned tools are untouched.
    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(e) = self.store.clear_messages() {
            tracing::warn!("Could not clear messages: {}", e);
        }
    }

    fn trim(&mut self) {
        if self.messages.len() > self.limit {
            let excess = self.messages.len() - self.limit;
            self.messages.drain(..excess);
        }
    }

    /// Render the system instructions sent with every request. The learned
    /// tool list is read from the store on each call so it tracks runtime
    /// state without a cache.
    pub fn render_system_prompt(&self) -> String {
        let learned = match self.store.all_tools() {
            Ok(tools) if !tools.is_empty() => {
                let mut section = String::from("\n\nLEARNED TOOLS:\n");
                for tool in tools {
                    section.push_str(&format!("   - {}: {}\n", tool.name, tool.description));
                }
                section
            }
            Ok(_) => String::new(),
            Err(e) => {
                tracing::warn!("Could not load learned tools: {}", e);
                String::new()
            }
        };

        format!(
            r#"You are nlsh, a conversational shell assistant for the Linux desktop. Your job is to interpret user requests and execute them using available tools.

AVAILABLE TOOLS AND THEIR EXACT COMMANDS:

1. files - File system operations
   Actions: pwd | list:path | read:path | write:path:content | copy:source:dest | move:source:dest | delete:path | trash:path | mkdir:path | info:path | search:directory:pattern

2. apps - Application management
   Actions: list | launch:app_name | quit:app_name | force-quit:app_name | frontmost

3. system - System controls
   Actions: get_volume | set_volume:0.0-1.0 | get_brightness | set_brightness:0.0-1.0 | battery | wifi | disk_space | sleep

4. clipboard - Clipboard operations
   Actions: get | set:content | clear

5. search - Content and file search
   Actions: search:query | find-file:filename

6. CLI tools via Homebrew - Any command-line tool (ffmpeg, jq, lsof, etc.)
   - Auto-discovered and installed on-demand
   {learned}

RESPONSE FORMAT:
When a user makes a request, respond in JSON with:
{{
    "tool": "tool_name",
    "action": "specific_command_or_function",
    "explanation": "what you're doing",
    "needs_auth": false
}}

For CLI tools not yet installed:
{{
    "tool": "ffmpeg",
    "action": "ffmpeg -i input.mp4 output.gif",
    "explanation": "Converting video to GIF with ffmpeg",
    "needs_auth": false,
    "install_via_brew": "ffmpeg"
}}

For built-in tools, use the tool name from the list above.
For privileged operations, set "needs_auth": true

EXAMPLES:
User: "where are we?"
{{
    "tool": "files",
    "action": "pwd",
    "explanation": "Getting current working directory"
}}

User: "list files here"
{{
    "tool": "files",
    "action": "list:.",
    "explanation": "Listing files in current directory"
}}

User: "copy report.pdf to my home directory"
{{
    "tool": "files",
    "action": "copy:report.pdf:~/report.pdf",
    "explanation": "Copying report.pdf to home directory"
}}

User: "quit firefox"
{{
    "tool": "apps",
    "action": "quit:firefox",
    "explanation": "Quitting Firefox"
}}

User: "turn volume down"
{{
    "tool": "system",
    "action": "set_volume:0.3",
    "explanation": "Setting volume to 30%"
}}

User: "what's my battery status?"
{{
    "tool": "system",
    "action": "battery",
    "explanation": "Getting battery status"
}}

User: "find files named report"
{{
    "tool": "search",
    "action": "find-file:report",
    "explanation": "Searching for files named 'report'"
}}

User: "what's using port 8080"
{{
    "tool": "lsof",
    "action": "lsof -i :8080",
    "explanation": "Finding processes using port 8080",
    "install_via_brew": "lsof"
}}

Be concise, practical, and prefer simple solutions. If multiple approaches exist, choose the most straightforward one."#,
            learned = learned
        )
    }
}
