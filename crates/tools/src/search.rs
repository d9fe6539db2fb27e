use crate::action::{shell_quote, split_action};
use crate::traits::{run_shell, ToolResult};

/// Content and filename search, the desktop-index equivalent. Backed by
/// plain `grep`/`find` so it works without an indexer daemon.
pub struct SearchTool;

impl SearchTool {
    pub fn description(&self) -> &'static str {
        "Content and file search: search, find-file"
    }

    pub async fn execute(&self, action: &str) -> ToolResult {
        let (command, rest) = split_action(action);
        match command {
            // The query is the whole tail, colons included.
            "search" => match rest {
                Some(query) => self.search(query).await,
                None => ToolResult::fail("Missing search query"),
            },
            "find-file" => match rest {
                Some(name) => self.find_file(name).await,
                None => ToolResult::fail("Missing filename"),
            },
            other => ToolResult::fail(format!("Unknown command: {}", other)),
        }
    }

    async fn search(&self, query: &str) -> ToolResult {
        let (output, code) = run_shell(&format!(
            "grep -r -i -l {} . 2>/dev/null | head -20",
            shell_quote(query)
        ))
        .await;
        if code > 1 {
            return ToolResult::fail(format!("Search failed: {}", output));
        }
        if output.is_empty() {
            ToolResult::ok("No results found")
        } else {
            ToolResult::ok(output)
        }
    }

    async fn find_file(&self, name: &str) -> ToolResult {
        let pattern = shell_quote(&format!("*{}*", name));
        let (output, code) = run_shell(&format!(
            "find \"$HOME\" -iname {} 2>/dev/null | head -20",
            pattern
        ))
        .await;
        if code != 0 && output.is_empty() {
            return ToolResult::fail("Search failed");
        }
        if output.is_empty() {
            ToolResult::ok("No files found")
        } else {
            ToolResult::ok(output)
        }
    }
}
