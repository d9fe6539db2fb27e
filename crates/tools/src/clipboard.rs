use crate::action::split_action;
use crate::traits::ToolResult;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct ClipboardTool;

impl ClipboardTool {
    pub fn description(&self) -> &'static str {
        "Clipboard operations: get, set, clear"
    }

    pub async fn execute(&self, action: &str) -> ToolResult {
        let (command, rest) = split_action(action);
        match command {
            "get" => self.get().await,
            // The content is the whole tail, colons included.
            "set" => match rest {
                Some(content) => self.set(content).await,
                None => ToolResult::fail("Missing content"),
            },
            "clear" => self.clear().await,
            other => ToolResult::fail(format!("Unknown command: {}", other)),
        }
    }

    async fn get(&self) -> ToolResult {
        let output = match Command::new("wl-paste").arg("--no-newline").output().await {
            Ok(output) => output,
            Err(e) => return ToolResult::fail(format!("Could not read clipboard: {}", e)),
        };
        if !output.status.success() {
            return ToolResult::ok("(clipboard empty or contains non-text data)");
        }
        let content = String::from_utf8_lossy(&output.stdout).to_string();
        if content.is_empty() {
            ToolResult::ok("(clipboard empty or contains non-text data)")
        } else {
            ToolResult::ok(content)
        }
    }

    async fn set(&self, content: &str) -> ToolResult {
        let mut child = match Command::new("wl-copy").stdin(Stdio::piped()).spawn() {
            Ok(child) => child,
            Err(e) => return ToolResult::fail(format!("Could not set clipboard: {}", e)),
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(content.as_bytes()).await {
                return ToolResult::fail(format!("Could not set clipboard: {}", e));
            }
        }

        match child.wait().await {
            Ok(status) if status.success() => ToolResult::ok("Clipboard set"),
            Ok(_) => ToolResult::fail("Could not set clipboard"),
            Err(e) => ToolResult::fail(format!("Could not set clipboard: {}", e)),
        }
    }

    async fn clear(&self) -> ToolResult {
        match Command::new("wl-copy").arg("--clear").status().await {
            Ok(status) if status.success() => ToolResult::ok("Clipboard cleared"),
            Ok(_) => ToolResult::fail("Could not clear clipboard"),
            Err(e) => ToolResult::fail(format!("Could not clear clipboard: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_requires_content() {
        let result = ClipboardTool.execute("set").await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        assert!(!ClipboardTool.execute("paste").await.success);
    }
}
