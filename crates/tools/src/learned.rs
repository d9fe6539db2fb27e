use crate::traits::{run_shell, ToolResult};
use nlsh_brew::Homebrew;
use std::sync::Arc;

/// A CLI tool registered at runtime after a successful install. Execution
/// verifies the package is still present and re-installs it if not before
/// running the action as a literal command.
#[derive(Clone)]
pub struct LearnedTool {
    pub name: String,
    pub description: String,
    brew: Arc<Homebrew>,
}

impl LearnedTool {
    pub fn new(name: String, description: String, brew: Arc<Homebrew>) -> Self {
        Self {
            name,
            description,
            brew,
        }
    }

    pub async fn execute(&self, action: &str) -> ToolResult {
        let mut install_output = String::new();

        if !self.brew.is_installed(&self.name).await {
            tracing::info!("Tool '{}' is not installed, installing via Homebrew", self.name);
            let (success, output) = self.brew.install(&self.name).await;
            if !success {
                return ToolResult::fail(format!("Could not install {}: {}", self.name, output));
            }
            install_output = output;
        }

        let (output, code) = run_shell(action).await;
        if code != 0 {
            return ToolResult::fail(if output.is_empty() {
                "Command failed".to_string()
            } else {
                output
            });
        }

        if install_output.trim().is_empty() {
            ToolResult::ok(output)
        } else {
            ToolResult::ok(format!("{}\n{}", install_output.trim_end(), output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlsh_store::Store;

    fn brew_with_cache(name: &str, installed: bool) -> (tempfile::TempDir, Arc<Homebrew>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_at(dir.path().join("test.db")).unwrap());
        store.upsert_package_cache(name, installed, "").unwrap();
        (dir, Arc::new(Homebrew::new(store)))
    }

    #[tokio::test]
    async fn test_runs_action_when_installed() {
        let (_dir, brew) = brew_with_cache("echo", true);
        let tool = LearnedTool::new("echo".to_string(), "test".to_string(), brew);
        let result = tool.execute("echo learned").await;
        assert!(result.success);
        assert_eq!(result.output, "learned");
    }

    #[tokio::test]
    async fn test_failing_action_is_failure() {
        let (_dir, brew) = brew_with_cache("sh", true);
        let tool = LearnedTool::new("sh".to_string(), "test".to_string(), brew);
        let result = tool.execute("sh -c 'exit 9'").await;
        assert!(!result.success);
    }
}
