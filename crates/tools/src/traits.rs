use tokio::process::Command;

/// Uniform outcome of a capability handler execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Run `command` through `sh -c`, fully draining stdout and stderr.
///
/// Returns the trimmed combined output and the exit code. Spawn failures
/// report exit code -1 so callers can treat them like any other failure.
pub async fn run_shell(command: &str) -> (String, i32) {
    let output = match Command::new("sh").args(["-c", command]).output().await {
        Ok(output) => output,
        Err(e) => return (format!("Error: {}", e), -1),
    };

    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        text.push('\n');
        text.push_str(&stderr);
    }

    (text.trim().to_string(), output.status.code().unwrap_or(-1))
}
