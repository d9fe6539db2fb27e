use tokio::process::Command;

/// Run `command` through the platform authorization prompt (`pkexec`),
/// bypassing normal tool dispatch. Returns success plus combined output.
pub async fn run_with_auth(command: &str) -> (bool, String) {
    let output = match Command::new("pkexec")
        .args(["sh", "-c", command])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => return (false, format!("Error: {}", e)),
    };

    if output.status.success() {
        return (true, String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    // pkexec: 126 = prompt dismissed, 127 = not authorized
    match output.status.code() {
        Some(126) | Some(127) => (false, "Authorization denied".to_string()),
        _ => {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.is_empty() {
                (false, String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                (false, stderr)
            }
        }
    }
}
