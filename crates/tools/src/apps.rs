use crate::action::{shell_quote, split_action};
use crate::traits::{run_shell, ToolResult};
use std::collections::BTreeSet;
use tokio::process::Command;
use tokio::task;

pub struct AppsTool;

impl AppsTool {
    pub fn description(&self) -> &'static str {
        "Application management: list, launch, quit, force-quit, frontmost"
    }

    pub async fn execute(&self, action: &str) -> ToolResult {
        let (command, rest) = split_action(action);
        match command {
            "list" => self.list_running().await,
            "launch" => match rest {
                Some(app) => self.launch(app).await,
                None => ToolResult::fail("Missing app name"),
            },
            "quit" => match rest {
                Some(app) => self.quit(app, false).await,
                None => ToolResult::fail("Missing app name"),
            },
            "force-quit" => match rest {
                Some(app) => self.quit(app, true).await,
                None => ToolResult::fail("Missing app name"),
            },
            "frontmost" => self.frontmost().await,
            other => ToolResult::fail(format!("Unknown command: {}", other)),
        }
    }

    async fn list_running(&self) -> ToolResult {
        let names = task::spawn_blocking(|| {
            let system = sysinfo::System::new_all();
            let mut names: BTreeSet<String> = BTreeSet::new();
            for process in system.processes().values() {
                names.insert(process.name().to_string());
            }
            names
        })
        .await;

        match names {
            Ok(names) if names.is_empty() => ToolResult::ok("No applications running"),
            Ok(names) => ToolResult::ok(names.into_iter().collect::<Vec<_>>().join("\n")),
            Err(e) => ToolResult::fail(format!("Error listing applications: {}", e)),
        }
    }

    async fn launch(&self, app: &str) -> ToolResult {
        // Direct spawn first, desktop-entry launcher as fallback.
        if Command::new(app).spawn().is_ok() {
            return ToolResult::ok(format!("Launched {}", app));
        }

        let (output, code) = run_shell(&format!("gtk-launch {}", shell_quote(app))).await;
        if code == 0 {
            ToolResult::ok(format!("Launched {}", app))
        } else {
            ToolResult::fail(format!("Could not launch {}: {}", app, output))
        }
    }

    async fn quit(&self, app: &str, force: bool) -> ToolResult {
        let signal = if force { "-9" } else { "-15" };
        let (output, code) =
            run_shell(&format!("pkill {} -x {}", signal, shell_quote(app))).await;
        match code {
            0 => ToolResult::ok(format!("Quit {}", app)),
            1 => ToolResult::fail(format!("App not running: {}", app)),
            _ => ToolResult::fail(format!("Could not quit {}: {}", app, output)),
        }
    }

    async fn frontmost(&self) -> ToolResult {
        let (output, code) = run_shell("xdotool getactivewindow getwindowname").await;
        if code == 0 && !output.is_empty() {
            ToolResult::ok(output)
        } else {
            ToolResult::fail("Could not determine frontmost window")
        }
    }
}
