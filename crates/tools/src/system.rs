use crate::action::split_action;
use crate::traits::{run_shell, ToolResult};
use std::path::Path;
use tokio::fs;

pub struct SystemTool;

impl SystemTool {
    pub fn description(&self) -> &'static str {
        "System controls: volume, brightness, battery, wifi, disk space, sleep"
    }

    pub async fn execute(&self, action: &str) -> ToolResult {
        let (command, rest) = split_action(action);
        match command {
            "get_volume" => self.get_volume().await,
            "set_volume" => match rest.and_then(|r| r.parse::<f64>().ok()) {
                Some(level) => self.set_volume(level).await,
                None => ToolResult::fail("Missing or invalid volume level (0.0-1.0)"),
            },
            "get_brightness" => self.get_brightness().await,
            "set_brightness" => match rest.and_then(|r| r.parse::<f64>().ok()) {
                Some(level) => self.set_brightness(level).await,
                None => ToolResult::fail("Missing or invalid brightness level (0.0-1.0)"),
            },
            "battery" => self.battery().await,
            "wifi" => self.wifi().await,
            "disk_space" => self.disk_space().await,
            "sleep" => self.sleep().await,
            other => ToolResult::fail(format!("Unknown command: {}", other)),
        }
    }

    async fn get_volume(&self) -> ToolResult {
        let (output, code) = run_shell("pactl get-sink-volume @DEFAULT_SINK@").await;
        if code != 0 {
            return ToolResult::fail(format!("Could not get volume: {}", output));
        }
        // "Volume: front-left: 65536 / 100% / 0.00 dB, ..." -> first percent token
        match output
            .split_whitespace()
            .find(|token| token.ends_with('%'))
        {
            Some(percent) => ToolResult::ok(format!("Volume: {}", percent)),
            None => ToolResult::ok(output),
        }
    }

    async fn set_volume(&self, level: f64) -> ToolResult {
        let percent = (level.clamp(0.0, 1.0) * 100.0).round() as u32;
        let (output, code) = run_shell(&format!(
            "pactl set-sink-volume @DEFAULT_SINK@ {}%",
            percent
        ))
        .await;
        if code == 0 {
            ToolResult::ok(format!("Volume set to {}%", percent))
        } else {
            ToolResult::fail(format!("Could not set volume: {}", output))
        }
    }

    async fn get_brightness(&self) -> ToolResult {
        let (output, code) = run_shell("brightnessctl -m").await;
        if code != 0 {
            return ToolResult::fail("Could not get brightness (requires brightnessctl)");
        }
        // machine-readable: device,class,current,percent,max
        match output.split(',').nth(3) {
            Some(percent) => ToolResult::ok(format!("Brightness: {}", percent)),
            None => ToolResult::ok(output),
        }
    }

    async fn set_brightness(&self, level: f64) -> ToolResult {
        let percent = (level.clamp(0.0, 1.0) * 100.0).round() as u32;
        let (output, code) = run_shell(&format!("brightnessctl set {}%", percent)).await;
        if code == 0 {
            ToolResult::ok(format!("Brightness set to {}%", percent))
        } else {
            ToolResult::fail(format!("Could not set brightness: {}", output))
        }
    }

    async fn battery(&self) -> ToolResult {
        let power_supply = Path::new("/sys/class/power_supply");
        let Ok(mut entries) = fs::read_dir(power_supply).await else {
            return ToolResult::fail("Battery information unavailable");
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("BAT") {
                continue;
            }
            let capacity = fs::read_to_string(entry.path().join("capacity")).await;
            let status = fs::read_to_string(entry.path().join("status")).await;
            if let Ok(capacity) = capacity {
                let status = status
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|_| "Unknown".to_string());
                return ToolResult::ok(format!(
                    "Battery: {}% ({})",
                    capacity.trim(),
                    status
                ));
            }
        }

        ToolResult::fail("No battery found")
    }

    async fn wifi(&self) -> ToolResult {
        let (output, code) = run_shell("nmcli -t -f active,ssid dev wifi").await;
        if code != 0 {
            return ToolResult::fail(format!("Could not get WiFi status: {}", output));
        }
        for line in output.lines() {
            if let Some(ssid) = line.strip_prefix("yes:") {
                return ToolResult::ok(format!("Connected to {}", ssid));
            }
        }
        ToolResult::ok("Not connected to WiFi")
    }

    async fn disk_space(&self) -> ToolResult {
        let (output, code) = run_shell("df -h /").await;
        if code == 0 {
            ToolResult::ok(output)
        } else {
            ToolResult::fail("Could not get disk space")
        }
    }

    async fn sleep(&self) -> ToolResult {
        let (output, code) = run_shell("systemctl suspend").await;
        if code == 0 {
            ToolResult::ok("Suspending system")
        } else {
            ToolResult::fail(format!("Could not suspend: {}", output))
        }
    }
}
