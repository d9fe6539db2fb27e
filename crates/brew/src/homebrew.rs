use chrono::{DateTime, Duration, Utc};
use nlsh_store::{PackageCacheEntry, Store};
use std::sync::Arc;
use tokio::process::Command;

/// Maximum age of a cached installation check before it is re-verified.
pub const CACHE_TTL_SECS: i64 = 3600;

/// Homebrew shell-out wrapper with a time-boxed installation-state cache.
///
/// Installation checks spawn a process and are requested far more often than
/// their answer changes, so results are memoized in the store. Installs can
/// also happen out-of-band (the user runs `brew install` in another shell),
/// which is why stale entries are re-verified instead of trusted forever.
pub struct Homebrew {
    store: Arc<Store>,
}

/// Returns the cached answer if `entry` is still within the freshness
/// window, `None` if it must be re-verified.
fn cached_decision(entry: &PackageCacheEntry, now: DateTime<Utc>) -> Option<bool> {
    if now.signed_duration_since(entry.updated_at) < Duration::seconds(CACHE_TTL_SECS) {
        Some(entry.installed)
    } else {
        None
    }
}

async fn check_actual_installation(package: &str) -> bool {
    Command::new("sh")
        .args(["-c", &format!("command -v {} > /dev/null 2>&1", package)])
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

impl Homebrew {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Whether `package` is installed, consulting the cache first.
    ///
    /// The fresh result of a real check is written back regardless of
    /// outcome, so a failed lookup is not retried until the TTL expires.
    pub async fn is_installed(&self, package: &str) -> bool {
        if let Ok(Some(entry)) = self.store.get_package_cache(package) {
            if let Some(installed) = cached_decision(&entry, Utc::now()) {
                return installed;
            }
        }

        let installed = check_actual_installation(package).await;
        if let Err(e) = self.store.upsert_package_cache(package, installed, "") {
            tracing::warn!("Could not update package cache for {}: {}", package, e);
        }
        installed
    }

    /// Install `package` via `brew install`, returning success plus the
    /// command output for display.
    pub async fn install(&self, package: &str) -> (bool, String) {
        tracing::info!("Installing {} via Homebrew", package);

        let output = match Command::new("brew").args(["install", package]).output().await {
            Ok(output) => output,
            Err(e) => return (false, format!("Failed to run brew: {}", e)),
        };

        let success = output.status.success();
        let text = if success {
            String::from_utf8_lossy(&output.stdout).to_string()
        } else {
            String::from_utf8_lossy(&output.stderr).to_string()
        };

        if let Err(e) = self.store.upsert_package_cache(package, success, "") {
            tracing::warn!("Could not update package cache for {}: {}", package, e);
        }

        (success, text)
    }

    pub async fn search(&self, package: &str) -> Option<String> {
        let output = Command::new("brew")
            .args(["search", package])
            .output()
            .await
            .ok()?;
        Some(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub async fn info(&self, package: &str) -> Option<String> {
        let output = Command::new("brew")
            .args(["info", package])
            .output()
            .await
            .ok()?;
        Some(String::from_utf8_lossy(&output.stdout).to_string())
    }

    pub async fn installed_packages(&self) -> Vec<String> {
        let Ok(output) = Command::new("brew").arg("list").output().await else {
            return Vec::new();
        };
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Whether the `brew` binary itself is on the path.
    pub async fn available() -> bool {
        check_actual_installation("brew").await
    }
}
