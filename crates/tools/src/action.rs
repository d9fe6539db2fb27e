//! Colon-delimited action grammar: `command[:arg1[:arg2...]]`.

use std::path::PathBuf;

/// Split an action into its command and the raw argument tail.
///
/// The tail is left unsplit so handlers whose final argument may itself
/// contain colons (clipboard content, search queries, file contents) can
/// take it verbatim.
pub fn split_action(action: &str) -> (&str, Option<&str>) {
    match action.split_once(':') {
        Some((command, rest)) => (command, Some(rest)),
        None => (action, None),
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

/// Quote a string for safe interpolation into an `sh -c` command line.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
