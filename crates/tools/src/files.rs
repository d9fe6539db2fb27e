use crate::action::{expand_path, split_action};
use crate::traits::ToolResult;
use chrono::{DateTime, Local};
use std::path::Path;
use tokio::fs;
use tokio::process::Command;
use tokio::task;

pub struct FilesTool;

impl FilesTool {
    pub fn description(&self) -> &'static str {
        "File operations: list, read, write, copy, move, delete, trash, mkdir, info, search"
    }

    pub async fn execute(&self, action: &str) -> ToolResult {
        let (command, rest) = split_action(action);
        match command {
            "pwd" => self.pwd(),
            "list" => self.list(rest.unwrap_or(".")).await,
            "read" => match rest {
                Some(path) => self.read(path).await,
                None => ToolResult::fail("Missing file path"),
            },
            "write" => match rest.and_then(|r| r.split_once(':')) {
                Some((path, content)) => self.write(path, content).await,
                None => ToolResult::fail("Missing file path or content"),
            },
            "copy" => match rest.and_then(|r| r.split_once(':')) {
                Some((src, dst)) => self.copy(src, dst).await,
                None => ToolResult::fail("Missing source or destination"),
            },
            "move" => match rest.and_then(|r| r.split_once(':')) {
                Some((src, dst)) => self.rename(src, dst).await,
                None => ToolResult::fail("Missing source or destination"),
            },
            "delete" => match rest {
                Some(path) => self.delete(path).await,
                None => ToolResult::fail("Missing file path"),
            },
            "trash" => match rest {
                Some(path) => self.trash(path).await,
                None => ToolResult::fail("Missing file path"),
            },
            "mkdir" => match rest {
                Some(path) => self.mkdir(path).await,
                None => ToolResult::fail("Missing directory path"),
            },
            "info" => match rest {
                Some(path) => self.info(path).await,
                None => ToolResult::fail("Missing file path"),
            },
            "search" => match rest.and_then(|r| r.split_once(':')) {
                Some((dir, pattern)) => self.search(dir, pattern).await,
                None => ToolResult::fail("Missing directory or pattern"),
            },
            other => ToolResult::fail(format!("Unknown command: {}", other)),
        }
    }

    fn pwd(&self) -> ToolResult {
        match std::env::current_dir() {
            Ok(dir) => ToolResult::ok(dir.display().to_string()),
            Err(e) => ToolResult::fail(format!("Error getting working directory: {}", e)),
        }
    }

    /// One entry per line, directories suffixed `/`, alphabetically sorted.
    async fn list(&self, path: &str) -> ToolResult {
        let path = expand_path(path);
        let mut dir = match fs::read_dir(&path).await {
            Ok(dir) => dir,
            Err(e) => return ToolResult::fail(format!("Error listing directory: {}", e)),
        };

        let mut entries: Vec<(String, bool)> = Vec::new();
        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().to_string();
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    entries.push((name, is_dir));
                }
                Ok(None) => break,
                Err(e) => return ToolResult::fail(format!("Error listing directory: {}", e)),
            }
        }

        if entries.is_empty() {
            return ToolResult::ok("(empty)");
        }

        entries.sort();
        let lines: Vec<String> = entries
            .into_iter()
            .map(|(name, is_dir)| if is_dir { format!("{}/", name) } else { name })
            .collect();
        ToolResult::ok(lines.join("\n"))
    }

    async fn read(&self, path: &str) -> ToolResult {
        match fs::read_to_string(expand_path(path)).await {
            Ok(contents) => ToolResult::ok(contents),
            Err(e) => ToolResult::fail(format!("Error reading file: {}", e)),
        }
    }

    async fn write(&self, path: &str, content: &str) -> ToolResult {
        match fs::write(expand_path(path), content).await {
            Ok(()) => ToolResult::ok("File written successfully"),
            Err(e) => ToolResult::fail(format!("Error writing file: {}", e)),
        }
    }

    async fn copy(&self, src: &str, dst: &str) -> ToolResult {
        match fs::copy(expand_path(src), expand_path(dst)).await {
            Ok(_) => ToolResult::ok(format!("Copied {} to {}", src, dst)),
            Err(e) => ToolResult::fail(format!("Error copying file: {}", e)),
        }
    }

    async fn rename(&self, src: &str, dst: &str) -> ToolResult {
        match fs::rename(expand_path(src), expand_path(dst)).await {
            Ok(()) => ToolResult::ok(format!("Moved {} to {}", src, dst)),
            Err(e) => ToolResult::fail(format!("Error moving file: {}", e)),
        }
    }

    async fn delete(&self, path: &str) -> ToolResult {
        let expanded = expand_path(path);
        let result = match fs::metadata(&expanded).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&expanded).await,
            Ok(_) => fs::remove_file(&expanded).await,
            Err(e) => return ToolResult::fail(format!("Error deleting file: {}", e)),
        };
        match result {
            Ok(()) => ToolResult::ok(format!("Deleted {}", path)),
            Err(e) => ToolResult::fail(format!("Error deleting file: {}", e)),
        }
    }

    async fn trash(&self, path: &str) -> ToolResult {
        let expanded = expand_path(path);
        let output = match Command::new("gio")
            .arg("trash")
            .arg(&expanded)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return ToolResult::fail(format!("Error moving to trash: {}", e)),
        };
        if output.status.success() {
            ToolResult::ok(format!("Moved {} to trash", path))
        } else {
            ToolResult::fail(format!(
                "Error moving to trash: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    async fn mkdir(&self, path: &str) -> ToolResult {
        match fs::create_dir_all(expand_path(path)).await {
            Ok(()) => ToolResult::ok(format!("Created directory {}", path)),
            Err(e) => ToolResult::fail(format!("Error creating directory: {}", e)),
        }
    }

    async fn info(&self, path: &str) -> ToolResult {
        let meta = match fs::metadata(expand_path(path)).await {
            Ok(meta) => meta,
            Err(e) => return ToolResult::fail(format!("Error getting file info: {}", e)),
        };

        let mut info = format!("File: {}\n", path);
        info.push_str(&format!("Size: {} bytes\n", meta.len()));
        if let Ok(modified) = meta.modified() {
            let local: DateTime<Local> = modified.into();
            info.push_str(&format!("Modified: {}\n", local.format("%Y-%m-%d %H:%M:%S")));
        }
        let kind = if meta.is_dir() {
            "directory"
        } else if meta.is_symlink() {
            "symlink"
        } else {
            "file"
        };
        info.push_str(&format!("Type: {}\n", kind));
        ToolResult::ok(info)
    }

    /// Recursive case-insensitive name match under `dir`.
    async fn search(&self, dir: &str, pattern: &str) -> ToolResult {
        let root = expand_path(dir);
        let needle = pattern.to_lowercase();

        let matches = task::spawn_blocking(move || {
            let mut matches = Vec::new();
            walk(&root, &root, &needle, &mut matches);
            matches.sort();
            matches
        })
        .await;

        match matches {
            Ok(matches) if matches.is_empty() => ToolResult::ok("No matches found"),
            Ok(matches) => ToolResult::ok(matches.join("\n")),
            Err(e) => ToolResult::fail(format!("Error searching: {}", e)),
        }
    }
}

fn walk(root: &Path, dir: &Path, needle: &str, matches: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.contains(needle) {
            let shown = path.strip_prefix(root).unwrap_or(&path);
            matches.push(shown.display().to_string());
        }
        if path.is_dir() {
            walk(root, &path, needle, matches);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_sorted_with_dir_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let result = FilesTool
            .execute(&format!("list:{}", dir.path().display()))
            .await;
        assert!(result.success);
        assert_eq!(result.output, "a.txt\nb.txt\nsub/");
    }

    #[tokio::test]
    async fn test_list_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = FilesTool
            .execute(&format!("list:{}", dir.path().display()))
            .await;
        assert!(result.success);
        assert_eq!(result.output, "(empty)");
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");

        let result = FilesTool
            .execute(&format!("write:{}:hello: with colons", path.display()))
            .await;
        assert!(result.success);

        let result = FilesTool.execute(&format!("read:{}", path.display())).await;
        assert!(result.success);
        assert_eq!(result.output, "hello: with colons");
    }

    #[tokio::test]
    async fn test_copy_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        std::fs::write(&src, "data").unwrap();

        let result = FilesTool
            .execute(&format!("copy:{}:{}", src.display(), dst.display()))
            .await;
        assert!(result.success);
        assert!(dst.exists());

        let result = FilesTool
            .execute(&format!("delete:{}", dst.display()))
            .await;
        assert!(result.success);
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_read_missing_file_fails() {
        let result = FilesTool.execute("read:/no/such/file").await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Error reading file"));
    }

    #[tokio::test]
    async fn test_missing_args_rejected() {
        assert!(!FilesTool.execute("read").await.success);
        assert!(!FilesTool.execute("copy:only-one").await.success);
        assert!(!FilesTool.execute("frobnicate").await.success);
    }

    #[tokio::test]
    async fn test_search_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/Report-Final.pdf"), "").unwrap();
        std::fs::write(dir.path().join("other.txt"), "").unwrap();

        let result = FilesTool
            .execute(&format!("search:{}:report", dir.path().display()))
            .await;
        assert!(result.success);
        assert!(result.output.contains("Report-Final.pdf"));
        assert!(!result.output.contains("other.txt"));
    }
}
