use crate::apps::AppsTool;
use crate::clipboard::ClipboardTool;
use crate::files::FilesTool;
use crate::learned::LearnedTool;
use crate::search::SearchTool;
use crate::system::SystemTool;
use crate::traits::ToolResult;
use nlsh_brew::Homebrew;
use nlsh_store::{Store, StoreError};
use std::collections::HashMap;
use std::sync::Arc;

/// Closed set of capability handlers. Built-ins are fixed variants; tools
/// discovered at runtime ride the `Learned` variant.
pub enum Handler {
    Files(FilesTool),
    Apps(AppsTool),
    System(SystemTool),
    Clipboard(ClipboardTool),
    Search(SearchTool),
    Learned(LearnedTool),
}

impl Handler {
    pub fn name(&self) -> &str {
        match self {
            Handler::Files(_) => "files",
            Handler::Apps(_) => "apps",
            Handler::System(_) => "system",
            Handler::Clipboard(_) => "clipboard",
            Handler::Search(_) => "search",
            Handler::Learned(tool) => &tool.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Handler::Files(tool) => tool.description(),
            Handler::Apps(tool) => tool.description(),
            Handler::System(tool) => tool.description(),
            Handler::Clipboard(tool) => tool.description(),
            Handler::Search(tool) => tool.description(),
            Handler::Learned(tool) => &tool.description,
        }
    }

    pub async fn execute(&self, action: &str) -> ToolResult {
        match self {
            Handler::Files(tool) => tool.execute(action).await,
            Handler::Apps(tool) => tool.execute(action).await,
            Handler::System(tool) => tool.execute(action).await,
            Handler::Clipboard(tool) => tool.execute(action).await,
            Handler::Search(tool) => tool.execute(action).await,
            Handler::Learned(tool) => tool.execute(action).await,
        }
    }
}

const BUILTIN_NAMES: [&str; 5] = ["files", "apps", "system", "clipboard", "search"];

/// Map accepted tool names to their canonical registry key.
fn canonical(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.as_str() {
        "filesystem" => "files".to_string(),
        "applications" => "apps".to_string(),
        "spotlight" => "search".to_string(),
        _ => lower,
    }
}

/// Name-keyed handler table: the five built-ins plus learned tools,
/// rebuilt from the store at startup and appended to on new installs.
pub struct Registry {
    handlers: HashMap<String, Handler>,
    brew: Arc<Homebrew>,
}

impl Registry {
    pub fn new(brew: Arc<Homebrew>) -> Self {
        let mut handlers = HashMap::new();
        handlers.insert("files".to_string(), Handler::Files(FilesTool));
        handlers.insert("apps".to_string(), Handler::Apps(AppsTool));
        handlers.insert("system".to_string(), Handler::System(SystemTool));
        handlers.insert("clipboard".to_string(), Handler::Clipboard(ClipboardTool));
        handlers.insert("search".to_string(), Handler::Search(SearchTool));
        Self { handlers, brew }
    }

    /// Repopulate learned handlers from the store's tool table.
    pub fn load_learned(&mut self, store: &Store) -> Result<usize, StoreError> {
        let records = store.all_tools()?;
        let mut count = 0;
        for record in records {
            if self.insert_learned(&record.name, &record.description) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Register a freshly learned tool for the rest of this session.
    pub fn register_learned(&mut self, name: &str, description: &str) {
        self.insert_learned(name, description);
    }

    /// Built-ins take precedence: a learned tool may never occupy one of
    /// their registry keys.
    fn insert_learned(&mut self, name: &str, description: &str) -> bool {
        let key = canonical(name);
        if BUILTIN_NAMES.contains(&key.as_str()) {
            tracing::warn!("Ignoring learned tool '{}': name is reserved", name);
            return false;
        }
        self.handlers.insert(
            key,
            Handler::Learned(LearnedTool::new(
                name.to_string(),
                description.to_string(),
                self.brew.clone(),
            )),
        );
        true
    }

    /// Resolve a tool name, case-insensitively and through aliases.
    /// `None` means the caller should fall back to literal execution.
    pub fn resolve(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(&canonical(name))
    }

    /// Learned tools currently registered, as (name, description) pairs.
    pub fn learned_tools(&self) -> Vec<(&str, &str)> {
        let mut learned: Vec<(&str, &str)> = self
            .handlers
            .values()
            .filter_map(|handler| match handler {
                Handler::Learned(tool) => Some((tool.name.as_str(), tool.description.as_str())),
                _ => None,
            })
            .collect();
        learned.sort();
        learned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> (tempfile::TempDir, Registry, Arc<Store>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_at(dir.path().join("test.db")).unwrap());
        let brew = Arc::new(Homebrew::new(store.clone()));
        (dir, Registry::new(brew), store)
    }

    #[test]
    fn test_aliases_resolve_to_same_handler() {
        let (_dir, registry, _store) = test_registry();

        let a = registry.resolve("filesystem").unwrap();
        let b = registry.resolve("files").unwrap();
        assert_eq!(a.name(), "files");
        assert_eq!(b.name(), "files");

        let a = registry.resolve("search").unwrap();
        let b = registry.resolve("spotlight").unwrap();
        assert_eq!(a.name(), "search");
        assert_eq!(b.name(), "search");
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        let (_dir, registry, _store) = test_registry();
        assert!(registry.resolve("Files").is_some());
        assert!(registry.resolve("CLIPBOARD").is_some());
    }

    #[test]
    fn test_unknown_name_is_none() {
        let (_dir, registry, _store) = test_registry();
        assert!(registry.resolve("ffmpeg").is_none());
    }

    #[test]
    fn test_learned_tools_survive_restart() {
        let (_dir, mut registry, store) = test_registry();
        store
            .upsert_tool("ffmpeg", "media converter", "ffmpeg -i", "")
            .unwrap();

        assert_eq!(registry.load_learned(&store).unwrap(), 1);
        let handler = registry.resolve("ffmpeg").unwrap();
        assert_eq!(handler.name(), "ffmpeg");
        assert!(matches!(handler, Handler::Learned(_)));
    }

    #[test]
    fn test_register_learned_appends() {
        let (_dir, mut registry, _store) = test_registry();
        registry.register_learned("jq", "JSON processor");

        assert!(registry.resolve("jq").is_some());
        assert_eq!(registry.learned_tools(), vec![("jq", "JSON processor")]);
    }

    #[test]
    fn test_learned_cannot_shadow_builtin() {
        let (_dir, mut registry, _store) = test_registry();
        registry.register_learned("files", "impostor");
        registry.register_learned("spotlight", "impostor");

        assert!(matches!(
            registry.resolve("files").unwrap(),
            Handler::Files(_)
        ));
        assert!(matches!(
            registry.resolve("search").unwrap(),
            Handler::Search(_)
        ));
        assert!(registry.learned_tools().is_empty());
    }
}
