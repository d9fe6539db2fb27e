use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_CONTEXT_LIMIT: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_context_limit() -> usize {
    DEFAULT_CONTEXT_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            context_limit: default_context_limit(),
        }
    }
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".nlshrc"))
    }

    /// Load `~/.nlshrc`, falling back to defaults (with instructions
    /// printed) when the file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };

        if !path.exists() {
            eprintln!("Config file not found at {}", path.display());
            eprintln!("Please create ~/.nlshrc with your Claude API key.");
            eprintln!();
            print_example();
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error parsing config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading config: {}", e);
                Self::default()
            }
        }
    }

}

pub fn print_example() {
    eprintln!("Example:");
    eprintln!("api_key = \"sk-ant-...\"");
    eprintln!("model = \"{}\"", DEFAULT_MODEL);
    eprintln!("context_limit = {}", DEFAULT_CONTEXT_LIMIT);
}
