pub mod claude;
pub mod mock;
pub mod traits;

pub use claude::ClaudeProvider;
pub use mock::{MockProvider, PendingProvider};
pub use traits::{ChatMessage, CompletionProvider, ProviderError};
