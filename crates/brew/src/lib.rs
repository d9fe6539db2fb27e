pub mod homebrew;

pub use homebrew::{Homebrew, CACHE_TTL_SECS};
