pub mod openrouter;

pub use openrouter::{AiBackend, OpenRouterClient};
