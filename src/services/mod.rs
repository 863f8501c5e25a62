//! Service layer: stateless domain logic between the models and the
//! AI backend client.

pub mod feedback;
pub mod language;
pub mod parser;
pub mod prompt_builder;

pub use feedback::FeedbackEngine;
pub use language::Language;
pub use parser::QuizParser;
pub use prompt_builder::{PromptBuilder, RequestSpec};
