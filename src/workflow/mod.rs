//! Workflow layer: stateful orchestration of the quiz lifecycle on top of
//! the stateless services.

pub mod lifecycle;
pub mod session;

pub use lifecycle::{QuestionPatch, QuizSession};
pub use session::SessionCtx;
