//! # Linda Quiz
//!
//! Annotation-grounded comprehension quizzes: turn a teacher's annotation
//! table over a text into an AI-generated quiz, keep the quiz inside a
//! strict review lifecycle, and score student answers against the
//! annotations.
//!
//! ## Architecture
//!
//! The crate is layered; each layer only calls downward:
//!
//! ### Models
//! - `models/` - plain data: annotations, source text, activities, quizzes
//!
//! ### Clients
//! - `clients/` - the `AiBackend` trait and its OpenRouter implementation;
//!   the only module that talks to the network
//!
//! ### Services
//! - `services/` - stateless domain logic
//! - `PromptBuilder` - renders generation/validation/feedback requests
//! - `QuizParser` - tolerant response parsing with deterministic fallback
//! - `FeedbackEngine` - answer scoring with degraded lexical mode
//! - `language` - Italian/English detection over the source text
//!
//! ### Workflow
//! - `workflow/` - stateful orchestration
//! - `SessionCtx` - immutable session inputs
//! - `QuizSession` - the DRAFT/VALIDATED/EDITED/SAVED state machine
//!
//! `export` sits beside the workflow and serializes saved quizzes for the
//! grading backend.

pub mod clients;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

pub use clients::{AiBackend, OpenRouterClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::activity::ActivityType;
pub use models::annotation::{Annotation, AnnotationSet, SourceText};
pub use models::quiz::{Quiz, QuizStatus};
pub use services::language::Language;
pub use workflow::{QuestionPatch, QuizSession, SessionCtx};
