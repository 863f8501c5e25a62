pub mod activity;
pub mod annotation;
pub mod quiz;

pub use activity::{ActivityProfile, ActivityType};
pub use annotation::{Annotation, AnnotationSet, SourceText};
pub use quiz::{
    Correctness, ErrorKind, FeedbackResult, Question, QuestionKind, QuestionOrigin, Quiz,
    QuizOption, QuizStatus, ValidationResult, Verdict,
};
