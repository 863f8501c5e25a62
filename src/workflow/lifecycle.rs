//! Quiz lifecycle: DRAFT -> VALIDATED -> (EDITED -> VALIDATED)* -> SAVED.
//!
//! One `QuizSession` owns at most one quiz at a time and is the only place
//! allowed to mutate it. Transition rules:
//! - generate: any time, replaces the current quiz, new quiz starts in DRAFT
//! - validate: DRAFT, EDITED or VALIDATED; moves to VALIDATED once every
//!   question carries a verdict
//! - edit: DRAFT stays DRAFT, VALIDATED/EDITED become EDITED, SAVED rejects;
//!   the edited question's verdict is discarded
//! - save: VALIDATED or EDITED, never straight from DRAFT
//! - feedback: SAVED only, the quiz is frozen once delivered to students

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::clients::AiBackend;
use crate::config::Config;
use crate::error::{AppResult, LifecycleError};
use crate::models::quiz::{
    FeedbackResult, Question, Quiz, QuizOption, QuizStatus, ValidationResult, Verdict,
};
use crate::services::feedback::FeedbackEngine;
use crate::services::parser::{self, QuizParser};
use crate::services::prompt_builder::PromptBuilder;
use crate::workflow::session::SessionCtx;

/// Partial update of one question. `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct QuestionPatch {
    pub prompt: Option<String>,
    pub options: Option<Vec<QuizOption>>,
    pub correct_answer: Option<String>,
}

pub struct QuizSession {
    ctx: SessionCtx,
    backend: Arc<dyn AiBackend>,
    builder: PromptBuilder,
    parser: QuizParser,
    feedback: FeedbackEngine,
    timeout: Duration,
    quiz: Option<Quiz>,
    /// One slot per question, cleared on edit.
    validations: Vec<Option<ValidationResult>>,
    /// Prompts of previously generated questions, fed back into generation
    /// so regenerated quizzes do not repeat themselves.
    history: Vec<String>,
}

impl QuizSession {
    pub fn new(ctx: SessionCtx, backend: Arc<dyn AiBackend>, config: &Config) -> Self {
        Self {
            feedback: FeedbackEngine::new(backend.clone(), config),
            builder: PromptBuilder::new(config),
            parser: QuizParser::new(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            ctx,
            backend,
            quiz: None,
            validations: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    pub fn validations(&self) -> &[Option<ValidationResult>] {
        &self.validations
    }

    pub fn ctx(&self) -> &SessionCtx {
        &self.ctx
    }

    /// Generate a fresh quiz, replacing any current one. Never fails: when
    /// the backend is unreachable the deterministic fallback quiz is built
    /// from the annotations instead.
    pub async fn generate(&mut self) -> &Quiz {
        if let Some(previous) = &self.quiz {
            self.history
                .extend(previous.questions.iter().map(|q| q.prompt.clone()));
        }

        let request = self.builder.build_generation_request(
            self.ctx.profile(),
            &self.ctx.annotations,
            &self.ctx.source,
            self.ctx.language(),
            &self.history,
        );

        let raw = match self.backend.complete(&request, self.timeout).await {
            Ok(text) => {
                debug!(
                    preview = %crate::utils::logging::truncate_text(&text, 120),
                    "generation response received"
                );
                Some(text)
            }
            Err(err) => {
                warn!("generation call failed ({err}), building fallback quiz");
                None
            }
        };

        let quiz = self.parser.parse(
            raw.as_deref(),
            self.ctx.activity,
            self.ctx.language(),
            &self.ctx.annotations,
            &self.ctx.source,
        );
        info!(
            id = %quiz.id,
            questions = quiz.questions.len(),
            degraded = quiz.degraded,
            "quiz generated"
        );

        self.validations = vec![None; quiz.questions.len()];
        &*self.quiz.insert(quiz)
    }

    /// Ask the backend for a verdict on one question. A failed call is
    /// recorded as an `Invalid` verdict rather than surfaced: an unreviewed
    /// question must never look reviewed.
    pub async fn validate_question(&mut self, index: usize) -> AppResult<ValidationResult> {
        let quiz = require_quiz(&self.quiz)?;
        check_status(quiz.status, "validate", &[QuizStatus::Saved])?;
        let question = question_at(quiz, index)?;

        let request = self.builder.build_validation_request(
            self.ctx.profile(),
            question,
            &self.ctx.annotations,
            &self.ctx.source,
        );
        let result = match self.backend.complete(&request, self.timeout).await {
            Ok(raw) => parser::parse_validation_response(&raw, index),
            Err(err) => failed_validation(index, &err.to_string()),
        };

        self.validations[index] = Some(result.clone());
        self.refresh_status_after_validation();
        Ok(result)
    }

    /// Validate every question concurrently.
    pub async fn validate_all(&mut self) -> AppResult<&[Option<ValidationResult>]> {
        let quiz = require_quiz(&self.quiz)?;
        check_status(quiz.status, "validate", &[QuizStatus::Saved])?;

        let requests: Vec<_> = quiz
            .questions
            .iter()
            .map(|question| {
                self.builder.build_validation_request(
                    self.ctx.profile(),
                    question,
                    &self.ctx.annotations,
                    &self.ctx.source,
                )
            })
            .collect();

        let responses = join_all(
            requests
                .iter()
                .map(|request| self.backend.complete(request, self.timeout)),
        )
        .await;

        for (index, response) in responses.into_iter().enumerate() {
            self.validations[index] = Some(match response {
                Ok(raw) => parser::parse_validation_response(&raw, index),
                Err(err) => {
                    if err.is_timeout() {
                        warn!(question = index, "validation call timed out");
                    }
                    failed_validation(index, &err.to_string())
                }
            });
        }
        self.refresh_status_after_validation();
        Ok(&self.validations)
    }

    /// Apply a partial edit to one question. The patched question must still
    /// satisfy the structural invariants, otherwise nothing changes and the
    /// patch is rejected.
    pub fn edit_question(&mut self, index: usize, patch: QuestionPatch) -> AppResult<()> {
        let quiz = require_quiz_mut(&mut self.quiz)?;
        check_status(quiz.status, "edit", &[QuizStatus::Saved])?;
        let question = question_at_mut(quiz, index)?;

        let mut patched = question.clone();
        if let Some(prompt) = patch.prompt {
            patched.prompt = prompt;
        }
        if let Some(options) = patch.options {
            patched.options = options;
        }
        if let Some(correct_answer) = patch.correct_answer {
            patched.correct_answer = correct_answer;
        }
        patched
            .check_invariants(&self.ctx.annotations.code_set())
            .map_err(LifecycleError::InvalidPatch)?;

        *question = patched;
        self.validations[index] = None;
        if quiz.status != QuizStatus::Draft {
            quiz.status = QuizStatus::Edited;
        }
        info!(index, "question edited, verdict discarded");
        Ok(())
    }

    /// Freeze the quiz. A freshly generated draft must go through at least
    /// one validation round first; an edited quiz may be saved directly,
    /// the teacher's edit standing in for a verdict.
    pub fn save(&mut self) -> AppResult<&Quiz> {
        let quiz = require_quiz_mut(&mut self.quiz)?;
        check_status(quiz.status, "save", &[QuizStatus::Draft, QuizStatus::Saved])?;
        quiz.status = QuizStatus::Saved;
        info!(id = %quiz.id, "quiz saved");
        Ok(quiz)
    }

    /// Score a student answer against a saved quiz.
    pub async fn score_answer(
        &self,
        index: usize,
        student_answer: &str,
    ) -> AppResult<FeedbackResult> {
        let quiz = require_quiz(&self.quiz)?;
        check_status(
            quiz.status,
            "give feedback on",
            &[QuizStatus::Draft, QuizStatus::Edited, QuizStatus::Validated],
        )?;
        let question = question_at(quiz, index)?;

        Ok(self
            .feedback
            .score(
                question,
                student_answer,
                self.ctx.activity,
                &self.ctx.annotations,
                &self.ctx.source,
                self.ctx.language(),
            )
            .await)
    }

    /// Serialize a saved quiz for the grading backend.
    pub fn export_json(&self) -> AppResult<String> {
        let quiz = require_quiz(&self.quiz)?;
        crate::export::to_json(quiz, &self.ctx.annotations, &self.ctx.source)
    }

    fn refresh_status_after_validation(&mut self) {
        if self.validations.iter().all(Option::is_some) {
            if let Some(quiz) = &mut self.quiz {
                quiz.status = QuizStatus::Validated;
            }
        }
    }
}

fn require_quiz(quiz: &Option<Quiz>) -> Result<&Quiz, LifecycleError> {
    quiz.as_ref().ok_or(LifecycleError::NoQuiz)
}

fn require_quiz_mut(quiz: &mut Option<Quiz>) -> Result<&mut Quiz, LifecycleError> {
    quiz.as_mut().ok_or(LifecycleError::NoQuiz)
}

fn question_at(quiz: &Quiz, index: usize) -> Result<&Question, LifecycleError> {
    let len = quiz.questions.len();
    quiz.questions
        .get(index)
        .ok_or(LifecycleError::QuestionOutOfRange { index, len })
}

fn question_at_mut(quiz: &mut Quiz, index: usize) -> Result<&mut Question, LifecycleError> {
    let len = quiz.questions.len();
    quiz.questions
        .get_mut(index)
        .ok_or(LifecycleError::QuestionOutOfRange { index, len })
}

fn check_status(
    current: QuizStatus,
    action: &'static str,
    forbidden: &[QuizStatus],
) -> Result<(), LifecycleError> {
    if forbidden.contains(&current) {
        return Err(LifecycleError::IllegalTransition {
            from: current,
            action,
        });
    }
    Ok(())
}

/// Verdict recorded when the validation call itself failed.
fn failed_validation(index: usize, reason: &str) -> ValidationResult {
    ValidationResult {
        question_index: index,
        verdict: Verdict::Invalid,
        explanation: format!("validation call failed: {reason}"),
        suggested_correction: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, BackendError};
    use crate::models::activity::ActivityType;
    use crate::models::annotation::{AnnotationSet, SourceText};
    use crate::services::prompt_builder::RequestSpec;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Scripted {
        Reply(&'static str),
        Timeout,
    }

    /// Backend replaying a scripted sequence of responses.
    struct MockBackend {
        script: Mutex<VecDeque<Scripted>>,
    }

    impl MockBackend {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl AiBackend for MockBackend {
        async fn complete(
            &self,
            _request: &RequestSpec,
            timeout: Duration,
        ) -> Result<String, BackendError> {
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Reply(text)) => Ok(text.to_string()),
                Some(Scripted::Timeout) | None => Err(BackendError::Timeout(timeout)),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    const GENERATION_REPLY: &str = "\
1. [Scelta Multipla] Chi ha firmato il contratto?
- A) Samardo Samuels
- B) Il procuratore
- C) Un dirigente
- D) Un tifoso
✅ Risposta corretta: A

2. [Scelta Multipla] Dove è stato firmato il contratto?
- A) Roma
- B) Milano
- C) Torino
- D) Napoli
✅ Risposta corretta: B

3. [Risposta Aperta] Quando è avvenuta la firma?
✅ Risposta: La firma è avvenuta lunedì.
";

    const VALID_REPLY: &str = "VALIDA: Sì\nMOTIVAZIONE: Coerente con le annotazioni.";
    const INVALID_REPLY: &str =
        "VALIDA: No\nSUGGERIMENTO: Correggere la risposta.\nMOTIVAZIONE: Non supportata dal testo.";

    fn ctx() -> SessionCtx {
        let source = SourceText::from_extracted(
            "Lunedì Samardo Samuels ha firmato un contratto a Milano perché voleva giocare in Italia.",
        )
        .unwrap();
        let rows = [
            "WHO,Who,7,22,Samardo Samuels",
            "WHEN,When,0,6,Lunedì",
            "WHERE,Where,49,55,Milano",
            "WHY,Why,56,77,perché voleva giocare",
        ];
        let annotations = AnnotationSet::load(rows, &source).unwrap();
        SessionCtx::new(annotations, source, ActivityType::FiveW)
    }

    fn session(script: Vec<Scripted>) -> QuizSession {
        QuizSession::new(ctx(), MockBackend::new(script), &Config::default())
    }

    #[tokio::test]
    async fn generated_quiz_starts_in_draft() {
        let mut session = session(vec![Scripted::Reply(GENERATION_REPLY)]);
        let quiz = session.generate().await;
        assert_eq!(quiz.status, QuizStatus::Draft);
        assert_eq!(quiz.questions.len(), 3);
        assert!(!quiz.degraded);
        assert_eq!(session.validations().len(), 3);
    }

    #[tokio::test]
    async fn backend_failure_during_generation_yields_fallback_quiz() {
        let mut session = session(vec![Scripted::Timeout]);
        let quiz = session.generate().await;
        assert!(quiz.degraded);
        assert!(quiz.satisfies_question_mix());
        assert_eq!(quiz.status, QuizStatus::Draft);
    }

    #[tokio::test]
    async fn save_from_draft_is_rejected() {
        let mut session = session(vec![Scripted::Reply(GENERATION_REPLY)]);
        session.generate().await;
        let err = session.save().unwrap_err();
        assert!(matches!(
            err,
            AppError::Lifecycle(LifecycleError::IllegalTransition {
                from: QuizStatus::Draft,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn save_without_a_quiz_is_rejected() {
        let mut session = session(vec![]);
        assert!(matches!(
            session.save().unwrap_err(),
            AppError::Lifecycle(LifecycleError::NoQuiz)
        ));
    }

    #[tokio::test]
    async fn validate_all_records_failures_as_invalid() {
        let mut session = session(vec![
            Scripted::Reply(GENERATION_REPLY),
            Scripted::Reply(VALID_REPLY),
            Scripted::Timeout,
            Scripted::Reply(VALID_REPLY),
        ]);
        session.generate().await;
        session.validate_all().await.unwrap();

        let verdicts: Vec<_> = session
            .validations()
            .iter()
            .map(|v| v.as_ref().unwrap().verdict.clone())
            .collect();
        assert_eq!(verdicts, [Verdict::Valid, Verdict::Invalid, Verdict::Valid]);
        assert_eq!(session.quiz().unwrap().status, QuizStatus::Validated);
    }

    #[tokio::test]
    async fn edit_discards_only_that_verdict_and_forces_revalidation() {
        let mut session = session(vec![
            Scripted::Reply(GENERATION_REPLY),
            Scripted::Reply(VALID_REPLY),
            Scripted::Reply(INVALID_REPLY),
            Scripted::Reply(VALID_REPLY),
            Scripted::Reply(VALID_REPLY),
        ]);
        session.generate().await;
        session.validate_all().await.unwrap();

        session
            .edit_question(
                1,
                QuestionPatch {
                    prompt: Some("In quale città è stato firmato il contratto?".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(session.quiz().unwrap().status, QuizStatus::Edited);
        assert!(session.validations()[0].is_some());
        assert!(session.validations()[1].is_none());

        session.validate_question(1).await.unwrap();
        assert_eq!(session.quiz().unwrap().status, QuizStatus::Validated);
        session.save().unwrap();
        assert_eq!(session.quiz().unwrap().status, QuizStatus::Saved);
    }

    #[tokio::test]
    async fn an_edited_quiz_may_be_saved_without_revalidation() {
        let mut session = session(vec![
            Scripted::Reply(GENERATION_REPLY),
            Scripted::Reply(VALID_REPLY),
            Scripted::Reply(VALID_REPLY),
            Scripted::Reply(VALID_REPLY),
        ]);
        session.generate().await;
        session.validate_all().await.unwrap();
        session
            .edit_question(
                2,
                QuestionPatch {
                    correct_answer: Some("La firma è avvenuta lunedì a Milano.".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        session.save().unwrap();
        assert_eq!(session.quiz().unwrap().status, QuizStatus::Saved);
    }

    #[tokio::test]
    async fn invariant_breaking_patch_is_rejected_without_changes() {
        let mut session = session(vec![Scripted::Reply(GENERATION_REPLY)]);
        session.generate().await;
        let before = session.quiz().unwrap().questions[0].clone();

        let err = session
            .edit_question(
                0,
                QuestionPatch {
                    correct_answer: Some("E".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Lifecycle(LifecycleError::InvalidPatch(_))
        ));
        assert_eq!(
            session.quiz().unwrap().questions[0].correct_answer,
            before.correct_answer
        );
    }

    #[tokio::test]
    async fn editing_a_saved_quiz_is_rejected() {
        let mut session = session(vec![
            Scripted::Reply(GENERATION_REPLY),
            Scripted::Reply(VALID_REPLY),
            Scripted::Reply(VALID_REPLY),
            Scripted::Reply(VALID_REPLY),
        ]);
        session.generate().await;
        session.validate_all().await.unwrap();
        session.save().unwrap();

        let err = session
            .edit_question(0, QuestionPatch::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Lifecycle(LifecycleError::IllegalTransition {
                from: QuizStatus::Saved,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn out_of_range_index_is_reported_with_the_quiz_length() {
        let mut session = session(vec![Scripted::Reply(GENERATION_REPLY)]);
        session.generate().await;
        let err = session.validate_question(7).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Lifecycle(LifecycleError::QuestionOutOfRange { index: 7, len: 3 })
        ));
    }

    #[tokio::test]
    async fn feedback_requires_a_saved_quiz() {
        let mut session = session(vec![Scripted::Reply(GENERATION_REPLY)]);
        session.generate().await;
        assert!(matches!(
            session.score_answer(0, "A").await.unwrap_err(),
            AppError::Lifecycle(LifecycleError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn regeneration_feeds_previous_prompts_into_history() {
        let mut session = session(vec![
            Scripted::Reply(GENERATION_REPLY),
            Scripted::Reply(GENERATION_REPLY),
        ]);
        session.generate().await;
        session.generate().await;
        assert_eq!(session.history.len(), 3);
        assert!(session
            .history
            .iter()
            .any(|p| p.contains("Chi ha firmato")));
    }
}
