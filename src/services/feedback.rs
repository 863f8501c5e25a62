//! Feedback engine - scores a student answer against the annotated ground truth.
//!
//! Multiple choice is scored locally (exact letter match, binary). Open
//! answers go to the AI backend for three-way classification against the
//! error taxonomy; when the backend is unreachable or its response does not
//! follow the classification format, the engine degrades to a lexical
//! overlap heuristic and says so in the result.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::clients::AiBackend;
use crate::config::Config;
use crate::models::activity::ActivityType;
use crate::models::annotation::{AnnotationSet, SourceText};
use crate::models::quiz::{Correctness, ErrorKind, FeedbackResult, Question, QuestionKind};
use crate::services::language::Language;
use crate::services::prompt_builder::PromptBuilder;

/// Minimum share of ground-truth content words a student answer must cover
/// for the lexical heuristic to call it correct.
const LEXICAL_COVERAGE_THRESHOLD: f64 = 0.6;

/// Open answers shorter than this many words are rejected without a backend
/// call.
const MIN_ANSWER_WORDS: usize = 5;

pub struct FeedbackEngine {
    backend: Arc<dyn AiBackend>,
    builder: PromptBuilder,
    timeout: Duration,
}

impl FeedbackEngine {
    pub fn new(backend: Arc<dyn AiBackend>, config: &Config) -> Self {
        Self {
            backend,
            builder: PromptBuilder::new(config),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Score one student answer. Never fails: backend trouble degrades to
    /// the lexical heuristic instead of surfacing an error.
    pub async fn score(
        &self,
        question: &Question,
        student_answer: &str,
        activity: ActivityType,
        annotations: &AnnotationSet,
        source: &SourceText,
        language: Language,
    ) -> FeedbackResult {
        match question.kind {
            QuestionKind::MultipleChoice => {
                self.score_mcq(question, student_answer, annotations, source, language)
            }
            QuestionKind::OpenEnded => {
                self.score_open(question, student_answer, activity, annotations, source, language)
                    .await
            }
        }
    }

    /// Exact-match scoring for multiple choice. Binary, no error taxonomy,
    /// explanation grounded in the annotation excerpt.
    fn score_mcq(
        &self,
        question: &Question,
        student_answer: &str,
        annotations: &AnnotationSet,
        source: &SourceText,
        language: Language,
    ) -> FeedbackResult {
        let excerpt = ground_excerpt(question, annotations, source);
        let chosen = student_answer.trim().chars().next().map(|c| c.to_ascii_uppercase());

        let Some(chosen) = chosen.filter(|c| ('A'..='D').contains(c)) else {
            return FeedbackResult {
                question_index: question.index,
                student_answer: student_answer.to_string(),
                correctness: Correctness::Incorrect,
                error_kind: None,
                explanation: match language {
                    Language::It => "Risposta non valida: seleziona A, B, C oppure D.".to_string(),
                    _ => "Invalid answer: choose A, B, C or D.".to_string(),
                },
                metacognitive_prompt: None,
                degraded: false,
            };
        };

        let correct = question.correct_answer.trim().chars().next();
        let is_correct = correct == Some(chosen);

        let explanation = if is_correct {
            match language {
                Language::It => format!(
                    "Corretto: la risposta è confermata dal passaggio annotato «{excerpt}»."
                ),
                _ => format!(
                    "Correct: the answer is confirmed by the annotated passage \"{excerpt}\"."
                ),
            }
        } else {
            match language {
                Language::It => format!(
                    "La risposta corretta è {}) {}. Vedi il passaggio annotato «{excerpt}».",
                    question.correct_answer,
                    question.correct_option_text().unwrap_or("?")
                ),
                _ => format!(
                    "The correct answer is {}) {}. See the annotated passage \"{excerpt}\".",
                    question.correct_answer,
                    question.correct_option_text().unwrap_or("?")
                ),
            }
        };

        FeedbackResult {
            question_index: question.index,
            student_answer: student_answer.to_string(),
            correctness: if is_correct {
                Correctness::Correct
            } else {
                Correctness::Incorrect
            },
            error_kind: None,
            explanation,
            metacognitive_prompt: (!is_correct).then(|| metacognitive_prompt(&excerpt, language)),
            degraded: false,
        }
    }

    async fn score_open(
        &self,
        question: &Question,
        student_answer: &str,
        activity: ActivityType,
        annotations: &AnnotationSet,
        source: &SourceText,
        language: Language,
    ) -> FeedbackResult {
        let excerpt = ground_excerpt(question, annotations, source);

        // Empty or very short answers are off-topic by definition; no point
        // spending a backend call on them.
        if student_answer.split_whitespace().count() < MIN_ANSWER_WORDS {
            return FeedbackResult {
                question_index: question.index,
                student_answer: student_answer.to_string(),
                correctness: Correctness::Incorrect,
                error_kind: Some(ErrorKind::Relevance),
                explanation: match language {
                    Language::It => format!(
                        "La risposta è vuota o troppo breve per essere valutata. Rileggi il passaggio annotato «{excerpt}» e riprova con una risposta completa."
                    ),
                    _ => format!(
                        "The answer is empty or too short to assess. Re-read the annotated passage \"{excerpt}\" and try again with a full answer."
                    ),
                },
                metacognitive_prompt: Some(metacognitive_prompt(&excerpt, language)),
                degraded: false,
            };
        }

        let request = self.builder.build_feedback_request(
            activity.profile(),
            question,
            student_answer,
            annotations,
            source,
            language,
        );

        match self.backend.complete(&request, self.timeout).await {
            Ok(response) => match parse_feedback_response(&response) {
                Some(classified) => FeedbackResult {
                    question_index: question.index,
                    student_answer: student_answer.to_string(),
                    correctness: classified.correctness,
                    error_kind: classified.error_kind,
                    explanation: classified.explanation,
                    metacognitive_prompt: classified.metacognitive_prompt,
                    degraded: false,
                },
                None => {
                    warn!("feedback response did not follow the classification format, degrading to lexical scoring");
                    self.lexical_result(question, student_answer, &excerpt, annotations, source, language)
                }
            },
            Err(err) => {
                warn!("feedback backend call failed ({err}), degrading to lexical scoring");
                self.lexical_result(question, student_answer, &excerpt, annotations, source, language)
            }
        }
    }

    /// Coarse lexical-overlap scoring: what share of the ground truth's
    /// content words does the student answer cover? Binary verdict only,
    /// flagged as degraded.
    fn lexical_result(
        &self,
        question: &Question,
        student_answer: &str,
        excerpt: &str,
        annotations: &AnnotationSet,
        source: &SourceText,
        language: Language,
    ) -> FeedbackResult {
        // The annotated evidence is the ground truth: its content words are
        // all required, the rest of the reference answer is scored by
        // coverage.
        let mut excerpt_keys = BTreeSet::new();
        for code in &question.source_codes {
            for annotation in annotations.by_code(code) {
                let text = source.excerpt_for(annotation);
                excerpt_keys.extend(content_words(if text.is_empty() {
                    &annotation.text
                } else {
                    &text
                }));
            }
        }
        let mut keys = content_words(&question.correct_answer);
        keys.extend(excerpt_keys.iter().cloned());
        let student_words = content_words(student_answer);

        let correct = if keys.is_empty() {
            student_answer.trim().to_lowercase() == question.correct_answer.trim().to_lowercase()
        } else {
            let covered = keys.iter().filter(|k| student_words.contains(*k)).count();
            let coverage = covered as f64 / keys.len() as f64;
            debug!(covered, total = keys.len(), "lexical coverage");
            coverage >= LEXICAL_COVERAGE_THRESHOLD
                && excerpt_keys.iter().all(|k| student_words.contains(k))
        };

        FeedbackResult {
            question_index: question.index,
            student_answer: student_answer.to_string(),
            correctness: if correct {
                Correctness::Correct
            } else {
                Correctness::Incorrect
            },
            error_kind: None,
            explanation: match language {
                Language::It => format!(
                    "Valutazione automatica senza AI: confronta la tua risposta con la risposta attesa e con il passaggio annotato «{excerpt}»."
                ),
                _ => format!(
                    "Automatic assessment without AI: compare your answer with the expected answer and the annotated passage \"{excerpt}\"."
                ),
            },
            metacognitive_prompt: (!correct).then(|| metacognitive_prompt(excerpt, language)),
            degraded: true,
        }
    }
}

struct ClassifiedFeedback {
    correctness: Correctness,
    error_kind: Option<ErrorKind>,
    explanation: String,
    metacognitive_prompt: Option<String>,
}

/// Parse the `ESITO / TIPO ERRORE / SPIEGAZIONE / DOMANDA METACOGNITIVA`
/// response format. Returns `None` when no outcome can be read, which sends
/// the caller down the degraded path. When several error types are named,
/// the first in taxonomy priority order wins.
fn parse_feedback_response(raw: &str) -> Option<ClassifiedFeedback> {
    let outcome_re =
        Regex::new(r"(?i)(?:ESITO|OUTCOME)\s*:\s*([^\n]+)").expect("hard-coded pattern");
    let error_re = Regex::new(r"(?i)(?:TIPO\s+ERRORE|ERROR\s+TYPE)\s*:\s*([^\n]+)")
        .expect("hard-coded pattern");
    let explanation_re =
        Regex::new(r"(?i)(?:SPIEGAZIONE|EXPLANATION)\s*:\s*([^\n]+)").expect("hard-coded pattern");
    let meta_re = Regex::new(r"(?i)DOMANDA\s+METACOGNITIVA\s*:\s*([^\n]+)")
        .expect("hard-coded pattern");

    let outcome = outcome_re.captures(raw)?;
    let outcome = outcome[1].trim().to_uppercase();
    let correctness = if outcome.starts_with("CORRETT") || outcome.starts_with("CORRECT") {
        Correctness::Correct
    } else if outcome.starts_with("PARZIAL") || outcome.starts_with("PARTIAL") {
        Correctness::Partial
    } else if outcome.starts_with("ERRATA")
        || outcome.starts_with("INCORRECT")
        || outcome.starts_with("WRONG")
    {
        Correctness::Incorrect
    } else {
        return None;
    };

    let error_kind = if correctness == Correctness::Correct {
        None
    } else {
        error_re
            .captures(raw)
            .and_then(|caps| classify_error(&caps[1]))
    };

    let explanation = explanation_re
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string());
    let metacognitive_prompt = meta_re
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty());

    Some(ClassifiedFeedback {
        correctness,
        error_kind,
        explanation,
        metacognitive_prompt,
    })
}

/// Map the error-type line onto the taxonomy, honoring priority order when
/// the model names more than one type.
fn classify_error(line: &str) -> Option<ErrorKind> {
    let line = line.to_uppercase();
    const KEYWORDS: [(&[&str], ErrorKind); 5] = [
        (&["LOGICO", "LOGICAL"], ErrorKind::Logical),
        (&["CONTENUTO", "CONTENT"], ErrorKind::Content),
        (&["INTERPRETAZIONE", "INTERPRETATION"], ErrorKind::Interpretation),
        (&["PERTINENZA", "RILEVANZA", "RELEVANCE"], ErrorKind::Relevance),
        (&["ESPRESSIONE", "EXPRESSION"], ErrorKind::Expression),
    ];
    for (keywords, kind) in KEYWORDS {
        if keywords.iter().any(|k| line.contains(k)) {
            return Some(kind);
        }
    }
    None
}

/// The annotation excerpt used as ground truth in explanations: the first
/// annotation of the first code the question traces to.
fn ground_excerpt(
    question: &Question,
    annotations: &AnnotationSet,
    source: &SourceText,
) -> String {
    question
        .source_codes
        .iter()
        .filter_map(|code| annotations.by_code(code).first().copied().cloned())
        .map(|annotation| {
            let excerpt = source.excerpt_for(&annotation);
            if excerpt.is_empty() {
                annotation.text
            } else {
                excerpt
            }
        })
        .next()
        .unwrap_or_default()
}

fn metacognitive_prompt(excerpt: &str, language: Language) -> String {
    match language {
        Language::It => format!(
            "Rileggi il passaggio «{excerpt}»: in che modo sostiene o contraddice la tua risposta?"
        ),
        _ => format!(
            "Re-read the passage \"{excerpt}\": how does it support or contradict your answer?"
        ),
    }
}

/// Lowercased content words (4+ characters) of a text.
fn content_words(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 4)
        .map(str::to_string)
        .collect()
}
