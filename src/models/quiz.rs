//! Quiz data model: questions, quiz, validation and feedback results.
//!
//! Structural invariants live here (`Question::check_invariants`) so that the
//! parser and the editor enforce exactly the same rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::activity::ActivityType;
use crate::services::language::Language;

/// Question kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    MultipleChoice,
    OpenEnded,
}

/// Where a question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionOrigin {
    /// Parsed out of an AI-authored response.
    Generated,
    /// Deterministically template-generated, surfaced as "AI unavailable".
    Fallback,
}

/// One option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub letter: char,
    pub text: String,
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Position in the quiz, starting at 1.
    pub index: usize,
    pub kind: QuestionKind,
    pub prompt: String,
    /// Exactly four options for multiple choice, empty for open questions.
    pub options: Vec<QuizOption>,
    /// The correct letter (A-D) for multiple choice, the model answer text
    /// for open questions.
    pub correct_answer: String,
    /// Annotation codes this question is traceable to. Never empty.
    pub source_codes: BTreeSet<String>,
    pub origin: QuestionOrigin,
    /// False when the response carried no usable correct-answer marker and
    /// the answer was defaulted.
    pub verified: bool,
}

pub const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

impl Question {
    /// Check the structural invariants of a question against the codes known
    /// to the annotation set. Returns a description of the first violation.
    pub fn check_invariants(&self, known_codes: &BTreeSet<&str>) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("question text must not be empty".to_string());
        }
        match self.kind {
            QuestionKind::MultipleChoice => {
                if self.options.len() != 4 {
                    return Err(format!(
                        "a multiple-choice question needs exactly 4 options, found {}",
                        self.options.len()
                    ));
                }
                for (option, expected) in self.options.iter().zip(OPTION_LETTERS) {
                    if option.letter != expected {
                        return Err(format!(
                            "options must be lettered A-D in order, found '{}'",
                            option.letter
                        ));
                    }
                    if option.text.trim().is_empty() {
                        return Err(format!("option {} is empty", option.letter));
                    }
                }
                let distinct: BTreeSet<&str> =
                    self.options.iter().map(|o| o.text.trim()).collect();
                if distinct.len() != 4 {
                    return Err("options must be distinct".to_string());
                }
                let mut letters = self.correct_answer.trim().chars();
                match (letters.next(), letters.next()) {
                    (Some(letter), None) if OPTION_LETTERS.contains(&letter) => {}
                    _ => {
                        return Err(format!(
                            "the correct answer must be one of A-D, found '{}'",
                            self.correct_answer
                        ));
                    }
                }
            }
            QuestionKind::OpenEnded => {
                if !self.options.is_empty() {
                    return Err("an open question has no options".to_string());
                }
                if self.correct_answer.trim().is_empty() {
                    return Err("an open question needs a model answer".to_string());
                }
            }
        }
        if self.source_codes.is_empty() {
            return Err("every question must trace back to at least one annotation".to_string());
        }
        if let Some(unknown) = self
            .source_codes
            .iter()
            .find(|c| !known_codes.contains(c.as_str()))
        {
            return Err(format!("unknown annotation code '{unknown}'"));
        }
        Ok(())
    }

    /// The text of the option matching the correct letter, for MCQs.
    pub fn correct_option_text(&self) -> Option<&str> {
        let letter = self.correct_answer.trim().chars().next()?;
        self.options
            .iter()
            .find(|o| o.letter == letter)
            .map(|o| o.text.as_str())
    }
}

/// Editing lifecycle of a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizStatus {
    Draft,
    Validated,
    Edited,
    Saved,
}

/// A structured comprehension quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub activity: ActivityType,
    pub language: Language,
    pub questions: Vec<Question>,
    pub status: QuizStatus,
    /// True when the whole quiz came from the deterministic fallback
    /// template rather than an AI response.
    pub degraded: bool,
}

impl Quiz {
    pub fn new(
        activity: ActivityType,
        language: Language,
        questions: Vec<Question>,
        degraded: bool,
    ) -> Self {
        Self {
            id: format!("quiz-{}", chrono::Utc::now().timestamp_millis()),
            activity,
            language,
            questions,
            status: QuizStatus::Draft,
            degraded,
        }
    }

    pub fn mcq_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.kind == QuestionKind::MultipleChoice)
            .count()
    }

    pub fn open_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.kind == QuestionKind::OpenEnded)
            .count()
    }

    /// The quiz-level invariant: at least 2 multiple-choice and 1 open question.
    pub fn satisfies_question_mix(&self) -> bool {
        self.mcq_count() >= 2 && self.open_count() >= 1
    }
}

/// AI verdict on a single question. Ephemeral, shown in the editor and
/// discarded when the question is edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Valid,
    Questionable,
    Invalid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub question_index: usize,
    pub verdict: Verdict,
    pub explanation: String,
    pub suggested_correction: Option<String>,
}

/// Three-way correctness of a student answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Correctness {
    Correct,
    Partial,
    Incorrect,
}

/// Error taxonomy for open answers, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    /// The reasoning breaks down.
    Logical,
    /// Missing or incorrect facts.
    Content,
    /// Misreads the textual evidence.
    Interpretation,
    /// Off-topic.
    Relevance,
    /// Correct substance, unclear phrasing.
    Expression,
}

/// Classified feedback on one student answer. Created per request, not
/// persisted beyond the interaction it answers.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResult {
    pub question_index: usize,
    pub student_answer: String,
    pub correctness: Correctness,
    pub error_kind: Option<ErrorKind>,
    pub explanation: String,
    pub metacognitive_prompt: Option<String>,
    /// True when the verdict came from the lexical-overlap heuristic instead
    /// of the AI backend.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> BTreeSet<&'static str> {
        ["WHO", "WHEN"].into_iter().collect()
    }

    fn mcq() -> Question {
        Question {
            index: 1,
            kind: QuestionKind::MultipleChoice,
            prompt: "Chi ha firmato il contratto?".to_string(),
            options: OPTION_LETTERS
                .into_iter()
                .zip(["Samardo Samuels", "Il procuratore", "L'allenatore", "Nessuno"])
                .map(|(letter, text)| QuizOption {
                    letter,
                    text: text.to_string(),
                })
                .collect(),
            correct_answer: "A".to_string(),
            source_codes: ["WHO".to_string()].into_iter().collect(),
            origin: QuestionOrigin::Generated,
            verified: true,
        }
    }

    #[test]
    fn well_formed_mcq_passes() {
        assert!(mcq().check_invariants(&codes()).is_ok());
    }

    #[test]
    fn mcq_with_three_options_is_rejected() {
        let mut q = mcq();
        q.options.pop();
        assert!(q.check_invariants(&codes()).is_err());
    }

    #[test]
    fn mcq_with_bad_letter_is_rejected() {
        let mut q = mcq();
        q.correct_answer = "E".to_string();
        assert!(q.check_invariants(&codes()).is_err());
    }

    #[test]
    fn duplicate_options_are_rejected() {
        let mut q = mcq();
        q.options[3].text = q.options[0].text.clone();
        assert!(q.check_invariants(&codes()).is_err());
    }

    #[test]
    fn unknown_source_code_is_rejected() {
        let mut q = mcq();
        q.source_codes = ["THESIS".to_string()].into_iter().collect();
        assert!(q.check_invariants(&codes()).is_err());
    }

    #[test]
    fn open_question_needs_a_model_answer() {
        let q = Question {
            index: 3,
            kind: QuestionKind::OpenEnded,
            prompt: "Perché?".to_string(),
            options: vec![],
            correct_answer: "  ".to_string(),
            source_codes: ["WHEN".to_string()].into_iter().collect(),
            origin: QuestionOrigin::Generated,
            verified: true,
        };
        assert!(q.check_invariants(&codes()).is_err());
    }
}
