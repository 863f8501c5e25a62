//! Response parser - turns a semi-structured AI response into a strict quiz.
//!
//! The grammar is the marker format fixed by the prompt builder:
//!
//! ```text
//! 1. [Scelta Multipla] testo della domanda:
//! - A) opzione
//! - B) opzione
//! - C) opzione
//! - D) opzione
//! ✅ Risposta corretta: B
//!
//! 3. [Risposta Aperta] testo della domanda:
//! ✅ Risposta: testo della risposta
//! ```
//!
//! Real responses drift, so this is a tolerant line scanner, not an
//! all-or-nothing parser: every question section is recovered independently,
//! a structurally broken section is replaced by a deterministic fallback
//! question, and only when the whole response is unusable does the entire
//! quiz fall back to the template generator. A fallback quiz or question is
//! always explicitly marked as such.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::{debug, warn};

use crate::models::activity::{ActivityProfile, ActivityType};
use crate::models::annotation::{AnnotationSet, SourceText};
use crate::models::quiz::{
    Question, QuestionKind, QuestionOrigin, Quiz, QuizOption, ValidationResult, Verdict,
    OPTION_LETTERS,
};
use crate::services::language::Language;

/// Tolerant scanner for the quiz response grammar.
pub struct QuizParser {
    re_question: Regex,
    re_option: Regex,
    re_mcq_answer: Regex,
    re_open_answer: Regex,
}

/// One question section as scanned from the raw response, before any
/// structural judgment.
struct RawSection {
    kind: QuestionKind,
    prompt: String,
    options: Vec<QuizOption>,
    answer: Option<String>,
    violation: Option<String>,
}

impl RawSection {
    fn new(kind: QuestionKind, prompt: String) -> Self {
        Self {
            kind,
            prompt,
            options: Vec::new(),
            answer: None,
            violation: None,
        }
    }

    fn violate(&mut self, reason: impl Into<String>) {
        if self.violation.is_none() {
            self.violation = Some(reason.into());
        }
    }
}

impl Default for QuizParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizParser {
    pub fn new() -> Self {
        Self {
            re_question: Regex::new(
                r"(?i)^\s*(\d+)[.)]?\s*\[\s*(scelta multipla|risposta aperta|multiple choice|open answer)\s*\]\s*(.*)$",
            )
            .expect("hard-coded question pattern"),
            re_option: Regex::new(r"^\s*-?\s*([A-Da-d])\)\s*(.*)$")
                .expect("hard-coded option pattern"),
            re_mcq_answer: Regex::new(
                r"(?i)^\s*(?:✅\s*)?(?:risposta corretta|correct answer)\s*:\s*(.*)$",
            )
            .expect("hard-coded answer pattern"),
            re_open_answer: Regex::new(r"(?i)^\s*(?:✅\s*)?(?:risposta|answer)\s*:\s*(.*)$")
                .expect("hard-coded answer pattern"),
        }
    }

    /// Parse a raw response into a quiz. Never fails: a missing, empty or
    /// unusable response produces the deterministic fallback quiz instead.
    pub fn parse(
        &self,
        raw: Option<&str>,
        activity: ActivityType,
        language: Language,
        annotations: &AnnotationSet,
        source: &SourceText,
    ) -> Quiz {
        let raw = match raw {
            Some(r) if !r.trim().is_empty() => r,
            _ => {
                warn!("no AI response available, generating fallback quiz");
                return fallback_quiz(activity, language, annotations, source);
            }
        };

        let profile = activity.profile();
        let sections = self.scan(raw);
        debug!(sections = sections.len(), "scanned response sections");

        let known_codes = annotations.code_set();
        let mut questions = Vec::new();
        for (idx, section) in sections.into_iter().enumerate() {
            let index = idx + 1;
            match self.finalize(section, index, profile, annotations, source, &known_codes) {
                Ok(question) => questions.push(question),
                Err((kind, reason)) => {
                    warn!(question = index, %reason, "structurally invalid section, substituting fallback question");
                    let replacement = match kind {
                        QuestionKind::MultipleChoice => {
                            fallback_mcq(idx, index, language, annotations, source)
                        }
                        QuestionKind::OpenEnded => {
                            fallback_open(index, language, annotations, source)
                        }
                    };
                    questions.push(replacement);
                }
            }
        }

        let quiz = Quiz::new(activity, language, questions, false);
        if quiz.satisfies_question_mix() {
            quiz
        } else {
            warn!(
                mcq = quiz.mcq_count(),
                open = quiz.open_count(),
                "too few valid questions survived parsing, generating fallback quiz"
            );
            fallback_quiz(activity, language, annotations, source)
        }
    }

    /// Split the response into question sections, applying the option-block
    /// and answer-marker placement rules line by line.
    fn scan(&self, raw: &str) -> Vec<RawSection> {
        let mut sections: Vec<RawSection> = Vec::new();

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = self.re_question.captures(line) {
                let kind = match caps[2].to_lowercase().as_str() {
                    "scelta multipla" | "multiple choice" => QuestionKind::MultipleChoice,
                    _ => QuestionKind::OpenEnded,
                };
                let prompt = caps[3].trim().trim_end_matches(':').trim().to_string();
                sections.push(RawSection::new(kind, prompt));
                continue;
            }

            let Some(current) = sections.last_mut() else {
                // Preamble before the first question marker. Common, ignored.
                continue;
            };

            match current.kind {
                QuestionKind::MultipleChoice => {
                    if let Some(caps) = self.re_option.captures(line) {
                        if current.answer.is_some() {
                            // An option after the answer marker means the
                            // marker sat inside the option block.
                            warn!("correct-answer marker interleaved among options, discarding it");
                            current.answer = None;
                            current.violate("correct-answer marker interleaved among options");
                        }
                        current.options.push(QuizOption {
                            letter: caps[1].chars().next().unwrap_or('A').to_ascii_uppercase(),
                            text: caps[2].trim().to_string(),
                        });
                    } else if let Some(caps) = self.re_mcq_answer.captures(line) {
                        if current.options.len() < 4 {
                            warn!(
                                options = current.options.len(),
                                "correct-answer marker before the option block is complete"
                            );
                            current.violate("correct-answer marker before the option block");
                        } else if current.answer.is_none() {
                            current.answer = Some(caps[1].trim().to_string());
                        }
                    }
                }
                QuestionKind::OpenEnded => {
                    if current.answer.is_none() {
                        // The MCQ marker is a prefix-superset of the open one,
                        // so it has to be tried first.
                        if let Some(caps) = self.re_mcq_answer.captures(line) {
                            current.answer = Some(caps[1].trim().to_string());
                        } else if let Some(caps) = self.re_open_answer.captures(line) {
                            current.answer = Some(caps[1].trim().to_string());
                        }
                    }
                }
            }
        }

        sections
    }

    /// Turn a scanned section into a question, or report the structural
    /// violation that disqualifies it.
    fn finalize(
        &self,
        section: RawSection,
        index: usize,
        profile: &ActivityProfile,
        annotations: &AnnotationSet,
        source: &SourceText,
        known_codes: &BTreeSet<&str>,
    ) -> Result<Question, (QuestionKind, String)> {
        let kind = section.kind;
        if let Some(reason) = section.violation {
            return Err((kind, reason));
        }

        let mut blob = section.prompt.clone();
        for option in &section.options {
            blob.push(' ');
            blob.push_str(&option.text);
        }

        let (correct_answer, verified) = match kind {
            QuestionKind::MultipleChoice => match section.answer.as_deref() {
                Some(answer) => match parse_answer_letter(answer) {
                    Some(letter) => (letter.to_string(), true),
                    None => {
                        warn!(question = index, answer, "correct-answer letter outside A-D, leaving the question unverified");
                        ("A".to_string(), false)
                    }
                },
                None => {
                    warn!(question = index, "no correct-answer marker, leaving the question unverified");
                    ("A".to_string(), false)
                }
            },
            QuestionKind::OpenEnded => match section.answer {
                Some(answer) if !answer.trim().is_empty() => {
                    blob.push(' ');
                    blob.push_str(&answer);
                    (answer, true)
                }
                _ => return Err((kind, "open question without a model answer".to_string())),
            },
        };

        let question = Question {
            index,
            kind,
            prompt: section.prompt,
            options: section.options,
            correct_answer,
            source_codes: attribute_codes(&blob, profile, annotations, source),
            origin: QuestionOrigin::Generated,
            verified,
        };

        question
            .check_invariants(known_codes)
            .map_err(|reason| (kind, reason))?;
        Ok(question)
    }
}

fn parse_answer_letter(answer: &str) -> Option<char> {
    let letter = answer.trim().chars().next()?.to_ascii_uppercase();
    OPTION_LETTERS.contains(&letter).then_some(letter)
}

/// Trace a question back to annotation codes by looking for annotation
/// excerpts inside the question text. When nothing matches literally, the
/// activity's own codes (as far as they exist in the set) are used, and as a
/// last resort every code; a question is never left without provenance.
fn attribute_codes(
    blob: &str,
    profile: &ActivityProfile,
    annotations: &AnnotationSet,
    source: &SourceText,
) -> BTreeSet<String> {
    let haystack = blob.to_lowercase();
    let mut codes: BTreeSet<String> = BTreeSet::new();

    for annotation in annotations.iter() {
        let needle = {
            let excerpt = source.excerpt_for(annotation);
            if excerpt.is_empty() {
                annotation.text.clone()
            } else {
                excerpt
            }
        };
        let needle = needle.to_lowercase();
        if needle.chars().count() >= 4 && haystack.contains(needle.trim()) {
            codes.insert(annotation.code.clone());
        }
    }

    if codes.is_empty() {
        codes = annotations
            .all_codes()
            .iter()
            .filter(|code| profile.covers_code(code))
            .cloned()
            .collect();
    }
    if codes.is_empty() {
        codes = annotations.all_codes().iter().cloned().collect();
    }
    codes
}

/// Deterministic template quiz used when no AI content is usable. Walks the
/// annotation set in document order: one multiple-choice question per tag
/// family, plus one open question on the least-represented family. Always
/// satisfies the quiz invariants.
pub fn fallback_quiz(
    activity: ActivityType,
    language: Language,
    annotations: &AnnotationSet,
    source: &SourceText,
) -> Quiz {
    let families = annotations.all_codes().len();
    let mut questions = Vec::new();

    for family in 0..families {
        questions.push(fallback_mcq(
            family,
            questions.len() + 1,
            language,
            annotations,
            source,
        ));
    }
    // A single-family table still has to honor the 2-MCQ minimum.
    while questions.len() < 2 {
        questions.push(fallback_mcq(
            questions.len(),
            questions.len() + 1,
            language,
            annotations,
            source,
        ));
    }
    questions.push(fallback_open(
        questions.len() + 1,
        language,
        annotations,
        source,
    ));

    Quiz::new(activity, language, questions, true)
}

/// Canned multiple-choice question for one tag family. The annotation's own
/// excerpt is the correct option; distractors come from sibling families,
/// topped up with default fillers. The correct slot rotates with the family
/// index so fallback quizzes do not always answer "A".
fn fallback_mcq(
    family: usize,
    index: usize,
    language: Language,
    annotations: &AnnotationSet,
    source: &SourceText,
) -> Question {
    let codes = annotations.all_codes();
    let code = &codes[family % codes.len()];

    let correct = family_excerpt(annotations, source, code, family / codes.len());

    let mut distractors: Vec<String> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    seen.insert(correct.clone());
    for other in codes.iter().filter(|c| *c != code) {
        let candidate = family_excerpt(annotations, source, other, 0);
        if seen.insert(candidate.clone()) {
            distractors.push(candidate);
        }
        if distractors.len() == 3 {
            break;
        }
    }
    for filler in default_fillers(language) {
        if distractors.len() == 3 {
            break;
        }
        if seen.insert(filler.to_string()) {
            distractors.push(filler.to_string());
        }
    }
    let mut counter = 1;
    while distractors.len() < 3 {
        let candidate = match language {
            Language::It => format!("Nessuna alternativa valida ({counter})"),
            _ => format!("No valid alternative ({counter})"),
        };
        if seen.insert(candidate.clone()) {
            distractors.push(candidate);
        }
        counter += 1;
    }

    let correct_slot = family % 4;
    let mut options = Vec::with_capacity(4);
    let mut remaining = distractors.into_iter();
    for (slot, letter) in OPTION_LETTERS.into_iter().enumerate() {
        let text = if slot == correct_slot {
            correct.clone()
        } else {
            remaining.next().unwrap_or_default()
        };
        options.push(QuizOption { letter, text });
    }

    let prompt = match language {
        Language::It => format!("Quale dei seguenti elementi del testo è annotato come {code}?"),
        _ => format!("Which of the following elements of the text is annotated as {code}?"),
    };

    Question {
        index,
        kind: QuestionKind::MultipleChoice,
        prompt,
        options,
        correct_answer: OPTION_LETTERS[correct_slot].to_string(),
        source_codes: [code.clone()].into_iter().collect(),
        origin: QuestionOrigin::Fallback,
        verified: true,
    }
}

/// Canned open question asking the reader to justify the least-represented
/// annotation family.
fn fallback_open(
    index: usize,
    language: Language,
    annotations: &AnnotationSet,
    source: &SourceText,
) -> Question {
    let code = annotations.least_represented_code().to_string();
    let excerpt = family_excerpt(annotations, source, &code, 0);

    let (prompt, answer) = match language {
        Language::It => (
            format!(
                "Spiega, facendo riferimento al testo, il ruolo dell'elemento annotato come {code}: «{excerpt}»."
            ),
            format!(
                "Nel testo l'elemento {code} corrisponde a «{excerpt}»; una buona risposta ne spiega il ruolo nel contesto citando il passaggio."
            ),
        ),
        _ => (
            format!(
                "Explain, with reference to the text, the role of the element annotated as {code}: \"{excerpt}\"."
            ),
            format!(
                "In the text the {code} element corresponds to \"{excerpt}\"; a good answer explains its role in context, citing the passage."
            ),
        ),
    };

    Question {
        index,
        kind: QuestionKind::OpenEnded,
        prompt,
        options: vec![],
        correct_answer: answer,
        source_codes: [code].into_iter().collect(),
        origin: QuestionOrigin::Fallback,
        verified: true,
    }
}

/// The n-th excerpt of a tag family, clipped for option display. Falls back
/// to the first annotation when the family has fewer entries.
fn family_excerpt(
    annotations: &AnnotationSet,
    source: &SourceText,
    code: &str,
    nth: usize,
) -> String {
    let family = annotations.by_code(code);
    let annotation = family.get(nth).or_else(|| family.first());
    let Some(annotation) = annotation else {
        return String::new();
    };
    let excerpt = source.excerpt_for(annotation);
    let excerpt = if excerpt.is_empty() {
        annotation.text.clone()
    } else {
        excerpt
    };
    let clipped: String = excerpt.chars().take(80).collect();
    clipped
}

fn default_fillers(language: Language) -> &'static [&'static str] {
    match language {
        Language::It => &[
            "Nessuno degli elementi indicati",
            "Un dettaglio non annotato nel testo",
            "Un'informazione esterna al testo",
        ],
        _ => &[
            "None of the listed elements",
            "A detail not annotated in the text",
            "Information external to the text",
        ],
    }
}

/// Parse a validation response in the `VALIDA / SUGGERIMENTO / MOTIVAZIONE`
/// format into a verdict. Anything that is not a clear yes or no is treated
/// as questionable rather than guessed.
pub fn parse_validation_response(raw: &str, question_index: usize) -> ValidationResult {
    let verdict_re = Regex::new(r"(?i)VALID[A]?\s*:\s*(\S[^\n]*)").expect("hard-coded pattern");
    let suggestion_re =
        Regex::new(r"(?i)(?:SUGGERIMENTO|SUGGESTION)\s*:\s*([^\n]+)").expect("hard-coded pattern");
    let motivation_re =
        Regex::new(r"(?i)(?:MOTIVAZIONE|EXPLANATION)\s*:\s*([^\n]+)").expect("hard-coded pattern");

    let verdict = match verdict_re.captures(raw) {
        Some(caps) => {
            let token = caps[1].trim().to_lowercase();
            if token.starts_with("sì") || token.starts_with("si") || token.starts_with("yes") {
                Verdict::Valid
            } else if token.starts_with("no") {
                Verdict::Invalid
            } else {
                Verdict::Questionable
            }
        }
        None => Verdict::Questionable,
    };

    let suggestion = suggestion_re
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty());
    let explanation = motivation_re
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string());

    ValidationResult {
        question_index,
        verdict,
        explanation,
        suggested_correction: suggestion,
    }
}

/// Render a quiz back into the marker grammar, the inverse of `parse`. Used
/// when re-submitting an edited quiz for validation and for display.
pub fn render_quiz(quiz: &Quiz) -> String {
    let mut out = String::new();
    for question in &quiz.questions {
        let tag = match question.kind {
            QuestionKind::MultipleChoice => "Scelta Multipla",
            QuestionKind::OpenEnded => "Risposta Aperta",
        };
        out.push_str(&format!("{}. [{}] {}\n", question.index, tag, question.prompt));
        match question.kind {
            QuestionKind::MultipleChoice => {
                for option in &question.options {
                    out.push_str(&format!("- {}) {}\n", option.letter, option.text));
                }
                out.push_str(&format!("✅ Risposta corretta: {}\n\n", question.correct_answer));
            }
            QuestionKind::OpenEnded => {
                out.push_str(&format!("✅ Risposta: {}\n\n", question.correct_answer));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (SourceText, AnnotationSet) {
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
        (source, annotations)
    }

    const WELL_FORMED: &str = "\
1. [Scelta Multipla] Chi ha firmato il contratto?
- A) Samardo Samuels
- B) Il procuratore
- C) L'allenatore
- D) Il presidente

✅ Risposta corretta: A

2. [Scelta Multipla] Dove è stato firmato il contratto?
- A) Roma
- B) Milano
- C) Torino
- D) Napoli

✅ Risposta corretta: B

3. [Risposta Aperta] Perché Samardo Samuels ha firmato il contratto?
✅ Risposta: Perché voleva giocare in Italia.
";

    fn parse(raw: Option<&str>) -> Quiz {
        let (source, annotations) = fixture();
        QuizParser::new().parse(
            raw,
            ActivityType::FiveW,
            Language::It,
            &annotations,
            &source,
        )
    }

    #[test]
    fn well_formed_response_parses_without_fallback() {
        let quiz = parse(Some(WELL_FORMED));

        assert_eq!(quiz.questions.len(), 3);
        assert_eq!(quiz.status, crate::models::quiz::QuizStatus::Draft);
        assert!(!quiz.degraded);
        assert!(quiz.satisfies_question_mix());
        assert!(quiz
            .questions
            .iter()
            .all(|q| q.origin == QuestionOrigin::Generated && q.verified));
        assert_eq!(quiz.questions[0].correct_answer, "A");
        assert_eq!(quiz.questions[1].correct_answer, "B");
        assert!(quiz.questions[2].correct_answer.contains("giocare"));
        assert!(quiz.questions.iter().all(|q| !q.source_codes.is_empty()));
        // Question 1 names "Samardo Samuels", an annotated WHO span.
        assert!(quiz.questions[0].source_codes.contains("WHO"));
    }

    #[test]
    fn missing_option_replaces_only_that_question() {
        let broken = WELL_FORMED.replace("- D) Il presidente\n", "");
        let quiz = parse(Some(&broken));

        assert_eq!(quiz.questions.len(), 3);
        assert!(!quiz.degraded);
        assert_eq!(quiz.questions[0].origin, QuestionOrigin::Fallback);
        assert_eq!(quiz.questions[1].origin, QuestionOrigin::Generated);
        assert_eq!(quiz.questions[2].origin, QuestionOrigin::Generated);
        assert_eq!(quiz.questions[1].correct_answer, "B");
    }

    #[test]
    fn interleaved_answer_marker_is_a_structural_violation() {
        let broken = WELL_FORMED.replace(
            "- C) L'allenatore\n",
            "✅ Risposta corretta: A\n- C) L'allenatore\n",
        );
        let quiz = parse(Some(&broken));

        assert_eq!(quiz.questions[0].origin, QuestionOrigin::Fallback);
        assert_eq!(quiz.questions[1].origin, QuestionOrigin::Generated);
    }

    #[test]
    fn missing_answer_marker_leaves_question_unverified() {
        let broken = WELL_FORMED.replacen("✅ Risposta corretta: A\n", "", 1);
        let quiz = parse(Some(&broken));

        assert_eq!(quiz.questions[0].origin, QuestionOrigin::Generated);
        assert!(!quiz.questions[0].verified);
        assert_eq!(quiz.questions[0].correct_answer, "A");
        assert!(quiz.questions[1].verified);
    }

    #[test]
    fn answer_letter_outside_a_to_d_is_rejected() {
        let broken = WELL_FORMED.replace("✅ Risposta corretta: A", "✅ Risposta corretta: F");
        let quiz = parse(Some(&broken));
        assert!(!quiz.questions[0].verified);
    }

    #[test]
    fn english_markers_are_accepted() {
        let english = "\
1. [Multiple Choice] Who signed the contract?
- A) Samardo Samuels
- B) The agent
- C) The coach
- D) The president
✅ Correct answer: A

2. [Multiple Choice] Where was it signed?
- A) Rome
- B) Milano
- C) Turin
- D) Naples
✅ Correct answer: B

3. [Open Answer] Why did he sign?
✅ Answer: Because he wanted to play in Italy.
";
        let quiz = parse(Some(english));
        assert_eq!(quiz.questions.len(), 3);
        assert!(!quiz.degraded);
        assert!(quiz.questions.iter().all(|q| q.verified));
    }

    #[test]
    fn empty_or_absent_response_yields_a_valid_fallback_quiz() {
        for raw in [None, Some(""), Some("   \n  ")] {
            let quiz = parse(raw);
            assert!(quiz.degraded);
            assert!(quiz.satisfies_question_mix());
            assert!(quiz
                .questions
                .iter()
                .all(|q| q.origin == QuestionOrigin::Fallback));
        }
    }

    #[test]
    fn garbage_response_yields_a_fallback_quiz() {
        let quiz = parse(Some("Mi dispiace, non posso generare il quiz richiesto."));
        assert!(quiz.degraded);
        assert!(quiz.satisfies_question_mix());
    }

    #[test]
    fn fallback_quiz_is_structurally_valid() {
        let (source, annotations) = fixture();
        let quiz = fallback_quiz(ActivityType::FiveW, Language::It, &annotations, &source);
        let known = annotations.code_set();

        assert!(quiz.degraded);
        assert!(quiz.satisfies_question_mix());
        for question in &quiz.questions {
            question.check_invariants(&known).unwrap();
        }
        // The correct slot rotates across families.
        let letters: Vec<&str> = quiz
            .questions
            .iter()
            .filter(|q| q.kind == QuestionKind::MultipleChoice)
            .map(|q| q.correct_answer.as_str())
            .collect();
        assert_eq!(letters, vec!["A", "B", "C", "D"]);
        // WHO appears once: the least-represented code is the first family.
        assert_eq!(
            quiz.questions.last().unwrap().kind,
            QuestionKind::OpenEnded
        );
    }

    #[test]
    fn single_family_table_still_meets_the_question_mix() {
        let source = SourceText::from_extracted("Lunedì Samardo Samuels ha firmato.").unwrap();
        let rows = ["WHO,Who,7,22,Samardo Samuels"];
        let annotations = AnnotationSet::load(rows, &source).unwrap();
        let quiz = fallback_quiz(ActivityType::FiveW, Language::It, &annotations, &source);
        let known = annotations.code_set();

        assert!(quiz.satisfies_question_mix());
        for question in &quiz.questions {
            question.check_invariants(&known).unwrap();
        }
    }

    #[test]
    fn validation_response_parses_to_verdicts() {
        let valid = parse_validation_response(
            "VALIDA: Sì\nSUGGERIMENTO: La risposta è corretta\nMOTIVAZIONE: Coerente con il testo.",
            1,
        );
        assert_eq!(valid.verdict, Verdict::Valid);
        assert_eq!(valid.explanation, "Coerente con il testo.");

        let invalid = parse_validation_response(
            "VALIDA: No\nSUGGERIMENTO: Cambia la risposta in B\nMOTIVAZIONE: Il testo indica Milano.",
            2,
        );
        assert_eq!(invalid.verdict, Verdict::Invalid);
        assert_eq!(
            invalid.suggested_correction.as_deref(),
            Some("Cambia la risposta in B")
        );

        let unclear = parse_validation_response("VALIDA: In parte\nMOTIVAZIONE: Ambigua.", 3);
        assert_eq!(unclear.verdict, Verdict::Questionable);

        let garbage = parse_validation_response("non so cosa dire", 4);
        assert_eq!(garbage.verdict, Verdict::Questionable);
    }

    #[test]
    fn rendered_quiz_reparses_identically() {
        let quiz = parse(Some(WELL_FORMED));
        let rendered = render_quiz(&quiz);
        let reparsed = parse(Some(&rendered));

        assert_eq!(reparsed.questions.len(), quiz.questions.len());
        for (a, b) in quiz.questions.iter().zip(&reparsed.questions) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.prompt, b.prompt);
            assert_eq!(a.correct_answer, b.correct_answer);
        }
    }
}
