//! Prompt builder - composes generation, validation and feedback requests.
//!
//! The builder never talks to the backend: it returns a `RequestSpec` that a
//! client executes. All activity-specific wording comes from the activity
//! registry, all language-specific wording from the detected language. The
//! structural markers (`[Scelta Multipla]`, `✅ Risposta corretta:` etc.)
//! stay Italian in both languages because the parser keys on them.

use std::fmt::Write as _;

use crate::config::Config;
use crate::models::activity::ActivityProfile;
use crate::models::annotation::AnnotationSet;
use crate::models::annotation::SourceText;
use crate::models::quiz::{Question, QuestionKind};
use crate::services::language::Language;

/// A fully composed request for the AI backend.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Composes activity- and language-specific requests.
pub struct PromptBuilder {
    max_excerpts_per_code: usize,
}

impl PromptBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            max_excerpts_per_code: config.max_excerpts_per_code.max(1),
        }
    }

    /// Build the quiz-generation request: 2 multiple-choice + 1 open
    /// question, grounded in the annotations relevant to the activity.
    /// `history` carries question stems from earlier generations for the
    /// same input; the model is told not to reuse them.
    pub fn build_generation_request(
        &self,
        profile: &ActivityProfile,
        annotations: &AnnotationSet,
        source: &SourceText,
        language: Language,
        history: &[String],
    ) -> RequestSpec {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "{}\n", profile.role_it);
        let _ = writeln!(prompt, "TESTO:\n{}\n", source.content);
        let _ = writeln!(
            prompt,
            "ANNOTAZIONI ({}):\n{}\n",
            profile.display_name,
            self.format_annotations(profile, annotations, source)
        );
        let _ = writeln!(prompt, "ISTRUZIONI:\n{}\n", profile.focus(language));
        prompt.push_str(
            "Il quiz deve includere esattamente 2 domande a scelta multipla (4 opzioni ciascuna) \
             e 1 domanda a risposta aperta. Ogni domanda deve essere basata sulle annotazioni \
             fornite e avere una risposta chiara e verificabile dal testo.\n\n",
        );
        prompt.push_str(
            "FORMATO RICHIESTO (seguilo ESATTAMENTE):\n\n\
             numero domanda. [Scelta Multipla] testo della domanda:\n\
             - A) opzione A\n\
             - B) opzione B\n\
             - C) opzione C\n\
             - D) opzione D\n\n\
             ✅ Risposta corretta: lettera della risposta corretta\n\n\
             ⚠️ La risposta corretta deve comparire sempre DOPO le quattro opzioni, mai in mezzo.\n\n\
             numero domanda. [Risposta Aperta] testo della domanda:\n\
             ✅ Risposta: testo della risposta corretta\n\n\
             NON usare un modello fisso di domande. NON aggiungere spiegazioni o commenti extra.\n\n",
        );
        if !history.is_empty() {
            prompt.push_str(
                "DOMANDE GIÀ PROPOSTE IN PRECEDENZA (NON riutilizzarle, nemmeno riformulate):\n",
            );
            for stem in history {
                let _ = writeln!(prompt, "- {stem}");
            }
            prompt.push('\n');
        }
        prompt.push_str(language_rules(language));

        RequestSpec {
            prompt,
            system: None,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }

    /// Build the request that asks the backend whether a question's recorded
    /// answer is actually supported by the text.
    pub fn build_validation_request(
        &self,
        profile: &ActivityProfile,
        question: &Question,
        annotations: &AnnotationSet,
        source: &SourceText,
    ) -> RequestSpec {
        let mut prompt = String::new();
        let _ = writeln!(
            prompt,
            "Valuta se la risposta registrata per questa domanda è corretta, basandoti sul testo e sulle annotazioni fornite.\n"
        );
        let _ = writeln!(prompt, "TESTO:\n{}\n", truncated(&source.content, 3000));
        let _ = writeln!(
            prompt,
            "ANNOTAZIONI ({}):\n{}\n",
            profile.display_name,
            self.format_annotations(profile, annotations, source)
        );
        let _ = writeln!(prompt, "DOMANDA:\n{}\n", question.prompt);
        match question.kind {
            QuestionKind::MultipleChoice => {
                let _ = writeln!(prompt, "OPZIONI:");
                for option in &question.options {
                    let _ = writeln!(prompt, "{}) {}", option.letter, option.text);
                }
                let _ = writeln!(
                    prompt,
                    "\nRISPOSTA SELEZIONATA: {}) {}\n",
                    question.correct_answer,
                    question.correct_option_text().unwrap_or("?")
                );
            }
            QuestionKind::OpenEnded => {
                let _ = writeln!(prompt, "RISPOSTA FORNITA:\n{}\n", question.correct_answer);
            }
        }
        prompt.push_str(
            "Valuta la risposta. Rispondi ESATTAMENTE in questo formato:\n\
             VALIDA: [Sì/No/In parte]\n\
             SUGGERIMENTO: [la tua raccomandazione, o \"La risposta è corretta\" se adeguata]\n\
             MOTIVAZIONE: [breve spiegazione]\n",
        );

        RequestSpec {
            prompt,
            system: None,
            temperature: 0.3,
            max_tokens: 512,
        }
    }

    /// Build the request that scores a student's free-text answer against
    /// the annotated ground truth.
    pub fn build_feedback_request(
        &self,
        profile: &ActivityProfile,
        question: &Question,
        student_answer: &str,
        annotations: &AnnotationSet,
        source: &SourceText,
        language: Language,
    ) -> RequestSpec {
        let mut prompt = String::new();
        prompt.push_str(
            "Sei un tutor educativo che valuta risposte di studenti basandosi su testi annotati. \
             Non confondere mai la RISPOSTA DELLO STUDENTE con la RISPOSTA ATTESA: valuti SOLO \
             la risposta dello studente.\n\n",
        );
        let _ = writeln!(prompt, "DOMANDA: {}\n", question.prompt);
        let _ = writeln!(prompt, "RISPOSTA ATTESA (modello): {}\n", question.correct_answer);
        let _ = writeln!(prompt, "RISPOSTA DELLO STUDENTE (da valutare): {student_answer}\n");
        let _ = writeln!(
            prompt,
            "ANNOTAZIONI DI RIFERIMENTO ({}):\n{}\n",
            profile.display_name,
            self.format_annotations(profile, annotations, source)
        );
        let _ = writeln!(
            prompt,
            "CONTESTO TESTUALE (estratto):\n{}\n",
            truncated(&source.content, 500)
        );
        let _ = writeln!(prompt, "{}\n", profile.feedback_focus(language));
        prompt.push_str(
            "Classifica la risposta dello studente. Se non è pienamente corretta, indica UN solo \
             tipo di errore tra: LOGICO (il ragionamento non regge), CONTENUTO (fatti mancanti o \
             errati), INTERPRETAZIONE (fraintende il testo), PERTINENZA (fuori tema), ESPRESSIONE \
             (sostanza corretta ma formulazione poco chiara).\n\n\
             Rispondi ESATTAMENTE in questo formato:\n\
             ESITO: [CORRETTA/PARZIALE/ERRATA]\n\
             TIPO ERRORE: [LOGICO/CONTENUTO/INTERPRETAZIONE/PERTINENZA/ESPRESSIONE, oppure NESSUNO]\n\
             SPIEGAZIONE: [2-3 frasi che citano l'annotazione o il passaggio del testo usato come riferimento]\n\
             DOMANDA METACOGNITIVA: [una sola domanda breve che rimandi al testo o a un'annotazione]\n",
        );

        RequestSpec {
            prompt,
            system: None,
            temperature: 0.3,
            max_tokens: 1024,
        }
    }

    /// Compact serialization of the annotations relevant to the activity:
    /// `- CODE [begin..end]: excerpt`, capped per code. Falls back to the
    /// whole set when no code matches the activity profile.
    fn format_annotations(
        &self,
        profile: &ActivityProfile,
        annotations: &AnnotationSet,
        source: &SourceText,
    ) -> String {
        let mut grouped: Vec<(&str, Vec<_>)> = annotations
            .grouped()
            .into_iter()
            .filter(|(code, _)| profile.covers_code(code))
            .collect();
        if grouped.is_empty() {
            grouped = annotations.grouped();
        }

        let mut out = String::new();
        for (code, items) in grouped {
            let shown = items.len().min(self.max_excerpts_per_code);
            for annotation in &items[..shown] {
                let excerpt = source.excerpt_for(annotation);
                let excerpt = if excerpt.is_empty() {
                    annotation.text.clone()
                } else {
                    excerpt
                };
                let _ = writeln!(
                    out,
                    "- {code} [{}..{}]: {}",
                    annotation.begin,
                    annotation.end,
                    truncated(&excerpt, 120)
                );
            }
            if items.len() > shown {
                let _ = writeln!(out, "  (e altri {} per {code})", items.len() - shown);
            }
        }
        if out.is_empty() {
            out.push_str("Nessuna annotazione disponibile\n");
        }
        out
    }
}

fn language_rules(language: Language) -> &'static str {
    match language {
        Language::It => {
            "Ruolo lingua (OBBLIGATORIO):\n\
             - Il testo è in italiano, quindi il quiz deve essere generato in italiano.\n\
             - NON tradurre i contenuti del testo e NON mescolare lingue nello stesso quiz.\n\
             - Conserva i nomi propri e le citazioni esattamente come nel testo.\n\
             - Mantieni SEMPRE le etichette di struttura: \"[Scelta Multipla]\", \"[Risposta Aperta]\", \
             \"✅ Risposta corretta:\", \"✅ Risposta:\" e i marcatori A) B) C) D).\n"
        }
        _ => {
            "LANGUAGE RULE (MANDATORY):\n\
             - The input text is in ENGLISH, so the quiz MUST be generated in ENGLISH.\n\
             - DO NOT translate the text content. Keep proper nouns and citations exactly as in the text.\n\
             - Exception: keep these Italian structural labels: \"[Scelta Multipla]\", \"[Risposta Aperta]\", \
             \"✅ Risposta corretta:\", \"✅ Risposta:\" and the markers A) B) C) D).\n"
        }
    }
}

/// Clip a text to at most `max_chars` characters for prompt embedding.
fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let clipped: String = text.chars().take(max_chars).collect();
        format!("{clipped}...")
    } else {
        text.to_string()
    }
}
