//! Activity registry.
//!
//! All activity-specific behavior (relevant annotation codes, didactic focus
//! for prompts, feedback focus) hangs off a static profile per activity.
//! Nothing else in the crate branches on the activity type directly: adding
//! an activity means adding one enum variant and one profile here.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::services::language::Language;

/// Pedagogical category of a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    FiveW,
    Thesis,
    Argument,
    Connective,
}

impl ActivityType {
    pub const ALL: [ActivityType; 4] = [
        ActivityType::FiveW,
        ActivityType::Thesis,
        ActivityType::Argument,
        ActivityType::Connective,
    ];

    /// Resolve the static profile for this activity.
    pub fn profile(self) -> &'static ActivityProfile {
        match self {
            ActivityType::FiveW => &FIVE_W,
            ActivityType::Thesis => &THESIS,
            ActivityType::Argument => &ARGUMENT,
            ActivityType::Connective => &CONNECTIVE,
        }
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5w" | "fivew" | "five_w" => Ok(ActivityType::FiveW),
            "thesis" | "tesi" => Ok(ActivityType::Thesis),
            "argument" | "argomento" => Ok(ActivityType::Argument),
            "connective" | "connettivo" => Ok(ActivityType::Connective),
            other => Err(format!("unknown activity type '{other}'")),
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.profile().display_name)
    }
}

/// Everything that varies between activities.
pub struct ActivityProfile {
    pub activity: ActivityType,
    pub display_name: &'static str,
    /// Annotation codes this activity cares about (normalized form).
    pub codes: &'static [&'static str],
    /// Role line opening every generation prompt.
    pub role_it: &'static str,
    /// Didactic focus block of the generation prompt.
    pub focus_it: &'static str,
    pub focus_en: &'static str,
    /// What feedback should zero in on for this activity.
    pub feedback_focus_it: &'static str,
    pub feedback_focus_en: &'static str,
}

impl ActivityProfile {
    /// Normalize an annotation code for matching against `codes`.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase().replace([' ', '-'], "_")
    }

    /// True when the given annotation code belongs to this activity.
    pub fn covers_code(&self, code: &str) -> bool {
        let normalized = Self::normalize_code(code);
        self.codes.contains(&normalized.as_str())
    }

    pub fn focus(&self, language: Language) -> &'static str {
        match language {
            Language::It => self.focus_it,
            _ => self.focus_en,
        }
    }

    pub fn feedback_focus(&self, language: Language) -> &'static str {
        match language {
            Language::It => self.feedback_focus_it,
            _ => self.feedback_focus_en,
        }
    }
}

static FIVE_W: ActivityProfile = ActivityProfile {
    activity: ActivityType::FiveW,
    display_name: "5W",
    codes: &["WHO", "WHAT", "WHEN", "WHERE", "WHY"],
    role_it: "Sei un assistente educativo specializzato nella creazione di quiz basati sulle 5W (Who, What, When, Where, Why).",
    focus_it: "Il quiz deve valutare la comprensione degli elementi 5W nel testo: una domanda a scelta multipla su CHI (Who) o COSA (What), una su QUANDO (When), DOVE (Where) o PERCHÉ (Why), e una domanda aperta che richieda di collegare più elementi delle 5W.",
    focus_en: "The quiz must assess understanding of the 5W elements in the text: one multiple-choice question on WHO or WHAT, one on WHEN, WHERE or WHY, and one open question connecting several 5W elements.",
    feedback_focus_it: "Fai sempre riferimento a un'annotazione 5W specifica (nomina il tag, es. \"Why: ...\").",
    feedback_focus_en: "Always reference a specific 5W annotation (name the tag, e.g. \"Why: ...\").",
};

static THESIS: ActivityProfile = ActivityProfile {
    activity: ActivityType::Thesis,
    display_name: "Thesis",
    codes: &["THESIS", "ANTITHESIS", "CONCLUSION", "TESI", "ANTITESI"],
    role_it: "Sei un assistente educativo esperto nell'individuazione della TESI di un testo secondo i criteri della didattica italiana.",
    focus_it: "Il quiz deve valutare la capacità dello studente di identificare la TESI (posizione dell'autore), distinguerla dall'ANTITESI e riconoscere la CONCLUSIONE del testo.",
    focus_en: "The quiz must assess the student's ability to identify the THESIS (the author's position), distinguish it from the ANTITHESIS and recognize the CONCLUSION of the text.",
    feedback_focus_it: "Collega ogni osservazione all'annotazione di tesi o antitesi pertinente.",
    feedback_focus_en: "Tie every observation to the relevant thesis or antithesis annotation.",
};

static ARGUMENT: ActivityProfile = ActivityProfile {
    activity: ActivityType::Argument,
    display_name: "Argument",
    codes: &[
        "THESIS",
        "ANTITHESIS",
        "ARGUMENT",
        "COUNTER_ARGUMENT",
        "CONCLUSION",
        "TESI",
        "ARGOMENTO",
        "CONTROARGOMENTO",
    ],
    role_it: "Sei un assistente educativo esperto nell'analisi del TESTO ARGOMENTATIVO secondo i criteri della didattica italiana.",
    focus_it: "Il quiz deve valutare la capacità di identificare la TESI, riconoscere gli ARGOMENTI a suo sostegno (causa, analogia, esempio, dato, citazione), distinguere ARGOMENTI e CONTROARGOMENTI e comprendere la struttura logica del testo (tesi → argomenti → controargomenti → conclusione).",
    focus_en: "The quiz must assess the ability to identify the THESIS, recognize the ARGUMENTS supporting it (cause, analogy, example, data, quotation), distinguish ARGUMENTS from COUNTER-ARGUMENTS and understand the logical structure of the text.",
    feedback_focus_it: "Indica se l'elemento discusso è tesi, argomento o controargomento, citando l'annotazione.",
    feedback_focus_en: "State whether the discussed element is a thesis, argument or counter-argument, citing the annotation.",
};

static CONNECTIVE: ActivityProfile = ActivityProfile {
    activity: ActivityType::Connective,
    display_name: "Connective",
    codes: &[
        "CONNECTIVE",
        "CONNETTIVO",
        "TEMPORAL",
        "CAUSAL",
        "ADVERSATIVE",
        "CONCLUSIVE",
    ],
    role_it: "Sei un assistente educativo specializzato nei connettivi e nella coesione testuale.",
    focus_it: "Il quiz deve valutare la comprensione dei connettivi annotati e della funzione che svolgono nella coesione del testo (temporale, causale, avversativa, conclusiva).",
    focus_en: "The quiz must assess understanding of the annotated connectives and of the role they play in textual cohesion (temporal, causal, adversative, conclusive).",
    feedback_focus_it: "Richiama il connettivo annotato e la relazione logica che esprime.",
    feedback_focus_en: "Point back to the annotated connective and the logical relation it expresses.",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_activity_resolves_to_its_own_profile() {
        for activity in ActivityType::ALL {
            assert_eq!(activity.profile().activity, activity);
        }
    }

    #[test]
    fn code_matching_is_normalized() {
        let profile = ActivityType::Argument.profile();
        assert!(profile.covers_code("counter-argument"));
        assert!(profile.covers_code("Tesi"));
        assert!(!profile.covers_code("WHO"));
    }

    #[test]
    fn activity_parses_from_user_input() {
        assert_eq!("5w".parse::<ActivityType>().unwrap(), ActivityType::FiveW);
        assert_eq!(
            "Connettivo".parse::<ActivityType>().unwrap(),
            ActivityType::Connective
        );
        assert!("prose".parse::<ActivityType>().is_err());
    }
}
