//! JSON export of a saved quiz for the external grading backend.

use chrono::Utc;
use serde_json::json;

use crate::error::{AppResult, LifecycleError};
use crate::models::annotation::{AnnotationSet, SourceText};
use crate::models::quiz::{Quiz, QuizStatus};

/// Serialize a quiz together with its grounding material. Only a saved quiz
/// may leave the application: anything earlier is still editable and would
/// hand the grading backend a moving target.
pub fn to_json(quiz: &Quiz, annotations: &AnnotationSet, source: &SourceText) -> AppResult<String> {
    if quiz.status != QuizStatus::Saved {
        return Err(LifecycleError::IllegalTransition {
            from: quiz.status,
            action: "export",
        }
        .into());
    }

    let grouped: serde_json::Map<String, serde_json::Value> = annotations
        .grouped()
        .into_iter()
        .map(|(code, entries)| {
            let spans: Vec<_> = entries
                .iter()
                .map(|a| {
                    json!({
                        "title": a.title,
                        "begin": a.begin,
                        "end": a.end,
                        "excerpt": source.excerpt_for(a),
                    })
                })
                .collect();
            (code.to_string(), serde_json::Value::Array(spans))
        })
        .collect();

    let envelope = json!({
        "exported_at": Utc::now().to_rfc3339(),
        "activity": quiz.activity,
        "language": quiz.language,
        "quiz": quiz,
        "source_text": source.content,
        "annotations": grouped,
    });

    Ok(serde_json::to_string_pretty(&envelope)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::activity::ActivityType;
    use crate::services::language::Language;
    use crate::services::parser::QuizParser;

    fn fixture() -> (SourceText, AnnotationSet, Quiz) {
        let source = SourceText::from_extracted(
            "Lunedì Samardo Samuels ha firmato un contratto a Milano perché voleva giocare in Italia.",
        )
        .unwrap();
        let rows = [
            "WHO,Who,7,22,Samardo Samuels",
            "WHEN,When,0,6,Lunedì",
        ];
        let annotations = AnnotationSet::load(rows, &source).unwrap();
        let quiz = QuizParser::new().parse(
            None,
            ActivityType::FiveW,
            Language::It,
            &annotations,
            &source,
        );
        (source, annotations, quiz)
    }

    #[test]
    fn unsaved_quiz_is_not_exportable() {
        let (source, annotations, quiz) = fixture();
        assert!(matches!(
            to_json(&quiz, &annotations, &source).unwrap_err(),
            AppError::Lifecycle(LifecycleError::IllegalTransition {
                from: QuizStatus::Draft,
                ..
            })
        ));
    }

    #[test]
    fn export_carries_quiz_text_and_annotations() {
        let (source, annotations, mut quiz) = fixture();
        quiz.status = QuizStatus::Saved;

        let raw = to_json(&quiz, &annotations, &source).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["quiz"]["id"], quiz.id.as_str());
        assert_eq!(
            value["source_text"],
            "Lunedì Samardo Samuels ha firmato un contratto a Milano perché voleva giocare in Italia."
        );
        assert_eq!(value["annotations"]["WHO"][0]["excerpt"], "Samardo Samuels");
        assert!(value["exported_at"].is_string());
        assert_eq!(
            value["quiz"]["questions"].as_array().unwrap().len(),
            quiz.questions.len()
        );
    }
}
