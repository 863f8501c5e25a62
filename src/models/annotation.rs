//! Annotation model - validated in-memory view of an annotation table.
//!
//! An annotation table arrives as CSV-like rows (`code,title,begin,end,text`)
//! whose offsets index characters of the companion document. Loading
//! validates the rows once; the resulting set is immutable and shared
//! read-only across validation and feedback calls.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::error::SchemaError;
use crate::services::language::{self, Language};

/// A labeled character span in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// Tag code, e.g. `WHO` or `THESIS`.
    pub code: String,
    /// Human-readable tag title.
    pub title: String,
    /// Character offset of the span start (inclusive).
    pub begin: usize,
    /// Character offset of the span end (exclusive).
    pub end: usize,
    /// The annotated snippet as recorded in the table.
    pub text: String,
}

/// The extracted document text plus its detected language.
///
/// Immutable once built. Binary extraction itself is a collaborator concern;
/// this type only receives its output.
#[derive(Debug, Clone, Serialize)]
pub struct SourceText {
    pub content: String,
    pub language: Language,
}

impl SourceText {
    /// Wrap the output of a text-extraction collaborator, detecting the
    /// language in the process. Fails when the extractor produced nothing,
    /// which blocks quiz generation for that document.
    pub fn from_extracted(content: impl Into<String>) -> crate::error::AppResult<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(crate::error::AppError::Extraction(
                "extracted document text is empty".to_string(),
            ));
        }
        let language = language::detect(&content);
        Ok(Self { content, language })
    }

    /// Number of characters in the text.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// The text behind an annotation span, clipped to the text bounds.
    /// Never panics, even for spans that run past the end of the text.
    pub fn excerpt_for(&self, annotation: &Annotation) -> String {
        let len = self.char_len();
        let begin = annotation.begin.min(len);
        let end = annotation.end.min(len);
        if begin >= end {
            return String::new();
        }
        self.content.chars().skip(begin).take(end - begin).collect()
    }
}

/// Ordered, grouped collection of annotations for one uploaded table.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
    /// Distinct codes in first-appearance (document) order.
    codes: Vec<String>,
}

impl AnnotationSet {
    /// Validate and load raw table rows. The first row is skipped when it
    /// looks like a header. Fails on missing columns, non-numeric offsets or
    /// inverted spans; a span whose excerpt length disagrees with the
    /// recorded text is only logged.
    pub fn load<I, S>(rows: I, source: &SourceText) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut annotations = Vec::new();
        let mut codes: Vec<String> = Vec::new();

        for (idx, row) in rows.into_iter().enumerate() {
            let row = row.as_ref().trim();
            if row.is_empty() {
                continue;
            }
            if idx == 0 && is_header_row(row) {
                continue;
            }
            let annotation = parse_row(row, idx + 1)?;

            let excerpt = source.excerpt_for(&annotation);
            if excerpt.chars().count() != annotation.text.chars().count() {
                warn!(
                    row = idx + 1,
                    code = %annotation.code,
                    "annotation span [{}..{}] does not line up with its text ({:?} vs {:?})",
                    annotation.begin,
                    annotation.end,
                    annotation.text,
                    excerpt,
                );
            }

            if !codes.iter().any(|c| c == &annotation.code) {
                codes.push(annotation.code.clone());
            }
            annotations.push(annotation);
        }

        if annotations.is_empty() {
            return Err(SchemaError::EmptyTable);
        }
        Ok(Self { annotations, codes })
    }

    /// Load from the raw text of an annotation table file.
    pub fn from_table(table: &str, source: &SourceText) -> Result<Self, SchemaError> {
        Self::load(table.lines(), source)
    }

    /// All annotations with the given code, in document order.
    pub fn by_code(&self, code: &str) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.code == code).collect()
    }

    /// Distinct codes in document order.
    pub fn all_codes(&self) -> &[String] {
        &self.codes
    }

    /// The codes as a set, for subset checks.
    pub fn code_set(&self) -> BTreeSet<&str> {
        self.codes.iter().map(String::as_str).collect()
    }

    /// Every annotation, in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Grouped `(code, annotations)` view, codes in document order.
    pub fn grouped(&self) -> Vec<(&str, Vec<&Annotation>)> {
        self.codes
            .iter()
            .map(|code| (code.as_str(), self.by_code(code)))
            .collect()
    }

    /// The code with the fewest annotations, first on ties.
    pub fn least_represented_code(&self) -> &str {
        self.codes
            .iter()
            .min_by_key(|code| self.by_code(code).len())
            .map(String::as_str)
            .expect("annotation set is never empty after load")
    }
}

fn is_header_row(row: &str) -> bool {
    row.to_lowercase().starts_with("code,")
}

/// Split one table row into an `Annotation`. The text column may itself
/// contain commas, so only the first four separators are significant.
fn parse_row(row: &str, row_no: usize) -> Result<Annotation, SchemaError> {
    let mut fields = row.splitn(5, ',');
    let code = fields.next().map(str::trim).unwrap_or_default();
    let title = fields.next().map(str::trim);
    let begin = fields.next().map(str::trim);
    let end = fields.next().map(str::trim);
    let text = fields.next().map(str::trim);

    let (title, begin, end, text) = match (title, begin, end, text) {
        (Some(t), Some(b), Some(e), Some(x)) if !code.is_empty() => (t, b, e, x),
        _ => return Err(SchemaError::MissingColumns { row: row_no }),
    };

    let begin: usize = begin.parse().map_err(|_| SchemaError::BadOffset {
        row: row_no,
        value: begin.to_string(),
    })?;
    let end: usize = end.parse().map_err(|_| SchemaError::BadOffset {
        row: row_no,
        value: end.to_string(),
    })?;
    if begin >= end {
        return Err(SchemaError::InvertedSpan {
            row: row_no,
            begin,
            end,
        });
    }

    Ok(Annotation {
        code: code.to_string(),
        title: title.to_string(),
        begin,
        end,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceText {
        SourceText::from_extracted(
            "Lunedì Samardo Samuels ha firmato un contratto a Milano perché voleva giocare.",
        )
        .unwrap()
    }

    #[test]
    fn load_round_trips_by_code_in_order() {
        let rows = [
            "code,title,begin,end,text",
            "WHO,Who,7,22,Samardo Samuels",
            "WHEN,When,0,6,Lunedì",
            "WHO,Who,49,55,Milano",
        ];
        let set = AnnotationSet::load(rows, &source()).unwrap();

        let who: Vec<&str> = set.by_code("WHO").iter().map(|a| a.text.as_str()).collect();
        assert_eq!(who, vec!["Samardo Samuels", "Milano"]);
        assert_eq!(set.all_codes(), &["WHO".to_string(), "WHEN".to_string()]);
        assert_eq!(set.least_represented_code(), "WHEN");
    }

    #[test]
    fn text_column_may_contain_commas() {
        let rows = ["WHY,Why,56,78,perché voleva, anzi doveva"];
        let set = AnnotationSet::load(rows, &source()).unwrap();
        assert_eq!(set.by_code("WHY")[0].text, "perché voleva, anzi doveva");
    }

    #[test]
    fn non_numeric_offset_is_a_schema_error() {
        let rows = ["WHO,Who,x,15,Samardo"];
        let err = AnnotationSet::load(rows, &source()).unwrap_err();
        assert!(matches!(err, SchemaError::BadOffset { row: 1, .. }));
    }

    #[test]
    fn inverted_span_is_a_schema_error() {
        let rows = ["WHO,Who,15,7,Samardo"];
        let err = AnnotationSet::load(rows, &source()).unwrap_err();
        assert!(matches!(err, SchemaError::InvertedSpan { .. }));
    }

    #[test]
    fn missing_columns_is_a_schema_error() {
        let rows = ["WHO,Who,7"];
        let err = AnnotationSet::load(rows, &source()).unwrap_err();
        assert_eq!(err, SchemaError::MissingColumns { row: 1 });
    }

    #[test]
    fn header_only_table_is_empty() {
        let rows = ["code,title,begin,end,text"];
        let err = AnnotationSet::load(rows, &source()).unwrap_err();
        assert_eq!(err, SchemaError::EmptyTable);
    }

    #[test]
    fn excerpt_clips_and_never_panics() {
        let src = source();
        let past_end = Annotation {
            code: "WHO".into(),
            title: "Who".into(),
            begin: 70,
            end: 5000,
            text: "giocare.".into(),
        };
        let excerpt = src.excerpt_for(&past_end);
        assert!(excerpt.ends_with("giocare."));

        let fully_out = Annotation {
            begin: 9000,
            end: 9010,
            ..past_end
        };
        assert_eq!(src.excerpt_for(&fully_out), "");
    }

    #[test]
    fn excerpt_uses_character_offsets() {
        // "Lunedì" is 6 chars but 7 bytes.
        let src = source();
        let ann = Annotation {
            code: "WHEN".into(),
            title: "When".into(),
            begin: 0,
            end: 6,
            text: "Lunedì".into(),
        };
        assert_eq!(src.excerpt_for(&ann), "Lunedì");
    }
}
