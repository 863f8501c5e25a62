//! Session context: the immutable inputs a quiz session works over.

use std::sync::Arc;

use crate::models::activity::{ActivityProfile, ActivityType};
use crate::models::annotation::{AnnotationSet, SourceText};
use crate::services::language::Language;

/// Everything fixed at session start: the extracted text, its annotation
/// table and the chosen activity. Shared by reference across the workflow.
#[derive(Clone)]
pub struct SessionCtx {
    pub annotations: Arc<AnnotationSet>,
    pub source: Arc<SourceText>,
    pub activity: ActivityType,
}

impl SessionCtx {
    pub fn new(annotations: AnnotationSet, source: SourceText, activity: ActivityType) -> Self {
        Self {
            annotations: Arc::new(annotations),
            source: Arc::new(source),
            activity,
        }
    }

    pub fn language(&self) -> Language {
        self.source.language
    }

    pub fn profile(&self) -> &'static ActivityProfile {
        self.activity.profile()
    }
}
