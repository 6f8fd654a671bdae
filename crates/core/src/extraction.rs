//! Extraction adapter input types.
//!
//! The conversational extraction service emits zero or more partial updates
//! per turn, each targeting either the subject list, the active environment,
//! or the active visual style. The wire shape is externally tagged:
//! `{"subject": {...}}`, `{"environment": {...}}`, or `{"style": {...}}`.

use serde::{Deserialize, Serialize};

use crate::sheets::SubjectKind;

/// One structured fact update produced by the extraction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedUpdate {
    Subject(SubjectUpdate),
    Environment(EnvironmentUpdate),
    Style(StyleUpdate),
}

/// Partial update for a subject.
///
/// Only the fields that are present are applied (last-write-wins per
/// field); absent fields leave the sheet untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectUpdate {
    /// Identity signal for upsert matching.
    pub name: Option<String>,
    pub kind: Option<SubjectKind>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub pose_hint: Option<String>,
    /// Extraction confidence in `0.0..=1.0`.
    pub confidence: Option<f64>,
}

/// Full replacement for the active environment sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentUpdate {
    pub description: String,
}

/// Full replacement for the active visual style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleUpdate {
    pub description: String,
}
