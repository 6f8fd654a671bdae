//! Sheet types for visual consistency tracking.
//!
//! A session accumulates [`SubjectSheet`]s plus at most one active
//! [`EnvironmentSheet`] and one active [`VisualStyle`]. [`ConsistencyState`]
//! is the aggregate root for a session; it is only ever mutated through
//! [`crate::store::EntityStore`], never by direct field assignment from
//! other components.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// What kind of thing a subject is.
///
/// Does not affect store or assembler behaviour; carried so downstream
/// consumers can phrase prompts and UI labels appropriately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Human,
    Animal,
    Object,
}

/// One recurring character, person, or object that must look identical
/// across every generated frame and clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectSheet {
    /// Stable identifier, assigned when the subject is first extracted.
    /// Immutable for the lifetime of the session.
    pub id: Uuid,
    /// Human-readable name, used for case-insensitive upsert matching.
    pub name: Option<String>,
    pub kind: Option<SubjectKind>,
    /// Role in the video (protagonist, product, prop).
    pub role: Option<String>,
    /// Canonical appearance text: clothing, build, distinguishing features.
    /// Overwritten whole by later extraction, never concatenated.
    pub description: Option<String>,
    pub pose_hint: Option<String>,
    /// Set once a reference image has been generated. Never cleared except
    /// by explicit regeneration.
    pub reference_image_url: Option<String>,
    /// Extraction confidence in `0.0..=1.0`. Ranks subjects when a video
    /// prompt must be truncated.
    pub confidence: f64,
    pub last_updated_at: Timestamp,
}

/// The recurring setting: location, lighting, camera framing conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSheet {
    pub id: Uuid,
    pub description: String,
    pub last_updated_at: Timestamp,
}

/// Global aesthetic constraints: palette, rendering style, mood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualStyle {
    pub id: Uuid,
    pub description: String,
    pub last_updated_at: Timestamp,
}

/// Complete consistency state for one session.
///
/// Subjects are kept in insertion order; that order is the documented
/// tie-breaker when the prompt assembler ranks subjects by confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyState {
    pub session_id: Uuid,
    pub subjects: Vec<SubjectSheet>,
    pub environment: Option<EnvironmentSheet>,
    pub style: Option<VisualStyle>,
    /// Bumped on every mutation, for debugging and replay.
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConsistencyState {
    /// Create an empty state for a new session.
    pub fn new(session_id: Uuid, now: Timestamp) -> Self {
        Self {
            session_id,
            subjects: Vec::new(),
            environment: None,
            style: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Find a subject by id.
    pub fn subject_by_id(&self, id: Uuid) -> Option<&SubjectSheet> {
        self.subjects.iter().find(|s| s.id == id)
    }

    /// Find a subject by name, case-insensitively.
    pub fn subject_by_name(&self, name: &str) -> Option<&SubjectSheet> {
        self.subjects.iter().find(|s| {
            s.name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }
}
