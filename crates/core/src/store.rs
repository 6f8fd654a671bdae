//! The entity store: narrow, named mutations over a session's
//! [`ConsistencyState`].
//!
//! Every write from the extraction flow or the generation flow goes through
//! one of the operations here. Previously confirmed facts are only lost by
//! explicit overwrite: subject updates are last-write-wins per field, and
//! environment/style replacement swaps field contents wholesale while
//! preserving the sheet's id.

use chrono::Utc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::extraction::{EnvironmentUpdate, ExtractedUpdate, StyleUpdate, SubjectUpdate};
use crate::sheets::{ConsistencyState, EnvironmentSheet, SubjectSheet, VisualStyle};

/// Owns and mutates the consistency state for one session.
pub struct EntityStore {
    state: ConsistencyState,
}

impl EntityStore {
    /// Create an empty store for a new session.
    pub fn new(session_id: Uuid) -> Self {
        Self {
            state: ConsistencyState::new(session_id, Utc::now()),
        }
    }

    /// Borrow the current state for reading (prompt assembly, lookups).
    pub fn state(&self) -> &ConsistencyState {
        &self.state
    }

    /// Clone the current state as an immutable snapshot (API responses,
    /// debugging/replay serialization).
    pub fn snapshot(&self) -> ConsistencyState {
        self.state.clone()
    }

    /// Apply one extraction update, dispatching to the matching operation.
    pub fn apply(&mut self, update: ExtractedUpdate) -> Result<(), CoreError> {
        match update {
            ExtractedUpdate::Subject(u) => {
                self.upsert_subject(u)?;
            }
            ExtractedUpdate::Environment(u) => {
                self.set_environment(u)?;
            }
            ExtractedUpdate::Style(u) => {
                self.set_style(u)?;
            }
        }
        Ok(())
    }

    /// Create or update a subject from a partial extraction update.
    ///
    /// Matching is by name, case-insensitively. Exactly one match updates
    /// that sheet (only the fields present in the update are overwritten);
    /// zero matches, multiple matches, or a missing name create a new sheet
    /// with a fresh id. Ambiguity favors duplication over fusing two
    /// different subjects into one.
    pub fn upsert_subject(&mut self, update: SubjectUpdate) -> Result<SubjectSheet, CoreError> {
        if let Some(confidence) = update.confidence {
            validate_confidence(confidence)?;
        }

        let now = Utc::now();
        let matched = match update.name.as_deref() {
            Some(name) => {
                let mut matches = self
                    .state
                    .subjects
                    .iter_mut()
                    .filter(|s| {
                        s.name
                            .as_deref()
                            .is_some_and(|n| n.eq_ignore_ascii_case(name))
                    })
                    .collect::<Vec<_>>();
                if matches.len() == 1 {
                    Some(matches.remove(0))
                } else {
                    None
                }
            }
            None => None,
        };

        let sheet = match matched {
            Some(sheet) => {
                if let Some(name) = update.name {
                    sheet.name = Some(name);
                }
                if let Some(kind) = update.kind {
                    sheet.kind = Some(kind);
                }
                if let Some(role) = update.role {
                    sheet.role = Some(role);
                }
                if let Some(description) = update.description {
                    sheet.description = Some(description);
                }
                if let Some(pose_hint) = update.pose_hint {
                    sheet.pose_hint = Some(pose_hint);
                }
                if let Some(confidence) = update.confidence {
                    sheet.confidence = confidence;
                }
                sheet.last_updated_at = now;
                sheet.clone()
            }
            None => {
                let sheet = SubjectSheet {
                    id: Uuid::new_v4(),
                    name: update.name,
                    kind: update.kind,
                    role: update.role,
                    description: update.description,
                    pose_hint: update.pose_hint,
                    reference_image_url: None,
                    confidence: update.confidence.unwrap_or(0.0),
                    last_updated_at: now,
                };
                self.state.subjects.push(sheet.clone());
                sheet
            }
        };

        self.touch();
        Ok(sheet)
    }

    /// Replace the active environment sheet, creating one if absent.
    ///
    /// A full overwrite of the description; the sheet's id is preserved
    /// once assigned.
    pub fn set_environment(
        &mut self,
        update: EnvironmentUpdate,
    ) -> Result<EnvironmentSheet, CoreError> {
        validate_description("Environment", &update.description)?;

        let now = Utc::now();
        let sheet = match self.state.environment.as_mut() {
            Some(sheet) => {
                sheet.description = update.description;
                sheet.last_updated_at = now;
                sheet.clone()
            }
            None => {
                let sheet = EnvironmentSheet {
                    id: Uuid::new_v4(),
                    description: update.description,
                    last_updated_at: now,
                };
                self.state.environment = Some(sheet.clone());
                sheet
            }
        };

        self.touch();
        Ok(sheet)
    }

    /// Replace the active visual style, creating one if absent.
    pub fn set_style(&mut self, update: StyleUpdate) -> Result<VisualStyle, CoreError> {
        validate_description("Style", &update.description)?;

        let now = Utc::now();
        let sheet = match self.state.style.as_mut() {
            Some(sheet) => {
                sheet.description = update.description;
                sheet.last_updated_at = now;
                sheet.clone()
            }
            None => {
                let sheet = VisualStyle {
                    id: Uuid::new_v4(),
                    description: update.description,
                    last_updated_at: now,
                };
                self.state.style = Some(sheet.clone());
                sheet
            }
        };

        self.touch();
        Ok(sheet)
    }

    /// Record a generated reference image URL on a subject.
    ///
    /// This is the only write path from the generation flow back into the
    /// consistency state. Calling it again for the same subject is explicit
    /// regeneration and overwrites the previous URL.
    pub fn set_reference_url(
        &mut self,
        subject_id: Uuid,
        url: String,
    ) -> Result<SubjectSheet, CoreError> {
        let sheet = self
            .state
            .subjects
            .iter_mut()
            .find(|s| s.id == subject_id)
            .ok_or(CoreError::NotFound {
                entity: "Subject",
                id: subject_id.to_string(),
            })?;

        sheet.reference_image_url = Some(url);
        sheet.last_updated_at = Utc::now();
        let sheet = sheet.clone();

        self.touch();
        Ok(sheet)
    }

    // ---- private helpers ----

    /// Bump the version counter and aggregate timestamp after a mutation.
    fn touch(&mut self) {
        self.state.version += 1;
        self.state.updated_at = Utc::now();
    }
}

/// Validate an extraction confidence value.
fn validate_confidence(confidence: f64) -> Result<(), CoreError> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err(CoreError::Validation(format!(
            "Confidence must be between 0.0 and 1.0 (got {confidence})"
        )));
    }
    Ok(())
}

/// Validate a sheet description: must be non-empty.
fn validate_description(entity: &str, description: &str) -> Result<(), CoreError> {
    if description.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{entity} description must not be empty"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
