//! Prompt assembly for image and video generation.
//!
//! Renders a [`ConsistencyState`] into provider-ready prompt strings at two
//! detail levels. Reference (still image) prompts are one-shot, so they
//! carry full detail with no hard cap. Video prompts are issued repeatedly
//! under a hard provider character budget, so assembly is deterministic and
//! degrades in a fixed order: compression passes first, then whole subjects
//! dropped lowest confidence first (ties broken by insertion order), then
//! the environment, then the style, then a word-boundary truncation as the
//! final guard.
//!
//! Prompt order matters for model attention: style > subjects > environment.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::error::CoreError;
use crate::sheets::{ConsistencyState, SubjectSheet};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Hard character budget for video prompts.
pub const VIDEO_PROMPT_BUDGET: usize = 800;

/// Background phrase appended to reference prompts so the subject is
/// cleanly isolated.
const REFERENCE_BACKGROUND: &str = "plain white background";

/// Fixed suffix steering reference generations toward a usable sheet.
const REFERENCE_SUFFIX: &str = "clear lighting, full visibility, reference sheet style";

/// Filler phrases removed when a video prompt runs over budget.
/// Applied in order; the order is part of the deterministic contract.
static FILLER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bvery\s+",
        r"(?i)\breally\s+",
        r"(?i)\bextremely\s+",
        r"(?i)\bquite\s+",
        r"(?i)\bsomewhat\s+",
        r"(?i)\ba bit\s+",
        r"(?i)\bslightly\s+",
        r"(?i)\bin the style of\b",
        r"(?i)\bwith a\s+",
        r"(?i)\bthat is\s+",
        r"(?i)\bwhich is\s+",
        r"(?i)\band also\b",
        r"(?i)\bas well as\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Term abbreviations applied as a later compression pass.
static ABBREV_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\bbackground\b", "bg"),
        (r"(?i)\bforeground\b", "fg"),
        (r"(?i)\bcharacter\b", "char"),
        (r"(?i)\benvironment\b", "env"),
        (r"(?i)\bphotorealistic\b", "photoreal"),
        (r"(?i)\bhigh quality\b", "HQ"),
        (r"(?i)\bhigh resolution\b", "hi-res"),
        (r"(?i)\bcinematic lighting\b", "cinema light"),
        (r"(?i)\bprofessional\b", "pro"),
        (r"(?i)\bdetailed\b", "detail"),
    ]
    .iter()
    .map(|(p, r)| (Regex::new(p).expect("valid regex"), *r))
    .collect()
});

static COMMA_SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*,\s*").expect("valid regex"));
static REPEATED_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",+").expect("valid regex"));
static EMPTY_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*,").expect("valid regex"));
static LEADING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*,\s*").expect("valid regex"));

// ---------------------------------------------------------------------------
// Reference prompts (full detail)
// ---------------------------------------------------------------------------

/// Assemble a full-detail prompt for generating a subject's reference image.
///
/// Combines, in order: the active style, the subject's canonical
/// description, the pose (the `pose` override if given, else the sheet's
/// `pose_hint`), the active environment, a clean background phrase, and a
/// reference-sheet suffix. No length cap: still-image generation is a
/// one-shot, high-fidelity step where verbosity is affordable.
pub fn assemble_reference_prompt(
    state: &ConsistencyState,
    subject_id: Uuid,
    pose: Option<&str>,
) -> Result<String, CoreError> {
    let sheet = state
        .subject_by_id(subject_id)
        .ok_or(CoreError::NotFound {
            entity: "Subject",
            id: subject_id.to_string(),
        })?;

    let mut parts: Vec<&str> = Vec::new();

    if let Some(style) = &state.style {
        parts.push(&style.description);
    }
    if let Some(block) = subject_phrase(sheet) {
        parts.push(block);
    }
    if let Some(pose) = pose.or(sheet.pose_hint.as_deref()) {
        parts.push(pose);
    }
    if let Some(environment) = &state.environment {
        parts.push(&environment.description);
    }
    parts.push(REFERENCE_BACKGROUND);
    parts.push(REFERENCE_SUFFIX);

    Ok(parts.join(", "))
}

// ---------------------------------------------------------------------------
// Video prompts (compressed, budgeted)
// ---------------------------------------------------------------------------

/// Assemble a compressed video prompt for the given subjects.
///
/// Always returns a prompt of at most [`VIDEO_PROMPT_BUDGET`] characters.
/// Subjects are ranked by confidence descending with ties broken by
/// insertion order; unknown ids are skipped. When the joined prompt exceeds
/// the budget, compression passes run first, then subjects are dropped from
/// the bottom of the ranking until only one remains, then the environment,
/// then the style. A last-resort word-boundary truncation guarantees the
/// budget even when a single description alone exceeds it.
pub fn assemble_video_prompt(
    state: &ConsistencyState,
    subject_ids: &[Uuid],
    include_environment: bool,
) -> String {
    let mut subject_parts: Vec<String> = ranked_subjects(state, subject_ids)
        .into_iter()
        .filter_map(|sheet| subject_phrase(sheet).map(str::to_string))
        .collect();

    let mut style_part = state.style.as_ref().map(|s| s.description.clone());
    let mut env_part = if include_environment {
        state.environment.as_ref().map(|e| e.description.clone())
    } else {
        None
    };

    loop {
        // Recompute from pristine parts each round so earlier compression
        // attempts do not leak into a prompt that now fits without them.
        let joined = join_parts(style_part.as_deref(), &subject_parts, env_part.as_deref());
        let prompt = compress_to_budget(joined, VIDEO_PROMPT_BUDGET);
        if char_len(&prompt) <= VIDEO_PROMPT_BUDGET {
            return prompt;
        }
        if subject_parts.len() > 1 {
            subject_parts.pop();
        } else if env_part.is_some() {
            env_part = None;
        } else if style_part.is_some() {
            style_part = None;
        } else {
            return truncate_at_word_boundary(&prompt, VIDEO_PROMPT_BUDGET);
        }
    }
}

/// Per-component character counts for a prospective video prompt.
///
/// Computed before any compression or truncation; useful for planning and
/// for debugging budget pressure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptEstimate {
    pub style: usize,
    pub subjects: usize,
    pub environment: usize,
    pub separators: usize,
    pub total: usize,
}

/// Estimate the pre-compression length of a video prompt.
pub fn estimate_video_prompt(
    state: &ConsistencyState,
    subject_ids: &[Uuid],
    include_environment: bool,
) -> PromptEstimate {
    let style = state
        .style
        .as_ref()
        .map(|s| char_len(&s.description))
        .unwrap_or(0);
    let subject_phrases: Vec<&str> = ranked_subjects(state, subject_ids)
        .into_iter()
        .filter_map(subject_phrase)
        .collect();
    let subjects = subject_phrases.iter().map(|p| char_len(p)).sum();
    let environment = if include_environment {
        state
            .environment
            .as_ref()
            .map(|e| char_len(&e.description))
            .unwrap_or(0)
    } else {
        0
    };

    let mut part_count = subject_phrases.len();
    if style > 0 {
        part_count += 1;
    }
    if environment > 0 {
        part_count += 1;
    }
    let separators = part_count.saturating_sub(1) * 2;

    PromptEstimate {
        style,
        subjects,
        environment,
        separators,
        total: style + subjects + environment + separators,
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// The minimal distinguishing phrase for a subject: its canonical
/// description, falling back to its name.
fn subject_phrase(sheet: &SubjectSheet) -> Option<&str> {
    sheet
        .description
        .as_deref()
        .or(sheet.name.as_deref())
        .filter(|s| !s.is_empty())
}

/// Resolve the requested subject ids against the state and rank them by
/// confidence descending. The sort is stable, so equal confidences keep
/// their insertion order and the later insertion is dropped first.
fn ranked_subjects<'a>(state: &'a ConsistencyState, subject_ids: &[Uuid]) -> Vec<&'a SubjectSheet> {
    let mut subjects: Vec<&SubjectSheet> = state
        .subjects
        .iter()
        .filter(|s| subject_ids.contains(&s.id))
        .collect();
    subjects.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    subjects
}

fn join_parts(style: Option<&str>, subjects: &[String], environment: Option<&str>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(style) = style {
        parts.push(style);
    }
    for subject in subjects {
        parts.push(subject);
    }
    if let Some(environment) = environment {
        parts.push(environment);
    }
    parts.join(", ")
}

/// Count characters the way provider budgets do (Unicode scalars, not bytes).
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Apply the compression ladder until the prompt fits or the passes are
/// exhausted: whitespace normalization, filler-phrase removal, term
/// abbreviation. Each pass is skipped once the prompt is under budget.
fn compress_to_budget(prompt: String, budget: usize) -> String {
    if char_len(&prompt) <= budget {
        return prompt;
    }

    // Pass 1: normalize whitespace and comma spacing.
    let mut prompt = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    prompt = COMMA_SPACING_RE.replace_all(&prompt, ", ").into_owned();
    prompt = REPEATED_COMMA_RE.replace_all(&prompt, ",").into_owned();
    if char_len(&prompt) <= budget {
        return prompt;
    }

    // Pass 2: strip filler phrases.
    for re in FILLER_RES.iter() {
        if char_len(&prompt) <= budget {
            break;
        }
        prompt = re.replace_all(&prompt, "").into_owned();
    }
    prompt = cleanup_separators(prompt);
    if char_len(&prompt) <= budget {
        return prompt;
    }

    // Pass 3: abbreviate common terms.
    for (re, replacement) in ABBREV_RES.iter() {
        if char_len(&prompt) <= budget {
            break;
        }
        prompt = re.replace_all(&prompt, *replacement).into_owned();
    }

    prompt
}

/// Tidy up artifacts left by phrase removal: doubled spaces, doubled or
/// leading commas.
fn cleanup_separators(prompt: String) -> String {
    let prompt = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    let prompt = EMPTY_COMMA_RE.replace_all(&prompt, ",").into_owned();
    LEADING_COMMA_RE.replace_all(&prompt, "").into_owned()
}

/// Truncate a prompt to `budget` characters without ever cutting mid-word.
///
/// Prefers the last comma or period past 70% of the budget, then the last
/// space anywhere, and only hard-cuts a single unbroken token longer than
/// the budget.
fn truncate_at_word_boundary(prompt: &str, budget: usize) -> String {
    if char_len(prompt) <= budget {
        return prompt.to_string();
    }

    let chars: Vec<char> = prompt.chars().collect();
    let head = &chars[..budget];

    let punct_cut = head
        .iter()
        .rposition(|&c| c == ',' || c == '.')
        .filter(|&p| p * 10 > budget * 7);
    let cut = match punct_cut {
        Some(p) => p,
        None => head
            .iter()
            .rposition(|&c| c == ' ')
            .unwrap_or(budget),
    };

    head[..cut]
        .iter()
        .collect::<String>()
        .trim()
        .trim_end_matches([',', '.'])
        .trim_end()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{EnvironmentUpdate, StyleUpdate, SubjectUpdate};
    use crate::store::EntityStore;

    fn store_with(
        subjects: &[(&str, &str, f64)],
        environment: Option<&str>,
        style: Option<&str>,
    ) -> (EntityStore, Vec<Uuid>) {
        let mut store = EntityStore::new(Uuid::new_v4());
        let mut ids = Vec::new();
        for (name, description, confidence) in subjects {
            let sheet = store
                .upsert_subject(SubjectUpdate {
                    name: Some(name.to_string()),
                    description: Some(description.to_string()),
                    confidence: Some(*confidence),
                    ..Default::default()
                })
                .unwrap();
            ids.push(sheet.id);
        }
        if let Some(description) = environment {
            store
                .set_environment(EnvironmentUpdate {
                    description: description.to_string(),
                })
                .unwrap();
        }
        if let Some(description) = style {
            store
                .set_style(StyleUpdate {
                    description: description.to_string(),
                })
                .unwrap();
        }
        (store, ids)
    }

    // -- reference prompts --

    #[test]
    fn reference_prompt_combines_subject_and_environment() {
        let (store, ids) = store_with(
            &[("Avery", "red jacket", 0.9)],
            Some("rooftop at dusk"),
            None,
        );
        let prompt = assemble_reference_prompt(store.state(), ids[0], None).unwrap();

        assert!(prompt.contains("red jacket"));
        assert!(prompt.contains("rooftop at dusk"));
        assert!(prompt.contains(REFERENCE_SUFFIX));
    }

    #[test]
    fn reference_prompt_unknown_subject_is_not_found() {
        let (store, _) = store_with(&[], None, None);
        let err = assemble_reference_prompt(store.state(), Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "Subject", .. }));
    }

    #[test]
    fn reference_prompt_pose_override_beats_pose_hint() {
        let (mut store, ids) = store_with(&[("Avery", "red jacket", 0.9)], None, None);
        store
            .upsert_subject(SubjectUpdate {
                name: Some("Avery".to_string()),
                pose_hint: Some("sitting".to_string()),
                ..Default::default()
            })
            .unwrap();

        let hinted = assemble_reference_prompt(store.state(), ids[0], None).unwrap();
        assert!(hinted.contains("sitting"));

        let overridden =
            assemble_reference_prompt(store.state(), ids[0], Some("front-facing")).unwrap();
        assert!(overridden.contains("front-facing"));
        assert!(!overridden.contains("sitting"));
    }

    #[test]
    fn reference_prompt_leads_with_style() {
        let (store, ids) = store_with(
            &[("Avery", "red jacket", 0.9)],
            None,
            Some("warm cinematic grade"),
        );
        let prompt = assemble_reference_prompt(store.state(), ids[0], None).unwrap();
        assert!(prompt.starts_with("warm cinematic grade"));
    }

    // -- video prompts --

    #[test]
    fn video_prompt_under_budget_keeps_everything_in_order() {
        let (store, ids) = store_with(
            &[("Avery", "red jacket", 0.9), ("Max", "golden retriever", 0.8)],
            Some("rooftop at dusk"),
            Some("warm cinematic grade"),
        );
        let prompt = assemble_video_prompt(store.state(), &ids, true);

        assert_eq!(
            prompt,
            "warm cinematic grade, red jacket, golden retriever, rooftop at dusk"
        );
    }

    #[test]
    fn video_prompt_never_exceeds_budget() {
        let long = "word ".repeat(400); // ~2000 chars of whole words
        let (store, ids) = store_with(&[("Avery", long.trim(), 0.9)], None, None);
        let prompt = assemble_video_prompt(store.state(), &ids, true);

        assert!(char_len(&prompt) <= VIDEO_PROMPT_BUDGET);
        // Word-boundary truncation: the output ends with a complete token.
        assert!(prompt.ends_with("word"));
    }

    #[test]
    fn video_prompt_is_deterministic() {
        let (store, ids) = store_with(
            &[
                ("Avery", &"red jacket and scarf ".repeat(30), 0.9),
                ("Max", &"golden retriever pup ".repeat(30), 0.3),
            ],
            Some("rooftop at dusk"),
            Some("warm cinematic grade"),
        );
        let first = assemble_video_prompt(store.state(), &ids, true);
        let second = assemble_video_prompt(store.state(), &ids, true);
        assert_eq!(first, second);
    }

    #[test]
    fn video_prompt_drops_lowest_confidence_subject_first() {
        let high = "h".repeat(500);
        let low = "l".repeat(500);
        let (store, ids) = store_with(
            &[("Avery", high.as_str(), 0.9), ("Mallory", low.as_str(), 0.3)],
            None,
            None,
        );
        let prompt = assemble_video_prompt(store.state(), &ids, true);

        assert!(prompt.contains(&high));
        assert!(!prompt.contains(&low));
        assert!(char_len(&prompt) <= VIDEO_PROMPT_BUDGET);
    }

    #[test]
    fn video_prompt_breaks_confidence_ties_by_insertion_order() {
        let first = "f".repeat(500);
        let second = "s".repeat(500);
        let (store, ids) = store_with(
            &[("One", first.as_str(), 0.5), ("Two", second.as_str(), 0.5)],
            None,
            None,
        );
        let prompt = assemble_video_prompt(store.state(), &ids, true);

        // Equal confidence: the later insertion is dropped first.
        assert!(prompt.contains(&first));
        assert!(!prompt.contains(&second));
    }

    #[test]
    fn video_prompt_drops_environment_and_style_only_after_subjects() {
        let subject = "s".repeat(700);
        let environment = "e".repeat(200);
        let style = "t".repeat(100);
        let (store, ids) = store_with(
            &[("Avery", subject.as_str(), 0.9)],
            Some(environment.as_str()),
            Some(style.as_str()),
        );
        let prompt = assemble_video_prompt(store.state(), &ids, true);

        // The last subject survives; environment and style give way.
        assert!(prompt.contains(&subject));
        assert!(!prompt.contains(&environment));
        assert!(!prompt.contains(&style));
    }

    #[test]
    fn video_prompt_compression_can_rescue_a_subject_from_dropping() {
        // Two subjects that only fit once filler words are stripped.
        let padded = format!("{} very tall and really quite distinguished", "a".repeat(380));
        let second = format!("{} extremely sleek", "b".repeat(380));
        let (store, ids) = store_with(
            &[("One", padded.as_str(), 0.9), ("Two", second.as_str(), 0.8)],
            None,
            None,
        );
        let prompt = assemble_video_prompt(store.state(), &ids, true);

        assert!(char_len(&prompt) <= VIDEO_PROMPT_BUDGET);
        // Both subjects survive because compression got under the cap.
        assert!(prompt.contains(&"a".repeat(380)));
        assert!(prompt.contains(&"b".repeat(380)));
        assert!(!prompt.contains("very "));
        assert!(!prompt.contains("extremely "));
    }

    #[test]
    fn video_prompt_skips_unknown_subject_ids() {
        let (store, ids) = store_with(&[("Avery", "red jacket", 0.9)], None, None);
        let mut requested = ids.clone();
        requested.push(Uuid::new_v4());

        let prompt = assemble_video_prompt(store.state(), &requested, true);
        assert_eq!(prompt, "red jacket");
    }

    #[test]
    fn video_prompt_can_exclude_environment() {
        let (store, ids) = store_with(
            &[("Avery", "red jacket", 0.9)],
            Some("rooftop at dusk"),
            None,
        );
        let prompt = assemble_video_prompt(store.state(), &ids, false);
        assert_eq!(prompt, "red jacket");
    }

    #[test]
    fn video_prompt_uses_name_when_description_is_missing() {
        let mut store = EntityStore::new(Uuid::new_v4());
        let sheet = store
            .upsert_subject(SubjectUpdate {
                name: Some("Avery".to_string()),
                ..Default::default()
            })
            .unwrap();
        let prompt = assemble_video_prompt(store.state(), &[sheet.id], true);
        assert_eq!(prompt, "Avery");
    }

    // -- estimates --

    #[test]
    fn estimate_counts_components_and_separators() {
        let (store, ids) = store_with(
            &[("Avery", "red jacket", 0.9)],
            Some("rooftop at dusk"),
            Some("warm grade"),
        );
        let estimate = estimate_video_prompt(store.state(), &ids, true);

        assert_eq!(estimate.style, 10);
        assert_eq!(estimate.subjects, 10);
        assert_eq!(estimate.environment, 15);
        assert_eq!(estimate.separators, 4);
        assert_eq!(estimate.total, 39);
        // The estimate matches the assembled prompt when nothing is dropped.
        let prompt = assemble_video_prompt(store.state(), &ids, true);
        assert_eq!(char_len(&prompt), estimate.total);
    }

    // -- truncation helper --

    #[test]
    fn truncation_prefers_late_punctuation() {
        let prompt = format!("{}, tail words here", "x".repeat(700));
        let cut = truncate_at_word_boundary(&prompt, 710);
        assert_eq!(cut, "x".repeat(700));
    }

    #[test]
    fn truncation_hard_cuts_single_unbroken_token() {
        let prompt = "y".repeat(900);
        let cut = truncate_at_word_boundary(&prompt, 100);
        assert_eq!(char_len(&cut), 100);
    }
}
