//! Aggregation over submitted feedback: participation stats, rating
//! breakdowns, and text-remark collection.
//!
//! Everything here is a pure function over rows the caller has already
//! loaded, so the same logic backs both the API responses and the CSV
//! reports.

use crate::academics::TeachingRoster;
use crate::feedback::FeedbackEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;
use uuid::Uuid;

/// Label used when a subject, batch, or branch cannot be resolved.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Submission counts for one campaign within one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParticipationStats {
    /// Distinct students who submitted.
    pub submitted: u64,
    /// Students expected to submit.
    pub total: u64,
    /// `round(100 * submitted / total)`, 0 when total is 0.
    pub percentage: u32,
}

/// Computes participation with the rounded-percentage convention.
pub fn participation(submitted: u64, total: u64) -> ParticipationStats {
    let percentage = if total > 0 {
        ((submitted as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };
    ParticipationStats {
        submitted,
        total,
        percentage,
    }
}

/// The coordinator dashboard numbers for one branch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BranchOverview {
    /// Branch code, e.g. "CSE".
    pub branch: String,
    /// Students enrolled in the branch.
    pub total_students: u64,
    /// Faculty members whose user row carries this branch.
    pub total_faculty: u64,
    /// Subjects taught by the branch's faculty.
    pub total_subjects: u64,
    /// Faculty-campaign participation.
    pub faculty_feedback: ParticipationStats,
    /// Curriculum-campaign participation.
    pub curriculum_feedback: ParticipationStats,
    /// Students yet to submit faculty feedback.
    pub pending_submissions: u64,
}

impl BranchOverview {
    /// Assembles the overview from raw counts.
    ///
    /// The expected total for both campaigns is the branch's student count:
    /// each student submits one form per campaign, not one per faculty
    /// member.
    pub fn assemble(
        branch: &str,
        total_students: u64,
        total_faculty: u64,
        total_subjects: u64,
        faculty_submitted: u64,
        curriculum_submitted: u64,
    ) -> Self {
        let faculty_feedback = participation(faculty_submitted, total_students);
        let curriculum_feedback = participation(curriculum_submitted, total_students);
        let pending_submissions = faculty_feedback
            .total
            .saturating_sub(faculty_feedback.submitted);
        Self {
            branch: branch.to_string(),
            total_students,
            total_faculty,
            total_subjects,
            faculty_feedback,
            curriculum_feedback,
            pending_submissions,
        }
    }
}

/// Average rating for one (subject, batch, branch) group.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingBreakdownRow {
    /// Subject name.
    pub subject: String,
    /// Batch cohort the faculty member teaches the subject to.
    pub batch: String,
    /// Branch of the submitting students.
    pub branch: String,
    /// Mean of the numeric answers in the group.
    pub average: f64,
    /// Number of answers in the group.
    pub responses: u64,
}

/// Groups numeric answers by (subject, batch, branch) and averages them.
///
/// The batch comes from the faculty member's teaching assignment and the
/// branch from the submitting student; either falls back to `"Unknown"` when
/// the lookup misses. Answers that do not parse as a number are skipped.
/// Rows come back sorted by subject, then batch, then branch.
pub fn aggregate_faculty_ratings(
    entries: &[FeedbackEntry],
    roster: &TeachingRoster,
    subject_names: &HashMap<Uuid, String>,
    student_branches: &HashMap<Uuid, String>,
) -> Vec<RatingBreakdownRow> {
    let mut groups: BTreeMap<(String, String, String), (f64, u64)> = BTreeMap::new();

    for entry in entries {
        let Some(rating) = entry.rating() else {
            continue;
        };

        let (subject, batch, branch) = entry_labels(entry, roster, subject_names, student_branches);
        let group = groups.entry((subject, batch, branch)).or_insert((0.0, 0));
        group.0 += rating;
        group.1 += 1;
    }

    groups
        .into_iter()
        .map(|((subject, batch, branch), (sum, count))| RatingBreakdownRow {
            subject,
            batch,
            branch,
            average: sum / count as f64,
            responses: count,
        })
        .collect()
}

/// A free-text answer surfaced on remark views.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubjectRemarkRow {
    /// Entry id, so clients can key lists.
    pub id: Uuid,
    /// Subject name.
    pub subject: String,
    /// Batch cohort.
    pub batch: String,
    /// Submitting student's branch.
    pub branch: String,
    /// The text answer.
    pub comment: String,
    /// When it was submitted.
    pub submitted_at: DateTime<Utc>,
}

/// Pulls the free-text answers out of a set of entries, newest first.
pub fn collect_text_remarks(
    entries: &[FeedbackEntry],
    roster: &TeachingRoster,
    subject_names: &HashMap<Uuid, String>,
    student_branches: &HashMap<Uuid, String>,
) -> Vec<SubjectRemarkRow> {
    let mut rows: Vec<SubjectRemarkRow> = entries
        .iter()
        .filter(|entry| entry.is_textual())
        .map(|entry| {
            let (subject, batch, branch) =
                entry_labels(entry, roster, subject_names, student_branches);
            SubjectRemarkRow {
                id: entry.id,
                subject,
                batch,
                branch,
                comment: entry.answer.clone(),
                submitted_at: entry.submitted_at,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    rows
}

fn entry_labels(
    entry: &FeedbackEntry,
    roster: &TeachingRoster,
    subject_names: &HashMap<Uuid, String>,
    student_branches: &HashMap<Uuid, String>,
) -> (String, String, String) {
    let subject = entry
        .subject_id
        .and_then(|id| subject_names.get(&id).cloned())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

    let batch = match (entry.faculty_id, entry.subject_id) {
        (Some(faculty_id), Some(subject_id)) => {
            roster.batch_or_unknown(faculty_id, subject_id).to_string()
        }
        _ => UNKNOWN_LABEL.to_string(),
    };

    let branch = entry
        .student_id
        .and_then(|id| student_branches.get(&id).cloned())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

    (subject, batch, branch)
}
