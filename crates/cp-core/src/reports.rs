//! Coordinator CSV reports.
//!
//! Every report is a plain CSV string assembled from rows the caller has
//! already loaded for one branch. Quoting follows RFC 4180: fields containing
//! commas, quotes, or line breaks are wrapped in double quotes with inner
//! quotes doubled.

use crate::academics::{Student, TeachingRoster};
use crate::analytics::UNKNOWN_LABEL;
use crate::feedback::{FeedbackEntry, Remark};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Id-to-label lookups shared by the feedback reports.
///
/// Built once per request from the branch's rows; every resolver falls back
/// to `"Unknown"` so a dangling id never aborts a download.
#[derive(Debug, Default)]
pub struct ReportLookups {
    /// Batch resolution for (faculty, subject) pairs.
    pub roster: TeachingRoster,
    /// Subject id to subject name.
    pub subject_names: HashMap<Uuid, String>,
    /// Faculty id to faculty name.
    pub faculty_names: HashMap<Uuid, String>,
    /// Question id to client key (`Q1`..`Qn`).
    pub question_keys: HashMap<Uuid, String>,
    /// Student id to PRN.
    pub student_prns: HashMap<Uuid, String>,
}

impl ReportLookups {
    fn faculty(&self, id: Option<Uuid>) -> &str {
        id.and_then(|id| self.faculty_names.get(&id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    fn subject(&self, id: Option<Uuid>) -> &str {
        id.and_then(|id| self.subject_names.get(&id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    fn batch(&self, entry: &FeedbackEntry) -> &str {
        match (entry.faculty_id, entry.subject_id) {
            (Some(faculty_id), Some(subject_id)) => {
                self.roster.batch_or_unknown(faculty_id, subject_id)
            }
            _ => UNKNOWN_LABEL,
        }
    }

    fn question_key(&self, id: Uuid) -> &str {
        self.question_keys
            .get(&id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    fn prn(&self, id: Option<Uuid>) -> &str {
        id.and_then(|id| self.student_prns.get(&id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }
}

/// Students of the branch who have not submitted faculty feedback yet.
///
/// `submitted` is the distinct set of student ids with a valid
/// faculty-campaign entry.
pub fn outstanding_students_csv(students: &[Student], submitted: &HashSet<Uuid>) -> String {
    let mut csv = String::new();
    csv.push_str("PRN,Name,Email,Branch,Semester\n");

    for student in students {
        if submitted.contains(&student.id) {
            continue;
        }
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            escape_csv_field(&student.prn),
            escape_csv_field(&student.name),
            escape_csv_field(&student.email),
            escape_csv_field(&student.branch),
            student.semester,
        ));
    }

    csv
}

/// Every valid faculty-campaign answer for the branch, without student
/// identity.
pub fn branch_feedback_csv(entries: &[FeedbackEntry], lookups: &ReportLookups) -> String {
    let mut csv = String::new();
    csv.push_str("Faculty,Subject,Batch,Question,Answer,Submitted At\n");

    for entry in entries {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            escape_csv_field(lookups.faculty(entry.faculty_id)),
            escape_csv_field(lookups.subject(entry.subject_id)),
            escape_csv_field(lookups.batch(entry)),
            escape_csv_field(lookups.question_key(entry.question_id)),
            escape_csv_field(&entry.answer),
            format_timestamp(entry.submitted_at),
        ));
    }

    csv
}

/// Anonymous remarks for the branch.
pub fn remarks_csv(remarks: &[Remark]) -> String {
    let mut csv = String::new();
    csv.push_str("Remark,Branch,Submitted At\n");

    for remark in remarks {
        csv.push_str(&format!(
            "{},{},{}\n",
            escape_csv_field(&remark.body),
            escape_csv_field(&remark.branch),
            format_timestamp(remark.submitted_at),
        ));
    }

    csv
}

/// Per (faculty, subject, batch) average ratings for the branch.
///
/// Non-numeric answers are skipped; rows come back sorted by faculty,
/// subject, then batch.
pub fn consolidated_feedback_csv(entries: &[FeedbackEntry], lookups: &ReportLookups) -> String {
    let mut groups: BTreeMap<(String, String, String), (f64, u64)> = BTreeMap::new();

    for entry in entries {
        let Some(rating) = entry.rating() else {
            continue;
        };
        let key = (
            lookups.faculty(entry.faculty_id).to_string(),
            lookups.subject(entry.subject_id).to_string(),
            lookups.batch(entry).to_string(),
        );
        let group = groups.entry(key).or_insert((0.0, 0));
        group.0 += rating;
        group.1 += 1;
    }

    let mut csv = String::new();
    csv.push_str("Faculty,Subject,Batch,Average Rating,Responses\n");

    for ((faculty, subject, batch), (sum, count)) in groups {
        csv.push_str(&format!(
            "{},{},{},{:.2},{}\n",
            escape_csv_field(&faculty),
            escape_csv_field(&subject),
            escape_csv_field(&batch),
            sum / count as f64,
            count,
        ));
    }

    csv
}

/// The branch feedback report with the submitting student's PRN prepended.
pub fn complete_feedback_csv(entries: &[FeedbackEntry], lookups: &ReportLookups) -> String {
    let mut csv = String::new();
    csv.push_str("PRN,Faculty,Subject,Batch,Question,Answer,Submitted At\n");

    for entry in entries {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            escape_csv_field(lookups.prn(entry.student_id)),
            escape_csv_field(lookups.faculty(entry.faculty_id)),
            escape_csv_field(lookups.subject(entry.subject_id)),
            escape_csv_field(lookups.batch(entry)),
            escape_csv_field(lookups.question_key(entry.question_id)),
            escape_csv_field(&entry.answer),
            format_timestamp(entry.submitted_at),
        ));
    }

    csv
}

/// The header row roster imports expect.
pub const ROSTER_CSV_HEADER: &str = "PRN,Name,Email,Branch,Semester";

/// Import template: the header plus one sample row on the given domain.
pub fn roster_template_csv(domain: &str) -> String {
    format!(
        "{}\nPRNCSE101,Asha Rao,asha.rao.btech23@{},CSE,4\n",
        ROSTER_CSV_HEADER, domain
    )
}

/// The branch's current roster in template columns, ready for re-import.
pub fn roster_export_csv(students: &[Student]) -> String {
    let mut csv = String::new();
    csv.push_str(ROSTER_CSV_HEADER);
    csv.push('\n');

    for student in students {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            escape_csv_field(&student.prn),
            escape_csv_field(&student.name),
            escape_csv_field(&student.email),
            escape_csv_field(&student.branch),
            student.semester,
        ));
    }

    csv
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Escapes a field for CSV output.
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
