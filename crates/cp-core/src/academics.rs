//! Academic entities: students, faculty, subjects, and teaching assignments.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// A student record, linked to the user account it logs in with.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Student {
    /// Unique identifier.
    pub id: Uuid,
    /// Permanent registration number (unique institute roll id).
    pub prn: String,
    /// Full name.
    pub name: String,
    /// Email address (unique).
    pub email: String,
    /// Branch, e.g. "CSE".
    pub branch: String,
    /// Current semester, 1 through 8.
    pub semester: i32,
    /// Login account this record belongs to.
    pub user_id: Uuid,
}

impl Student {
    /// Creates a new student record.
    pub fn new(
        prn: &str,
        name: &str,
        email: &str,
        branch: &str,
        semester: i32,
        user_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            prn: prn.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            branch: branch.to_string(),
            semester,
            user_id,
        }
    }
}

/// A faculty member.
///
/// The branch a faculty member teaches in lives on their user row, mirroring
/// how coordinators are scoped; `department` is the descriptive department
/// name shown in feedback targets.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Faculty {
    /// Unique identifier.
    pub id: Uuid,
    /// Full name.
    pub name: String,
    /// Email address (unique).
    pub email: String,
    /// Department name, e.g. "Computer Science and Engineering".
    pub department: String,
    /// Login account this record belongs to.
    pub user_id: Uuid,
}

impl Faculty {
    /// Creates a new faculty record.
    pub fn new(name: &str, email: &str, department: &str, user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            department: department.to_string(),
            user_id,
        }
    }
}

/// Kind of subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Theory,
    Lab,
    Elective,
}

impl SubjectKind {
    /// Returns the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Theory => "theory",
            SubjectKind::Lab => "lab",
            SubjectKind::Elective => "elective",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "theory" => Ok(SubjectKind::Theory),
            "lab" => Ok(SubjectKind::Lab),
            "elective" => Ok(SubjectKind::Elective),
            _ => Err(()),
        }
    }
}

/// A subject taught at the institute.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    /// Unique identifier.
    pub id: Uuid,
    /// Subject name (unique).
    pub name: String,
    /// Theory, lab, or elective.
    pub kind: SubjectKind,
}

impl Subject {
    /// Creates a new subject.
    pub fn new(name: &str, kind: SubjectKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
        }
    }
}

/// Links a faculty member to a subject they teach, for one batch cohort.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeachingAssignment {
    /// Unique identifier.
    pub id: Uuid,
    /// Faculty member.
    pub faculty_id: Uuid,
    /// Subject taught.
    pub subject_id: Uuid,
    /// Batch cohort letter, e.g. "A".
    pub batch: String,
}

impl TeachingAssignment {
    /// Creates a new assignment.
    pub fn new(faculty_id: Uuid, subject_id: Uuid, batch: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            faculty_id,
            subject_id,
            batch: batch.to_string(),
        }
    }
}

/// A student's chosen elective subject.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Elective {
    /// Unique identifier.
    pub id: Uuid,
    /// Student who chose the elective.
    pub student_id: Uuid,
    /// Elective subject.
    pub subject_id: Uuid,
}

impl Elective {
    /// Creates a new elective choice.
    pub fn new(student_id: Uuid, subject_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            subject_id,
        }
    }
}

/// Fallback batch label when no assignment matches.
pub const UNKNOWN_BATCH: &str = "Unknown";

/// Indexed view over teaching assignments.
///
/// Analytics needs to answer "which batch does faculty F teach subject S to"
/// for every feedback entry; this builds the `(faculty, subject) -> batch`
/// index once instead of scanning the assignment list per entry.
#[derive(Debug, Default)]
pub struct TeachingRoster {
    batches: HashMap<(Uuid, Uuid), String>,
}

impl TeachingRoster {
    /// Builds a roster index from assignment rows.
    pub fn from_assignments(assignments: &[TeachingAssignment]) -> Self {
        let batches = assignments
            .iter()
            .map(|a| ((a.faculty_id, a.subject_id), a.batch.clone()))
            .collect();
        Self { batches }
    }

    /// Looks up the batch for a (faculty, subject) pair.
    pub fn batch_for(&self, faculty_id: Uuid, subject_id: Uuid) -> Option<&str> {
        self.batches
            .get(&(faculty_id, subject_id))
            .map(String::as_str)
    }

    /// Like [`batch_for`](Self::batch_for) but falls back to `"Unknown"`.
    pub fn batch_or_unknown(&self, faculty_id: Uuid, subject_id: Uuid) -> &str {
        self.batch_for(faculty_id, subject_id).unwrap_or(UNKNOWN_BATCH)
    }

    /// Number of indexed assignments.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
