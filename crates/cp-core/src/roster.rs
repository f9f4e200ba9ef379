//! Student roster CSV import parsing.
//!
//! Coordinators upload the roster as `PRN,Name,Email,Branch,Semester` lines.
//! Parsing is line-oriented and forgiving: blank lines and the header are
//! skipped, and bad rows are collected as per-line errors instead of aborting
//! the upload.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

/// Semesters run 1 through 8.
pub const SEMESTER_MIN: i32 = 1;
pub const SEMESTER_MAX: i32 = 8;

/// One parsed roster line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RosterRow {
    pub prn: String,
    pub name: String,
    pub email: String,
    pub branch: String,
    pub semester: i32,
}

/// A roster line that could not be parsed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RosterRowError {
    /// 1-based line number in the uploaded file.
    pub line: u64,
    /// The offending line (or field) as received.
    pub value: String,
    /// What went wrong.
    pub error: String,
}

/// Outcome of a roster import.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RosterImportReport {
    /// Accounts created.
    pub imported: u64,
    /// Rows whose PRN or email already existed.
    pub skipped: u64,
    /// Rows rejected during parsing or creation.
    pub failed: u64,
    /// Per-line details for everything not imported.
    pub errors: Vec<RosterRowError>,
}

/// Parses roster CSV data into rows plus per-line errors.
///
/// Duplicate PRNs or emails within the same file are rejected on their
/// second occurrence.
pub fn parse_roster_csv(data: &str) -> (Vec<RosterRow>, Vec<RosterRowError>) {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut seen_prns: HashSet<String> = HashSet::new();
    let mut seen_emails: HashSet<String> = HashSet::new();

    for (idx, line_raw) in data.lines().enumerate() {
        let line = (idx + 1) as u64;
        let line_trimmed = line_raw.trim();
        if line_trimmed.is_empty() {
            continue;
        }
        if idx == 0 && line_trimmed.to_ascii_lowercase().starts_with("prn,") {
            continue;
        }

        let cols: Vec<&str> = line_trimmed.split(',').map(|s| s.trim()).collect();
        if cols.len() < 5 {
            errors.push(RosterRowError {
                line,
                value: line_trimmed.to_string(),
                error: "Expected PRN,Name,Email,Branch,Semester".to_string(),
            });
            continue;
        }

        let prn = cols[0].to_string();
        if prn.is_empty() {
            errors.push(RosterRowError {
                line,
                value: line_trimmed.to_string(),
                error: "PRN is required".to_string(),
            });
            continue;
        }

        let name = cols[1].to_string();
        if name.is_empty() {
            errors.push(RosterRowError {
                line,
                value: prn.clone(),
                error: "Name is required".to_string(),
            });
            continue;
        }

        let email = cols[2].to_lowercase();
        if !valid_email_shape(&email) {
            errors.push(RosterRowError {
                line,
                value: cols[2].to_string(),
                error: "Invalid email address".to_string(),
            });
            continue;
        }

        let branch = cols[3].to_string();
        if branch.is_empty() {
            errors.push(RosterRowError {
                line,
                value: prn.clone(),
                error: "Branch is required".to_string(),
            });
            continue;
        }

        let semester = match cols[4].parse::<i32>() {
            Ok(s) if (SEMESTER_MIN..=SEMESTER_MAX).contains(&s) => s,
            _ => {
                errors.push(RosterRowError {
                    line,
                    value: cols[4].to_string(),
                    error: format!(
                        "Semester must be a number between {} and {}",
                        SEMESTER_MIN, SEMESTER_MAX
                    ),
                });
                continue;
            }
        };

        if !seen_prns.insert(prn.clone()) {
            errors.push(RosterRowError {
                line,
                value: prn,
                error: "Duplicate PRN in file".to_string(),
            });
            continue;
        }
        if !seen_emails.insert(email.clone()) {
            errors.push(RosterRowError {
                line,
                value: email,
                error: "Duplicate email in file".to_string(),
            });
            continue;
        }

        rows.push(RosterRow {
            prn,
            name,
            email,
            branch,
            semester,
        });
    }

    (rows, errors)
}

/// Minimal shape check: `local@domain` with a dot in the domain.
fn valid_email_shape(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
