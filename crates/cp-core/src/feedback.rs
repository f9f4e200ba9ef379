//! Feedback campaigns, questions, and submitted entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lowest accepted rating answer.
pub const RATING_MIN: i64 = 1;
/// Highest accepted rating answer (Strongly Agree).
pub const RATING_MAX: i64 = 5;

/// Upper bound on faculty/subject targets in a single student submission.
pub const MAX_FEEDBACK_TARGETS: usize = 5;

/// The three campaign families the application knows about.
///
/// Campaign rows are matched by name fragment rather than a fixed id, so a
/// yearly "Faculty Feedback 2025-26" row is found by the `Faculty` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CampaignKind {
    Faculty,
    Curriculum,
    #[serde(rename = "guest")]
    GuestLecture,
}

impl CampaignKind {
    /// Path/query token for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignKind::Faculty => "faculty",
            CampaignKind::Curriculum => "curriculum",
            CampaignKind::GuestLecture => "guest",
        }
    }

    /// Substring used to locate the campaign row by name.
    pub fn name_fragment(&self) -> &'static str {
        match self {
            CampaignKind::Faculty => "Faculty",
            CampaignKind::Curriculum => "Curriculum",
            CampaignKind::GuestLecture => "Guest",
        }
    }

    /// Human title the seeded campaign name starts with.
    pub fn title(&self) -> &'static str {
        match self {
            CampaignKind::Faculty => "Faculty Feedback",
            CampaignKind::Curriculum => "Curriculum Feedback",
            CampaignKind::GuestLecture => "Guest Lecture Feedback",
        }
    }

    /// The question set served when a campaign has no stored questions.
    pub fn default_questions(&self) -> Vec<(String, QuestionKind)> {
        match self {
            CampaignKind::Faculty => DEFAULT_FACULTY_QUESTIONS
                .iter()
                .map(|q| (q.to_string(), QuestionKind::Rating))
                .collect(),
            CampaignKind::Curriculum => DEFAULT_CURRICULUM_QUESTIONS
                .iter()
                .map(|(q, kind)| (q.to_string(), *kind))
                .collect(),
            CampaignKind::GuestLecture => DEFAULT_GUEST_QUESTIONS
                .iter()
                .map(|q| (q.to_string(), QuestionKind::Rating))
                .collect(),
        }
    }

    /// Default questions in the client-facing `Q1..Qn` shape.
    pub fn default_question_forms(&self) -> Vec<QuestionForm> {
        self.default_questions()
            .into_iter()
            .enumerate()
            .map(|(idx, (text, kind))| QuestionForm {
                id: format!("Q{}", idx + 1),
                text,
                kind,
            })
            .collect()
    }
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CampaignKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "faculty" => Ok(CampaignKind::Faculty),
            "curriculum" => Ok(CampaignKind::Curriculum),
            "guest" | "guest-lecture" | "guestlecture" => Ok(CampaignKind::GuestLecture),
            _ => Err(()),
        }
    }
}

const DEFAULT_FACULTY_QUESTIONS: [&str; 9] = [
    "Instructor was well prepared for the lectures?",
    "Fundamental principles were well emphasized?",
    "Piece of the instruction was given?",
    "Course was fully covered?",
    "Instructor could communicate effectively with the students?",
    "Instructor encouraged questions and cleared doubts?",
    "Instructor could be approached beyond normal lecture hours for assisting students?",
    "All the allotted lectures were held till date?",
    "Writing on the B/Board was visible?",
];

const DEFAULT_CURRICULUM_QUESTIONS: [(&str, QuestionKind); 5] = [
    (
        "I am given enough freedom to contribute my ideas on curriculum design and development.",
        QuestionKind::Rating,
    ),
    (
        "The faculty members/teachers are supported with adequate learning resources",
        QuestionKind::Rating,
    ),
    (
        "The faculty members/teachers are encouraged to establish linkages with Industry.",
        QuestionKind::Rating,
    ),
    (
        "The syllabus is relevant and adequate in terms of scope, depth, and choice to help develop the required competencies amongst students",
        QuestionKind::Rating,
    ),
    (
        "Would you recommend any new course/topic to be added in the program structure?",
        QuestionKind::Text,
    ),
];

const DEFAULT_GUEST_QUESTIONS: [&str; 9] = [
    "How well did the guest lecture align with the course content?",
    "Did the guest lecturer effectively explain complex concepts?",
    "Did the guest lecture enhance your understanding of the subject?",
    "How engaging was the guest lecturer's presentation style?",
    "Were the practical examples and insights beneficial?",
    "Did the guest lecturer interact well with students and address questions?",
    "How valuable was this guest lecture for your academic growth?",
    "Would you recommend having more guest lectures in the curriculum?",
    "Overall, how satisfied were you with the guest lecture?",
];

/// A named round of feedback collection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Campaign {
    /// Unique identifier.
    pub id: Uuid,
    /// Campaign name, e.g. "Faculty Feedback 2025-26".
    pub name: String,
    /// When the campaign was created.
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Creates a new campaign.
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Integer answer 1 through 5 (5 = Strongly Agree, 1 = Strongly Disagree).
    Rating,
    /// Free-form text answer.
    Text,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Rating => "rating",
            QuestionKind::Text => "text",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rating" => Ok(QuestionKind::Rating),
            "text" => Ok(QuestionKind::Text),
            _ => Err(()),
        }
    }
}

/// A question belonging to a campaign.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    /// Unique identifier.
    pub id: Uuid,
    /// Campaign the question belongs to.
    pub campaign_id: Uuid,
    /// 1-based position within the campaign.
    pub position: i32,
    /// Question text shown to respondents.
    pub text: String,
    /// Rating or free text.
    pub kind: QuestionKind,
}

impl Question {
    /// Creates a question at the given 1-based position.
    pub fn new(campaign_id: Uuid, position: i32, text: &str, kind: QuestionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            position,
            text: text.to_string(),
            kind,
        }
    }

    /// Client-facing key, `Q1`..`Qn`.
    pub fn key(&self) -> String {
        format!("Q{}", self.position)
    }
}

/// The question shape served to clients: positional key plus text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionForm {
    /// Positional key, `Q1`..`Qn`.
    pub id: String,
    /// Question text.
    pub text: String,
    /// Rating or free text.
    pub kind: QuestionKind,
}

impl From<&Question> for QuestionForm {
    fn from(q: &Question) -> Self {
        Self {
            id: q.key(),
            text: q.text.clone(),
            kind: q.kind,
        }
    }
}

/// Parses a client question key (`Q3`) into its 1-based position.
pub fn parse_question_key(key: &str) -> Option<i32> {
    let digits = key.strip_prefix('Q').or_else(|| key.strip_prefix('q'))?;
    let position: i32 = digits.parse().ok()?;
    if position >= 1 {
        Some(position)
    } else {
        None
    }
}

/// Returns true when a stored answer is free text rather than a rating.
///
/// Ratings are stored as the strings `"1"`..`"5"`; everything else non-empty
/// is treated as a comment worth surfacing on remark views.
pub fn is_textual_answer(answer: &str) -> bool {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return false;
    }
    !matches!(trimmed, "1" | "2" | "3" | "4" | "5")
}

/// One answered question from one respondent about one target.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedbackEntry {
    /// Unique identifier.
    pub id: Uuid,
    /// Campaign the answer belongs to.
    pub campaign_id: Uuid,
    /// Submitting student, when the campaign collects student feedback.
    pub student_id: Option<Uuid>,
    /// Rated faculty member, for faculty-campaign entries.
    pub faculty_id: Option<Uuid>,
    /// Rated subject, for faculty-campaign entries.
    pub subject_id: Option<Uuid>,
    /// Question being answered.
    pub question_id: Uuid,
    /// Stored answer: `"1"`..`"5"` for ratings, free text otherwise.
    pub answer: String,
    /// Cleared when a submission is voided; only valid rows count.
    pub valid: bool,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Guest respondent's user id; NULL for student submissions.
    pub respondent_id: Option<Uuid>,
}

impl FeedbackEntry {
    /// Entry for a student rating a faculty member on a subject.
    pub fn faculty_response(
        campaign_id: Uuid,
        student_id: Uuid,
        faculty_id: Uuid,
        subject_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            student_id: Some(student_id),
            faculty_id: Some(faculty_id),
            subject_id: Some(subject_id),
            question_id,
            answer: answer.to_string(),
            valid: true,
            submitted_at: Utc::now(),
            respondent_id: None,
        }
    }

    /// Entry for a campaign-level student answer (curriculum feedback).
    pub fn curriculum_response(
        campaign_id: Uuid,
        student_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            student_id: Some(student_id),
            faculty_id: None,
            subject_id: None,
            question_id,
            answer: answer.to_string(),
            valid: true,
            submitted_at: Utc::now(),
            respondent_id: None,
        }
    }

    /// Entry for a guest-lecture answer from an external respondent.
    pub fn guest_response(
        campaign_id: Uuid,
        respondent_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            student_id: None,
            faculty_id: None,
            subject_id: None,
            question_id,
            answer: answer.to_string(),
            valid: true,
            submitted_at: Utc::now(),
            respondent_id: Some(respondent_id),
        }
    }

    /// Parses the answer as a numeric rating, `None` for text answers.
    pub fn rating(&self) -> Option<f64> {
        self.answer.trim().parse::<f64>().ok()
    }

    /// Whether the answer is free text (see [`is_textual_answer`]).
    pub fn is_textual(&self) -> bool {
        is_textual_answer(&self.answer)
    }
}

/// An anonymous free-text remark, scoped only to a branch.
///
/// Deliberately carries no student linkage so remarks cannot be traced to
/// individual respondents.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Remark {
    /// Unique identifier.
    pub id: Uuid,
    /// Remark text.
    pub body: String,
    /// Branch the remark concerns.
    pub branch: String,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

impl Remark {
    /// Creates a remark for a branch.
    pub fn new(body: &str, branch: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.to_string(),
            branch: branch.to_string(),
            submitted_at: Utc::now(),
        }
    }
}
