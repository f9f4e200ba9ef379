//! Deterministic database seeding.
//!
//! `ensure_admin_user` bootstraps the first admin account on an empty
//! database. `seed_demo_data` loads a reproducible demo institute: six
//! branches with coordinators, faculty, subjects, students and their
//! electives, plus the three feedback campaigns. Both are idempotent;
//! rows that already exist (matched by email, PRN or name) are skipped,
//! so the seeder can run against a live database without clobbering it.
//!
//! All derived identities come from fixed name pools indexed by position,
//! never from a random source, so two runs against empty databases produce
//! the same accounts.

use super::{
    create_campaign_repository, create_faculty_repository, create_student_repository,
    create_subject_repository, create_user_repository, create_visibility_store, DbError, DbPool,
};
use crate::academics::{Elective, Faculty, Student, Subject, SubjectKind, TeachingAssignment};
use crate::auth::password::hash_password;
use crate::auth::{Role, User};
use crate::feedback::{Campaign, CampaignKind, Question};
use crate::visibility::{VisibilityError, VisibilityFlag, DEFAULT_FLAG_NAMES};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

/// Branch codes in seeding order.
pub const BRANCHES: [&str; 6] = ["CSE", "AIML", "ENTC", "MECH", "CIVIL", "RA"];

/// Department names, index-aligned with [`BRANCHES`].
pub const DEPARTMENTS: [&str; 6] = [
    "Computer Science",
    "Artificial Intelligence & Machine Learning",
    "Electronics & Telecommunications",
    "Mechanical",
    "Civil",
    "Robotics & Automation",
];

const BRANCH_CODES: [&str; 6] = ["cs", "aiml", "entc", "mech", "civil", "ra"];
const BATCHES: [&str; 3] = ["A", "B", "C"];

const FACULTY_PER_DEPARTMENT: usize = 5;
const STUDENTS_PER_BRANCH: usize = 15;

const FACULTY_FIRST_NAMES: [&str; 20] = [
    "Sunita", "Vijay", "Deepa", "Rajan", "Meenakshi", "Prakash", "Anita", "Suresh", "Kavita",
    "Rajesh", "Alok", "Bharti", "Chandan", "Divya", "Esha", "Farhan", "Garima", "Harish",
    "Ishita", "Jai",
];

const FACULTY_LAST_NAMES: [&str; 20] = [
    "Gohil", "Thakur", "Banerjee", "Menon", "Chadha", "Narayan", "Bhatt", "Rajagopal",
    "Chowdhury", "Venugopal", "Acharya", "Bakshi", "Chopra", "Dhawan", "Easwaran", "Fernandes",
    "Ghosh", "Hegde", "Iyer", "Jindal",
];

const STUDENT_FIRST_NAMES: [&str; 40] = [
    "Deepak", "Priyanka", "Vishal", "Anjali", "Karan", "Megha", "Siddharth", "Ritika", "Ankit",
    "Swati", "Mukesh", "Anamika", "Pranav", "Shivani", "Mohit", "Neha", "Chirag", "Tanuja",
    "Prakash", "Ruchi", "Ashish", "Bhavna", "Chetan", "Dipti", "Eshwar", "Falguni", "Gaurav",
    "Hema", "Ishan", "Juhi", "Kartik", "Leela", "Manoj", "Nidhi", "Om", "Pooja", "Rahul",
    "Sarika", "Tarun", "Uma",
];

const STUDENT_LAST_NAMES: [&str; 40] = [
    "Malhotra", "Dewangan", "Ghosh", "Bhandari", "Israni", "Lokhande", "Murthy", "Parekh",
    "Qureshi", "Rastogi", "Saini", "Tiwari", "Uppal", "Venkatesh", "Wadhwa", "Yadav", "Shetty",
    "Kannan", "Prabhu", "Dixit", "Ahluwalia", "Bajaj", "Chakraborty", "Dutt", "Emani",
    "Farooqui", "Gokhale", "Haksar", "Iyengar", "Jaitly", "Khanna", "Lamba", "Mathur",
    "Nadkarni", "Oberoi", "Pillai", "Rana", "Sengupta", "Tandon", "Unnikrishnan",
];

const SUBJECTS: [(&str, SubjectKind); 26] = [
    ("Analysis of Algorithms", SubjectKind::Theory),
    ("Advanced Data Structures", SubjectKind::Lab),
    ("Compiler Design", SubjectKind::Theory),
    ("Web Technologies Lab", SubjectKind::Lab),
    ("DBMS Lab", SubjectKind::Lab),
    ("Blockchain Technology", SubjectKind::Elective),
    ("Cloud Computing", SubjectKind::Elective),
    ("Machine Learning Fundamentals", SubjectKind::Theory),
    ("Deep Learning", SubjectKind::Theory),
    ("Natural Language Processing", SubjectKind::Theory),
    ("Reinforcement Learning", SubjectKind::Elective),
    ("AI Ethics", SubjectKind::Elective),
    ("Digital Signal Processing", SubjectKind::Theory),
    ("DSP Lab", SubjectKind::Lab),
    ("Microcontroller Lab", SubjectKind::Lab),
    ("Digital Communication", SubjectKind::Theory),
    ("Analog Communication", SubjectKind::Theory),
    ("ML Lab", SubjectKind::Lab),
    ("Data Science Lab", SubjectKind::Lab),
    ("Engineering Mathematics", SubjectKind::Theory),
    ("Engineering Physics", SubjectKind::Theory),
    ("Technical Communication", SubjectKind::Theory),
    ("Environmental Studies", SubjectKind::Theory),
    ("Physics Lab", SubjectKind::Lab),
    ("Professional Ethics", SubjectKind::Elective),
    ("Financial Mathematics", SubjectKind::Elective),
];

/// Which subjects each department teaches, index-aligned with
/// [`DEPARTMENTS`]. The shared first-year subjects are split across the
/// mechanical, civil and robotics departments so every subject has staff.
const DEPARTMENT_SUBJECTS: [&[&str]; 6] = [
    &[
        "Analysis of Algorithms",
        "Advanced Data Structures",
        "Compiler Design",
        "Web Technologies Lab",
        "DBMS Lab",
        "Blockchain Technology",
        "Cloud Computing",
    ],
    &[
        "Machine Learning Fundamentals",
        "Deep Learning",
        "Natural Language Processing",
        "Reinforcement Learning",
        "AI Ethics",
        "ML Lab",
        "Data Science Lab",
    ],
    &[
        "Digital Signal Processing",
        "DSP Lab",
        "Microcontroller Lab",
        "Digital Communication",
        "Analog Communication",
    ],
    &[
        "Engineering Mathematics",
        "Engineering Physics",
        "Physics Lab",
    ],
    &["Environmental Studies", "Technical Communication"],
    &["Professional Ethics", "Financial Mathematics"],
];

/// Counts of rows created by a seeding run.
///
/// Rows skipped because they already existed are not counted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    pub subjects: u64,
    pub coordinators: u64,
    pub faculty: u64,
    pub students: u64,
    pub assignments: u64,
    pub electives: u64,
    pub campaigns: u64,
    pub questions: u64,
    pub flags: u64,
}

impl SeedSummary {
    /// Total rows created across all tables.
    pub fn total(&self) -> u64 {
        self.subjects
            + self.coordinators
            + self.faculty
            + self.students
            + self.assignments
            + self.electives
            + self.campaigns
            + self.questions
            + self.flags
    }
}

/// Creates the initial admin account if the user table is empty.
///
/// The password comes from `CP_ADMIN_PASSWORD`; when unset, a random one is
/// generated and logged once so the operator can complete first login.
/// Returns the created user, or `None` when accounts already exist.
pub async fn ensure_admin_user(pool: &DbPool, domain: &str) -> Result<Option<User>, DbError> {
    let users = create_user_repository(pool);

    if users.any_exist().await? {
        return Ok(None);
    }

    let email = format!("systemadmin@{}", domain);
    let password = match std::env::var("CP_ADMIN_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            let generated = generate_password(16);
            warn!(
                email = %email,
                password = %generated,
                "CP_ADMIN_PASSWORD not set, generated an initial admin password"
            );
            generated
        }
    };

    let hash = hash_password(&password)?;
    let admin = User::new(&email, "System Admin", &hash, Role::Admin);
    let created = users.create(&admin).await?;
    info!(email = %email, "Created initial admin account");

    Ok(Some(created))
}

/// Seeds the demo institute.
///
/// Safe to run repeatedly; existing rows are matched by email, PRN, subject
/// name or campaign name and left untouched.
pub async fn seed_demo_data(pool: &DbPool, domain: &str) -> Result<SeedSummary, DbError> {
    let users = create_user_repository(pool);
    let student_repo = create_student_repository(pool);
    let faculty_repo = create_faculty_repository(pool);
    let subject_repo = create_subject_repository(pool);
    let campaign_repo = create_campaign_repository(pool);
    let visibility = create_visibility_store(pool);

    let mut summary = SeedSummary::default();
    let password_hash = hash_password(&seed_password())?;

    // Subjects first; everything downstream references them by name.
    let mut subject_ids: HashMap<&str, Uuid> = HashMap::new();
    for (name, kind) in SUBJECTS {
        if let Some(existing) = subject_repo.get_by_name(name).await? {
            subject_ids.insert(name, existing.id);
            continue;
        }
        let subject = Subject::new(name, kind);
        subject_repo.create(&subject).await?;
        subject_ids.insert(name, subject.id);
        summary.subjects += 1;
    }

    // One coordinator per branch. Coordinators also get a faculty record,
    // mirroring how institutes staff the role.
    for (i, branch) in BRANCHES.iter().enumerate() {
        let email = format!("{}coordinator@{}", BRANCH_CODES[i], domain);
        if users.get_by_email(&email).await?.is_some() {
            continue;
        }

        let name = format!("{} Coordinator", DEPARTMENTS[i]);
        let user = User::new(&email, &name, &password_hash, Role::Coordinator).with_branch(branch);
        let user = users.create(&user).await?;
        faculty_repo
            .create(&Faculty::new(&name, &email, DEPARTMENTS[i], user.id))
            .await?;
        summary.coordinators += 1;
    }

    // Teaching staff, five per department.
    for (i, department) in DEPARTMENTS.iter().enumerate() {
        for k in 0..FACULTY_PER_DEPARTMENT {
            let g = i * FACULTY_PER_DEPARTMENT + k;
            let (name, local_part) = faculty_identity(g);
            let email = format!("{}@{}", local_part, domain);
            if users.get_by_email(&email).await?.is_some() {
                continue;
            }

            let user =
                User::new(&email, &name, &password_hash, Role::Faculty).with_branch(BRANCHES[i]);
            let user = users.create(&user).await?;
            faculty_repo
                .create(&Faculty::new(&name, &email, department, user.id))
                .await?;
            summary.faculty += 1;
        }
    }

    // Teaching assignments: each department's subjects round-robin over its
    // staff, batches cycling A/B/C.
    for i in 0..DEPARTMENTS.len() {
        let mut staff = Vec::new();
        for k in 0..FACULTY_PER_DEPARTMENT {
            let g = i * FACULTY_PER_DEPARTMENT + k;
            let (_, local_part) = faculty_identity(g);
            let email = format!("{}@{}", local_part, domain);
            if let Some(member) = faculty_repo.get_by_email(&email).await? {
                staff.push(member);
            }
        }
        if staff.is_empty() {
            continue;
        }

        let mut existing_pairs: HashSet<(Uuid, Uuid)> = HashSet::new();
        for member in &staff {
            for assignment in subject_repo.list_assignments_by_faculty(member.id).await? {
                existing_pairs.insert((assignment.faculty_id, assignment.subject_id));
            }
        }

        for (j, subject_name) in DEPARTMENT_SUBJECTS[i].iter().enumerate() {
            let Some(&subject_id) = subject_ids.get(subject_name) else {
                continue;
            };
            let member = &staff[j % staff.len()];
            if existing_pairs.contains(&(member.id, subject_id)) {
                continue;
            }

            let assignment =
                TeachingAssignment::new(member.id, subject_id, BATCHES[j % BATCHES.len()]);
            subject_repo.create_assignment(&assignment).await?;
            summary.assignments += 1;
        }
    }

    // Students, fifteen per branch, spread over four admission years.
    let current_year = Utc::now().year();
    let joining_years = [
        current_year - 3,
        current_year - 2,
        current_year - 1,
        current_year,
    ];
    let elective_pool: Vec<&str> = SUBJECTS
        .iter()
        .filter(|(_, kind)| *kind == SubjectKind::Elective)
        .map(|(name, _)| *name)
        .collect();

    for (i, branch) in BRANCHES.iter().enumerate() {
        for j in 0..STUDENTS_PER_BRANCH {
            let g = i * STUDENTS_PER_BRANCH + j;
            let prn = format!("PRN{}{:03}", branch, 101 + j);
            if student_repo.get_by_prn(&prn).await?.is_some() {
                continue;
            }

            let (first, last) = student_identity(g);
            let joining_year = joining_years[g % joining_years.len()];
            let email = format!(
                "{}.{}.btech{:02}@{}",
                first.to_lowercase(),
                last.to_lowercase(),
                joining_year % 100,
                domain
            );
            if users.get_by_email(&email).await?.is_some() {
                continue;
            }

            let year_diff = current_year - joining_year;
            let semester = (year_diff * 2 + 1 + (g % 2) as i32).min(8);

            let name = format!("{} {}", first, last);
            let user =
                User::new(&email, &name, &password_hash, Role::Student).with_branch(branch);
            let user = users.create(&user).await?;
            let student = Student::new(&prn, &name, &email, branch, semester, user.id);
            let student = student_repo.create(&student).await?;
            summary.students += 1;

            // Two electives per student, rotating through the pool so each
            // elective ends up with a comparable cohort.
            for pick in [g % elective_pool.len(), (g + 3) % elective_pool.len()] {
                if let Some(&subject_id) = subject_ids.get(elective_pool[pick]) {
                    subject_repo
                        .create_elective(&Elective::new(student.id, subject_id))
                        .await?;
                    summary.electives += 1;
                }
            }
        }
    }

    // The three campaigns for the current academic year, with their
    // standard question sets.
    let existing_campaigns: HashSet<String> = campaign_repo
        .list()
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    let year_label = academic_year_label(current_year);

    for kind in [
        CampaignKind::Faculty,
        CampaignKind::Curriculum,
        CampaignKind::GuestLecture,
    ] {
        let name = format!("{} {}", kind.title(), year_label);
        if existing_campaigns.contains(&name) {
            continue;
        }

        let campaign = Campaign::new(&name);
        campaign_repo.create(&campaign).await?;
        summary.campaigns += 1;

        for (index, (text, question_kind)) in kind.default_questions().into_iter().enumerate() {
            let question = Question::new(campaign.id, (index + 1) as i32, &text, question_kind);
            campaign_repo.add_question(&question).await?;
            summary.questions += 1;
        }
    }

    // Visibility flags are normally seeded by migration; fill any gaps.
    for flag_name in DEFAULT_FLAG_NAMES {
        let existing = visibility
            .get(flag_name)
            .await
            .map_err(visibility_to_db_error)?;
        if existing.is_none() {
            visibility
                .upsert(&VisibilityFlag::new(flag_name, true))
                .await
                .map_err(visibility_to_db_error)?;
            summary.flags += 1;
        }
    }

    info!(created = summary.total(), "Demo data seeding complete");

    Ok(summary)
}

fn visibility_to_db_error(err: VisibilityError) -> DbError {
    DbError::Query(err.to_string())
}

/// Password applied to all demo accounts, from `CP_SEED_PASSWORD` or a
/// documented default.
fn seed_password() -> String {
    match std::env::var("CP_SEED_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => "ChangeMe123".to_string(),
    }
}

fn generate_password(len: usize) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Display name and email local part for the g-th faculty member.
///
/// The index walks the first-name pool directly and offsets the last-name
/// pool on each wrap, so all thirty combinations are distinct.
fn faculty_identity(g: usize) -> (String, String) {
    let n = FACULTY_FIRST_NAMES.len();
    let first = FACULTY_FIRST_NAMES[g % n];
    let last = FACULTY_LAST_NAMES[(g + (g / n) * 7) % FACULTY_LAST_NAMES.len()];
    (
        format!("{} {}", first, last),
        format!("{}.{}", first.to_lowercase(), last.to_lowercase()),
    )
}

/// First and last name for the g-th student, same wrap-offset scheme as
/// [`faculty_identity`].
fn student_identity(g: usize) -> (&'static str, &'static str) {
    let n = STUDENT_FIRST_NAMES.len();
    let first = STUDENT_FIRST_NAMES[g % n];
    let last = STUDENT_LAST_NAMES[(g + (g / n) * 11) % STUDENT_LAST_NAMES.len()];
    (first, last)
}

/// Academic year label, e.g. `2025-26` for 2025.
fn academic_year_label(year: i32) -> String {
    format!("{}-{:02}", year, (year + 1) % 100)
}
