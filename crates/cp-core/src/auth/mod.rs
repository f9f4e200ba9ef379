//! Authentication and authorization types for Campus Pulse.
//!
//! This module defines the role model, the user entity, and the session
//! payload shared between the API layer and the database layer.

pub mod password;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// User roles in order of decreasing privilege.
///
/// `Admin` passes every permission gate. The remaining roles are flat:
/// a coordinator is not a faculty member and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System administrator: manages coordinators and visibility flags.
    Admin,
    /// Branch coordinator: analytics and reports for one branch.
    Coordinator,
    /// Faculty member: own ratings and remarks.
    Faculty,
    /// Student: submits feedback.
    Student,
    /// External guest: guest-lecture feedback only.
    #[default]
    Guest,
}

impl Role {
    /// Returns the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::Faculty => "faculty",
            Role::Student => "student",
            Role::Guest => "guest",
        }
    }

    /// Checks if this role satisfies a required role.
    ///
    /// Admin satisfies everything; every other role satisfies only itself.
    pub fn has_permission(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (a, b) => *a == b,
        }
    }

    /// Classifies an email address into the role its address pattern implies.
    ///
    /// Addresses on the institute domain map by local-part keyword:
    /// `btech` means student, `coordinator` means coordinator, `systemadmin`
    /// means admin, anything else is faculty. Addresses on any other domain
    /// are guests.
    pub fn classify_email(email: &str, institute_domain: &str) -> Role {
        let email = email.to_lowercase();
        let suffix = format!("@{}", institute_domain.to_lowercase());

        if !email.ends_with(&suffix) {
            return Role::Guest;
        }

        let local = &email[..email.len() - suffix.len()];
        if local.contains("btech") {
            Role::Student
        } else if local.contains("coordinator") {
            Role::Coordinator
        } else if local.contains("systemadmin") {
            Role::Admin
        } else {
            Role::Faculty
        }
    }

    /// Returns the dashboard path a user of this role lands on after login.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Coordinator => "/coordinator/dashboard",
            Role::Faculty => "/faculty/dashboard",
            Role::Student => "/student/dashboard",
            Role::Guest => "/guest/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "coordinator" => Ok(Role::Coordinator),
            "faculty" => Ok(Role::Faculty),
            "student" => Ok(Role::Student),
            "guest" => Ok(Role::Guest),
            _ => Err(()),
        }
    }
}

/// A user account.
///
/// The email address is the login identifier. `branch` is set for
/// coordinators (the branch they manage) and faculty (the branch they
/// teach in); it is `None` for admins and guests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// Email address (unique, used for login).
    pub email: String,
    /// Display name.
    pub name: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role.
    pub role: Role,
    /// Branch scope, e.g. "CSE" (coordinators and faculty).
    pub branch: Option<String>,
    /// Whether the account can log in.
    pub enabled: bool,
    /// Last successful login.
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new enabled user with the given credentials and role.
    pub fn new(email: &str, name: &str, password_hash: &str, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            role,
            branch: None,
            enabled: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the branch scope, consuming and returning the user.
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    /// Name to show in UIs: the display name, or the email when empty.
    pub fn display(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    /// Checks if this user satisfies a required role.
    pub fn has_permission(&self, required: Role) -> bool {
        self.role.has_permission(required)
    }

    /// Convenience check for admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields that can be updated on a user.
///
/// `branch` is doubly optional: `None` leaves it unchanged, `Some(None)`
/// clears it, `Some(Some(b))` sets it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub branch: Option<Option<String>>,
    pub enabled: Option<bool>,
}

/// Filter for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Filter by role.
    pub role: Option<Role>,
    /// Filter by enabled status.
    pub enabled: Option<bool>,
    /// Search in email and name.
    pub search: Option<String>,
}

/// Data stored in the server-side session after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// User ID.
    pub user_id: Uuid,
    /// Email at login time.
    pub email: String,
    /// Role at login time.
    pub role: Role,
    /// CSRF token bound to this session.
    pub csrf_token: String,
}

impl SessionData {
    /// Creates session data for a user with a fresh CSRF token.
    pub fn new(user: &User) -> Self {
        use rand::rngs::OsRng;
        use rand::RngCore;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = OsRng;
        let csrf_token: String = (0..32)
            .map(|_| {
                let idx = (rng.next_u32() as usize) % CHARSET.len();
                CHARSET[idx] as char
            })
            .collect();

        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            csrf_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "sitpune.edu.in";

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.has_permission(Role::Admin));
        assert!(Role::Admin.has_permission(Role::Coordinator));
        assert!(Role::Admin.has_permission(Role::Faculty));
        assert!(Role::Admin.has_permission(Role::Student));
        assert!(Role::Admin.has_permission(Role::Guest));

        assert!(Role::Coordinator.has_permission(Role::Coordinator));
        assert!(!Role::Coordinator.has_permission(Role::Admin));
        assert!(!Role::Coordinator.has_permission(Role::Faculty));

        assert!(Role::Student.has_permission(Role::Student));
        assert!(!Role::Student.has_permission(Role::Faculty));
        assert!(!Role::Guest.has_permission(Role::Student));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Coordinator".parse::<Role>(), Ok(Role::Coordinator));
        assert_eq!("FACULTY".parse::<Role>(), Ok(Role::Faculty));
        assert_eq!("student".parse::<Role>(), Ok(Role::Student));
        assert_eq!("guest".parse::<Role>(), Ok(Role::Guest));
        assert!("professor".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [
            Role::Admin,
            Role::Coordinator,
            Role::Faculty,
            Role::Student,
            Role::Guest,
        ] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn test_classify_email_students() {
        assert_eq!(
            Role::classify_email("alice.btech2023@sitpune.edu.in", DOMAIN),
            Role::Student
        );
        assert_eq!(
            Role::classify_email("BOB.BTECH2022@SITPUNE.EDU.IN", DOMAIN),
            Role::Student
        );
    }

    #[test]
    fn test_classify_email_staff() {
        assert_eq!(
            Role::classify_email("csecoordinator@sitpune.edu.in", DOMAIN),
            Role::Coordinator
        );
        assert_eq!(
            Role::classify_email("systemadmin@sitpune.edu.in", DOMAIN),
            Role::Admin
        );
        assert_eq!(
            Role::classify_email("jane.doe@sitpune.edu.in", DOMAIN),
            Role::Faculty
        );
    }

    #[test]
    fn test_classify_email_external_is_guest() {
        assert_eq!(Role::classify_email("visitor@gmail.com", DOMAIN), Role::Guest);
        assert_eq!(
            Role::classify_email("btech@elsewhere.edu", DOMAIN),
            Role::Guest
        );
    }

    #[test]
    fn test_home_paths() {
        assert_eq!(Role::Student.home_path(), "/student/dashboard");
        assert_eq!(Role::Faculty.home_path(), "/faculty/dashboard");
        assert_eq!(Role::Coordinator.home_path(), "/coordinator/dashboard");
        assert_eq!(Role::Admin.home_path(), "/admin/dashboard");
        assert_eq!(Role::Guest.home_path(), "/guest/dashboard");
    }

    #[test]
    fn test_user_display() {
        let mut user = User::new("a@b.com", "Alice", "hash", Role::Student);
        assert_eq!(user.display(), "Alice");

        user.name = String::new();
        assert_eq!(user.display(), "a@b.com");
    }

    #[test]
    fn test_user_with_branch() {
        let user = User::new("c@sitpune.edu.in", "Coord", "hash", Role::Coordinator)
            .with_branch("CSE");
        assert_eq!(user.branch.as_deref(), Some("CSE"));
    }

    #[test]
    fn test_session_data_has_csrf_token() {
        let user = User::new("a@b.com", "Alice", "hash", Role::Student);
        let session = SessionData::new(&user);

        assert_eq!(session.user_id, user.id);
        assert_eq!(session.email, user.email);
        assert_eq!(session.role, Role::Student);
        assert_eq!(session.csrf_token.len(), 32);
        assert!(session.csrf_token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_session_tokens_differ() {
        let user = User::new("a@b.com", "Alice", "hash", Role::Student);
        let a = SessionData::new(&user);
        let b = SessionData::new(&user);
        assert_ne!(a.csrf_token, b.csrf_token);
    }
}
