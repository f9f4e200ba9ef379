//! Test helpers for authentication.
//!
//! Provides utilities for testing authenticated endpoints without
//! setting up full session infrastructure.

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use cp_core::auth::Role;
use cp_core::User;

/// Extension type for injecting a test user into requests.
#[derive(Clone)]
pub struct TestUser(pub User);

impl TestUser {
    fn build(email: &str, name: &str, role: Role, branch: Option<&str>) -> Self {
        TestUser(User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: "not_used".to_string(),
            role,
            branch: branch.map(|b| b.to_string()),
            enabled: true,
            last_login_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        })
    }

    /// Creates a default admin test user.
    pub fn admin() -> Self {
        Self::build("systemadmin@test.local", "Test Admin", Role::Admin, None)
    }

    /// Creates a coordinator test user scoped to a branch.
    pub fn coordinator(branch: &str) -> Self {
        Self::build(
            "coordinator@test.local",
            "Test Coordinator",
            Role::Coordinator,
            Some(branch),
        )
    }

    /// Creates a coordinator test user with no branch set.
    pub fn coordinator_without_branch() -> Self {
        Self::build(
            "coordinator@test.local",
            "Test Coordinator",
            Role::Coordinator,
            None,
        )
    }

    /// Creates a faculty test user.
    pub fn faculty() -> Self {
        Self::build("faculty@test.local", "Test Faculty", Role::Faculty, None)
    }

    /// Creates a student test user.
    pub fn student() -> Self {
        Self::build("studentbtech23@test.local", "Test Student", Role::Student, None)
    }

    /// Creates a guest test user.
    pub fn guest() -> Self {
        Self::build("guest@example.com", "Test Guest", Role::Guest, None)
    }
}

/// Middleware that injects a test user into the request extensions.
///
/// Use this in tests to bypass session-based authentication.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use crate::auth::test_helpers::{TestUser, inject_test_user};
///
/// let router = Router::new()
///     .route("/protected", get(handler))
///     .layer(middleware::from_fn(move |req, next| {
///         inject_test_user(TestUser::admin(), req, next)
///     }));
/// ```
pub async fn inject_test_user(test_user: TestUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(test_user);
    next.run(request).await
}
