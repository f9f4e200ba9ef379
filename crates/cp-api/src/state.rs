//! Shared application state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use cp_core::db::DbPool;
use cp_core::visibility::VisibilityFlags;

use crate::rate_limit::LoginRateLimiter;

/// State shared across all request handlers.
///
/// Cheap to clone; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DbPool>,
    /// Cached visibility flags (login/dashboard gates).
    pub visibility: Arc<VisibilityFlags>,
    /// Per-IP login attempt limiter.
    pub login_rate_limiter: Arc<LoginRateLimiter>,
    /// Prometheus render handle, when the recorder is installed.
    pub prometheus_handle: Option<Arc<PrometheusHandle>>,
    /// Email domain that separates institute accounts from guests.
    pub institute_domain: String,
    /// Password assigned to accounts created by roster import.
    pub default_student_password: String,
}

impl AppState {
    pub fn new(db: DbPool, visibility: VisibilityFlags) -> Self {
        Self {
            db: Arc::new(db),
            visibility: Arc::new(visibility),
            login_rate_limiter: Arc::new(LoginRateLimiter::new()),
            prometheus_handle: None,
            institute_domain: "sitpune.edu.in".to_string(),
            default_student_password: "Changeme1".to_string(),
        }
    }

    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(Arc::new(handle));
        self
    }

    pub fn with_login_rate_limiter(mut self, limiter: LoginRateLimiter) -> Self {
        self.login_rate_limiter = Arc::new(limiter);
        self
    }

    pub fn with_institute_domain(mut self, domain: impl Into<String>) -> Self {
        self.institute_domain = domain.into();
        self
    }

    pub fn with_default_student_password(mut self, password: impl Into<String>) -> Self {
        self.default_student_password = password.into();
        self
    }
}
