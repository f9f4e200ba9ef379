//! API server implementation.

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorResponse;
use crate::middleware::{
    cors_layer, request_body_limit_layer, request_id, request_logging, security_headers,
};
use crate::routes;
use crate::state::AppState;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Enable Swagger UI.
    pub enable_swagger: bool,
    /// Shutdown timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
    /// Session cookie name.
    pub session_cookie_name: String,
    /// Seconds of inactivity before a session expires.
    pub session_expiry_seconds: i64,
    /// Mark the session cookie Secure (HTTPS-only deployments).
    pub session_secure: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
            enable_swagger: true,
            shutdown_timeout: Duration::from_secs(30),
            session_cookie_name: "cp_session".to_string(),
            session_expiry_seconds: 86_400,
            session_secure: false,
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::health_check_detailed,
        crate::routes::health::readiness_check,
        crate::routes::health::liveness_check,
        crate::routes::metrics::prometheus_metrics,
        crate::routes::auth::current_user,
        crate::routes::auth::register,
        crate::routes::campaigns::list_campaigns,
        crate::routes::campaigns::campaign_questions,
        crate::routes::student::student_profile,
        crate::routes::student::pending_feedback,
        crate::routes::student::submit_feedback,
        crate::routes::student::submit_curriculum_feedback,
        crate::routes::guest::submit_guest_feedback,
        crate::routes::faculty::faculty_profile,
        crate::routes::faculty::faculty_ratings,
        crate::routes::faculty::faculty_remarks,
        crate::routes::coordinator::overview,
        crate::routes::coordinator::outstanding_report,
        crate::routes::coordinator::feedback_report,
        crate::routes::coordinator::remarks_report,
        crate::routes::coordinator::consolidated_report,
        crate::routes::coordinator::complete_report,
        crate::routes::coordinator::list_students,
        crate::routes::coordinator::roster_template,
        crate::routes::coordinator::roster_export,
        crate::routes::coordinator::roster_import,
        crate::routes::coordinator::set_student_login,
        crate::routes::admin::list_coordinators,
        crate::routes::admin::create_coordinator,
        crate::routes::admin::remove_coordinator,
        crate::routes::admin::list_toggles,
        crate::routes::admin::set_toggle,
    ),
    components(
        schemas(
            crate::routes::health::HealthResponse,
            crate::routes::health::DatabaseHealth,
            crate::routes::health::ComponentsHealth,
            crate::routes::health::VisibilityHealth,
            crate::routes::auth::CurrentUserResponse,
            crate::routes::auth::RegisterRequest,
            crate::routes::auth::RegisterResponse,
            crate::routes::campaigns::CampaignResponse,
            crate::routes::campaigns::CampaignQuestionsResponse,
            crate::routes::student::StudentProfileResponse,
            crate::routes::student::FeedbackTargetResponse,
            crate::routes::student::FeedbackTargetRequest,
            crate::routes::student::SubmitFeedbackRequest,
            crate::routes::student::CurriculumFeedbackRequest,
            crate::routes::student::SubmitFeedbackResponse,
            crate::routes::guest::GuestFeedbackRequest,
            crate::routes::guest::GuestFeedbackResponse,
            crate::routes::faculty::TaughtSubjectResponse,
            crate::routes::faculty::FacultyProfileResponse,
            crate::routes::faculty::FacultyRatingsResponse,
            crate::routes::faculty::FacultyRemarksResponse,
            crate::routes::coordinator::ToggleRequest,
            crate::routes::coordinator::RosterImportResponse,
            crate::routes::admin::CoordinatorResponse,
            crate::routes::admin::CreateCoordinatorRequest,
            crate::routes::admin::CreateCoordinatorResponse,
            cp_core::auth::Role,
            cp_core::feedback::QuestionForm,
            cp_core::analytics::RatingBreakdownRow,
            cp_core::analytics::SubjectRemarkRow,
            cp_core::analytics::BranchOverview,
            cp_core::analytics::ParticipationStats,
            cp_core::roster::RosterImportReport,
            cp_core::roster::RosterRowError,
            cp_core::visibility::VisibilityFlag,
            ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Session and account management"),
        (name = "campaigns", description = "Feedback campaigns and questionnaires"),
        (name = "student", description = "Student feedback submission"),
        (name = "guest", description = "Guest lecture feedback"),
        (name = "faculty", description = "Faculty analytics dashboard"),
        (name = "coordinator", description = "Branch coordination and reports"),
        (name = "admin", description = "Coordinator and visibility administration"),
        (name = "metrics", description = "System metrics"),
    ),
    info(
        title = "Campus Pulse API",
        version = "0.1.0",
        description = "Role-based feedback collection for an academic institute",
        license(name = "MIT"),
    )
)]
pub struct ApiDoc;

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Creates a new API server.
    pub fn new(state: AppState, config: ApiServerConfig) -> Self {
        Self { config, state }
    }

    /// Creates a new API server with default configuration.
    pub fn with_state(state: AppState) -> Self {
        Self::new(state, ApiServerConfig::default())
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        // Initialize start time for uptime calculation
        routes::health::init_start_time();

        // Register metric descriptions once
        cp_observability::register_metrics();

        // Build the main router with API routes
        let mut app = routes::create_router(self.state.clone());

        // Add Swagger UI if enabled
        if self.config.enable_swagger {
            app = app.merge(
                SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
            );
        }

        // Server-side sessions back both the login form and the API cookie
        let session_layer = SessionManagerLayer::new(MemoryStore::default())
            .with_name(self.config.session_cookie_name.clone())
            .with_secure(self.config.session_secure)
            .with_expiry(Expiry::OnInactivity(
                tower_sessions::cookie::time::Duration::seconds(self.config.session_expiry_seconds),
            ));

        // Apply middleware (order matters: innermost first)
        app
            // Security headers
            .layer(middleware::from_fn(security_headers))
            // Request logging
            .layer(middleware::from_fn(request_logging))
            // Request ID
            .layer(middleware::from_fn(request_id))
            // Tracing
            .layer(TraceLayer::new_for_http())
            // CORS
            .layer(cors_layer())
            // Body size cap
            .layer(request_body_limit_layer())
            // Catch panics and return 500
            .layer(CatchPanicLayer::new())
            // Sessions
            .layer(session_layer)
    }

    /// Runs the server.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("API server shut down gracefully");
        Ok(())
    }

    /// Runs the server with a custom shutdown signal.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("API server shut down gracefully");
        Ok(())
    }
}

/// Default shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
