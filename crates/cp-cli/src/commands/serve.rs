//! Serve command - starts the API server.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use cp_api::{ApiServer, ApiServerConfig, AppState};
use cp_core::db::{create_pool, create_visibility_store, ensure_admin_user, run_migrations};
use cp_core::visibility::VisibilityFlags;

use crate::config::AppConfig;

/// Server configuration from CLI arguments.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Port to listen on.
    pub port: u16,
    /// Hostname to bind to.
    pub host: String,
    /// Database URL.
    pub database_url: String,
    /// Enable Swagger UI.
    pub enable_swagger: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            database_url: "sqlite://campus-pulse.db?mode=rwc".to_string(),
            enable_swagger: true,
            timeout_secs: 30,
        }
    }
}

/// Runs the API server.
pub async fn run_server(config: ServeConfig, app_config: AppConfig) -> Result<()> {
    println!("{} Starting Campus Pulse API Server...", "[server]".cyan());

    // Create database connection pool
    println!("  {} Database: {}", "→".green(), config.database_url);
    let db_pool = create_pool(&config.database_url)
        .await
        .context("Failed to create database connection pool")?;

    println!("  {} Running migrations...", "→".green());
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    println!("  {} Migrations complete", "✓".green());

    // First boot on an empty database creates the admin account. The password
    // comes from CP_ADMIN_PASSWORD or is generated and written to the log.
    if let Some(admin) = ensure_admin_user(&db_pool, &app_config.institute.domain)
        .await
        .context("Failed to prepare admin account")?
    {
        println!(
            "  {} Created initial admin account {} (password in the startup log)",
            "✓".green(),
            admin.email
        );
    }

    // Warm the visibility flag cache so login gates answer without a query
    let visibility = VisibilityFlags::new(Arc::from(create_visibility_store(&db_pool)));
    visibility
        .refresh()
        .await
        .context("Failed to load visibility flags")?;
    println!("  {} Visibility flags loaded", "✓".green());

    let prometheus_handle = match cp_observability::init_metrics() {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!(error = %err, "Prometheus recorder not installed; /metrics will be unavailable");
            None
        }
    };

    // Create application state
    let mut state = AppState::new(db_pool, visibility)
        .with_institute_domain(app_config.institute.domain.clone())
        .with_default_student_password(app_config.institute.default_student_password.clone());

    if let Some(handle) = prometheus_handle {
        state = state.with_prometheus_handle(handle);
    }

    // Build server config
    let bind_address: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    let server_config = ApiServerConfig {
        bind_address,
        request_timeout: Duration::from_secs(config.timeout_secs),
        enable_swagger: config.enable_swagger,
        shutdown_timeout: Duration::from_secs(30),
        session_cookie_name: app_config.session.cookie_name.clone(),
        session_expiry_seconds: app_config.session.expiry_seconds,
        session_secure: app_config.session.secure,
    };

    // Print startup info
    println!();
    println!("{}", "Campus Pulse API Server".bold());
    println!("{}", "═".repeat(40));
    println!("  {} http://{}", "Address:".cyan(), bind_address);
    println!("  {} {}", "Database:".cyan(), config.database_url);
    println!("  {} {}", "Institute:".cyan(), app_config.institute.domain);

    if config.enable_swagger {
        println!(
            "  {} http://{}/swagger-ui",
            "Swagger UI:".cyan(),
            bind_address
        );
    }

    println!();
    println!("{}", "Endpoints:".bold());
    println!("  GET  /health                      - Health check");
    println!("  GET  /login                       - Login page");
    println!("  GET  /api/v1/campaigns            - List feedback campaigns");
    println!("  POST /api/v1/student/feedback     - Submit faculty feedback");
    println!("  GET  /api/v1/faculty/ratings      - Rating averages per subject");
    println!("  GET  /api/v1/coordinator/overview - Branch participation overview");
    println!("  GET  /api/v1/admin/toggles        - Visibility toggles");
    println!("  GET  /metrics                     - Prometheus metrics");
    println!();
    println!("Press {} to stop", "Ctrl+C".yellow());
    println!();

    // Create and run server
    let server = ApiServer::new(state, server_config);
    server.run().await.context("Server error")?;

    println!();
    println!("{} Server stopped", "[server]".cyan());

    Ok(())
}
