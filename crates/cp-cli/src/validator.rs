//! Configuration validation for Campus Pulse.
//!
//! This module provides startup validation to ensure all required
//! configuration is present and valid before the server starts.

use crate::config::AppConfig;
use colored::Colorize;
use std::str::FromStr;

use cp_core::validate_password_strength;
use cp_observability::LogFormat;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent startup.
    pub errors: Vec<String>,
    /// Warnings that should be addressed but don't prevent startup.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a new empty validation result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Merges another validation result into this one.
    #[allow(dead_code)]
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before startup.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the application configuration.
    ///
    /// Returns a ValidationResult containing any errors and warnings found.
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_server(config, &mut result);
        Self::validate_database_url(config, &mut result);
        Self::validate_session(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_institute(config, &mut result);

        result
    }

    /// Validates the bind address components.
    fn validate_server(config: &AppConfig, result: &mut ValidationResult) {
        if config.server.host.trim().is_empty() {
            result.add_error("Server host must not be empty");
        }

        if config.server.port == 0 {
            result.add_error("Server port must be non-zero");
        }
    }

    /// Validates database URL format.
    fn validate_database_url(config: &AppConfig, result: &mut ValidationResult) {
        let url = &config.database.url;

        if !url.starts_with("sqlite:")
            && !url.starts_with("postgres://")
            && !url.starts_with("postgresql://")
        {
            result.add_error(format!(
                "Invalid database URL '{}'. Must start with sqlite: or postgres://",
                url
            ));
        }

        if url.starts_with("sqlite:") && is_production_environment() {
            result.add_warning(
                "Using SQLite database in production is not recommended. \
                 Consider using PostgreSQL for better performance and reliability."
                    .to_string(),
            );
        }
    }

    /// Validates session cookie settings.
    fn validate_session(config: &AppConfig, result: &mut ValidationResult) {
        let name = &config.session.cookie_name;

        if name.trim().is_empty() {
            result.add_error("Session cookie name must not be empty");
        } else if name.contains(char::is_whitespace) || name.contains(';') || name.contains('=') {
            result.add_error(format!(
                "Session cookie name '{}' contains characters that are invalid in a cookie name",
                name
            ));
        }

        if config.session.expiry_seconds <= 0 {
            result.add_error("Session expiry must be a positive number of seconds");
        } else if config.session.expiry_seconds < 300 {
            result.add_warning(format!(
                "Session expiry of {} seconds will force users to log in again very frequently",
                config.session.expiry_seconds
            ));
        }

        if !config.session.secure && is_production_environment() {
            result.add_warning(
                "Session cookie is not marked Secure. Set session.secure: true \
                 when the server is reached over HTTPS."
                    .to_string(),
            );
        }
    }

    /// Validates that log level and format are parseable.
    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if tracing::Level::from_str(&config.logging.level).is_err() {
            result.add_error(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                config.logging.level
            ));
        }

        if LogFormat::from_str(&config.logging.format).is_err() {
            result.add_error(format!(
                "Invalid log format '{}'. Must be plain or json",
                config.logging.format
            ));
        }
    }

    /// Validates institute identity settings.
    fn validate_institute(config: &AppConfig, result: &mut ValidationResult) {
        let domain = &config.institute.domain;

        if domain.trim().is_empty() {
            result.add_error(
                "Institute domain must not be empty. \
                 Student and faculty accounts are classified by this domain.",
            );
        } else if domain.contains('@') || domain.contains(char::is_whitespace) {
            result.add_error(format!(
                "Institute domain '{}' should be a bare domain such as example.edu",
                domain
            ));
        }

        let problems = validate_password_strength(&config.institute.default_student_password);
        if !problems.is_empty() {
            result.add_warning(format!(
                "Default student password is weak ({}). Accounts created by roster \
                 import will inherit it.",
                problems.join(", ")
            ));
        }

        if config.institute.default_student_password == "Changeme1" && is_production_environment() {
            result.add_warning(
                "Default student password is unchanged from the documented default. \
                 Imported accounts will share a publicly known password until students rotate it."
                    .to_string(),
            );
        }
    }
}

// Matches the server's notion of production (cp-api CORS and cookie policy).
fn is_production_environment() -> bool {
    std::env::var("CP_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}
