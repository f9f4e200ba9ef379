//! # cp-observability
//!
//! Logging and metrics infrastructure for Campus Pulse.
//!
//! This crate provides structured logging with the tracing ecosystem and
//! Prometheus metrics installation for the Campus Pulse system.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, register_metrics, FEEDBACK_ENTRIES_TOTAL, FEEDBACK_SUBMISSIONS_TOTAL,
    HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS, LOGIN_ATTEMPTS_TOTAL,
    LOGIN_RATE_LIMITED_TOTAL, REPORTS_GENERATED_TOTAL, ROSTER_IMPORTS_TOTAL,
};
