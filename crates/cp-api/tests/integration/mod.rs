//! Integration test modules.

pub mod api_contract_tests;
pub mod auth_tests;
pub mod common;
pub mod health_tests;
