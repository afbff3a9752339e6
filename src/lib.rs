//! Authenticated, retrying client for the Google Sheets values API.
//!
//! Service-account credentials are exchanged for short-lived bearer tokens
//! through the JWT bearer grant, tokens are cached until shortly before they
//! expire, and every Sheets call runs under a bounded retry policy.

pub mod auth;
pub mod config;
pub mod error;
pub mod sheets;
pub mod upstream;
