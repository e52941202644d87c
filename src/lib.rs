//! Lead scoring and campaign dispatch pipeline.
//!
//! Turns raw real-estate lead intake into deterministic scoring features,
//! obtains a 1-5 priority score from the scoring service, and runs tiered
//! email campaigns: generated (or template-fallback) content, sanitized
//! into a consistent HTML document, delivered sequentially through SMTP
//! with rate-limit delays and per-recipient failure isolation.

pub mod config;
pub mod content;
pub mod dispatch;
pub mod errors;
pub mod features;
pub mod mailer;
pub mod models;
pub mod sanitize;
pub mod scoring;
pub mod store;

pub use config::Config;
pub use errors::{AppError, ScoringError};
