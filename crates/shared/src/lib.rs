//! Shared types and configuration for Expensa.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Configuration management
//! - JWT claims and token handling
//! - SMTP email delivery

pub mod auth;
pub mod config;
pub mod email;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, EmailConfig, ExpenseConfig, JwtConfig};
pub use email::{EmailContent, EmailError, EmailService};
pub use jwt::{JwtError, JwtService};
