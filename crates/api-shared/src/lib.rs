//! # API Shared
//!
//! Shared state and definitions for the register sync APIs.
//!
//! Contains:
//! - request/response models with OpenAPI schemas (`models` module)
//! - the passcode gate and the session store that replace a process-wide "logged in" flag
//! - the `HealthService`
//!
//! Used by `api-rest`; nothing here depends on a particular HTTP framework.

pub mod auth;
pub mod health;
pub mod models;
pub mod session;

pub use auth::{AuthError, PasscodeGate};
pub use health::HealthService;
pub use models::*;
pub use session::{parse_session_id, Session, SessionError, SessionStore};
