//! HTTP route handlers.
//!
//! [`mcp`] sits behind the [`crate::auth::require_token`] middleware;
//! [`health`] and [`info`] are public.

pub mod health;
pub mod info;
pub mod mcp;
