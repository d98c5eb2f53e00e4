//! Test utilities for Schoolhub services.
//!
//! Provides `MockSession` for signed session cookies and small image fixtures.
//! Import from tests only.

pub mod auth;
pub mod images;
