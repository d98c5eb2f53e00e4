//! Domain rules shared across Schoolhub services.
//!
//! Pure types and checks with no framework dependencies.

pub mod email;
pub mod image;
pub mod school;
