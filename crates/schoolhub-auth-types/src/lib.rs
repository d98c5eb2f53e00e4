//! Session types shared by Schoolhub services.
//!
//! Provides the session token issuer/validator, cookie builders, and the
//! `CurrentUser` / `MaybeUser` extractors.

pub mod cookie;
pub mod identity;
pub mod token;
