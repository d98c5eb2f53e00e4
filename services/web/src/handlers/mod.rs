pub mod auth;
pub mod health;
pub mod school;
pub mod upload;
