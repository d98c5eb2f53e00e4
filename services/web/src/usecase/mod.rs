pub mod otp;
pub mod school;
