pub mod otp_codes;
pub mod schools;
pub mod users;
