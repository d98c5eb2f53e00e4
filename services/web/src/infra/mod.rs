pub mod db;
pub mod mailer;
pub mod staging;
pub mod storage;
