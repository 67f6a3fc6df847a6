pub mod aggregate;
pub mod billing;
pub mod config;
pub mod mailer;
pub mod models;
pub mod periods;
pub mod report_file;
