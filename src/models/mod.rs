pub mod answer;
pub mod attempt;
pub mod audit_log;
pub mod credential;
pub mod exam;
pub mod face_job;
pub mod gamification;
pub mod outbox;
pub mod progress;
pub mod question;
pub mod registration;
pub mod user;
pub mod violation;
