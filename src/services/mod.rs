pub mod attempt_service;
pub mod audit_service;
pub mod exam_service;
pub mod face_service;
pub mod gamification_service;
pub mod gate;
pub mod notification_service;
pub mod progress_service;
pub mod registration_service;
pub mod scoring;
