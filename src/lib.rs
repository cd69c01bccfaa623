pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use sqlx::PgPool;

use crate::services::{
    attempt_service::AttemptService, audit_service::AuditService, exam_service::ExamService,
    face_service::{FaceJobQueue, FaceService},
    gamification_service::GamificationService, notification_service::NotificationService,
    progress_service::ProgressService, registration_service::RegistrationService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub registration_service: RegistrationService,
    pub exam_service: ExamService,
    pub attempt_service: AttemptService,
    pub face_service: FaceService,
    pub face_jobs: FaceJobQueue,
    pub notification_service: NotificationService,
    pub gamification_service: GamificationService,
    pub progress_service: ProgressService,
    pub audit_service: AuditService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let face_service = FaceService::new(config.face_api_url.clone());
        let face_jobs = FaceJobQueue::new(pool.clone(), face_service.clone());
        let notification_service =
            NotificationService::new(pool.clone(), config.progress_webhook_url.clone());

        Self {
            registration_service: RegistrationService::new(pool.clone()),
            exam_service: ExamService::new(pool.clone()),
            attempt_service: AttemptService::new(pool.clone()),
            face_service,
            face_jobs,
            notification_service,
            gamification_service: GamificationService::new(pool.clone()),
            progress_service: ProgressService::new(pool.clone()),
            audit_service: AuditService::new(pool.clone()),
            pool,
        }
    }
}
