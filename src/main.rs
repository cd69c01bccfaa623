use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use elearning_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, rate_limit},
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Outbox delivery worker.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.notification_service.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Outbox worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    // Face enrollment worker.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.face_jobs.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(750)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Face job worker error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    // Deadline sweeper: expired IN_PROGRESS attempts become SUBMITTED.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state
                    .attempt_service
                    .sweep_deadlines(&state.notification_service, &state.progress_service)
                    .await
                {
                    Ok(0) => {}
                    Ok(n) => info!(count = n, "Swept expired attempts"),
                    Err(e) => tracing::error!(error = ?e, "Deadline sweeper error"),
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let student_api = Router::new()
        .route("/api/student/exams", get(routes::student::list_exams))
        .route(
            "/api/student/exams/:exam_id/register",
            post(routes::student::register),
        )
        .route(
            "/api/student/registrations",
            get(routes::student::my_registrations),
        )
        .route(
            "/api/student/exams/:exam_id/start",
            post(routes::student::start_exam),
        )
        .route(
            "/api/student/attempts/:id",
            get(routes::student::attempt_status),
        )
        .route(
            "/api/student/attempts/:id/submit",
            post(routes::student::submit_attempt),
        )
        .route(
            "/api/student/attempts/:id/violations",
            post(routes::student::report_violation),
        )
        .route(
            "/api/student/face-template",
            post(routes::student::enroll_face),
        )
        .route("/api/student/progress", get(routes::student::my_progress))
        .route("/api/student/xp", get(routes::student::my_xp))
        .layer(from_fn(auth::require_student))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.student_rps),
            rate_limit::rps_middleware,
        ));

    let staff_api = Router::new()
        .route(
            "/api/staff/exams",
            get(routes::staff::list_exams).post(routes::staff::create_exam),
        )
        .route(
            "/api/staff/exams/:exam_id",
            get(routes::staff::get_exam)
                .patch(routes::staff::update_exam)
                .delete(routes::staff::delete_exam),
        )
        .route(
            "/api/staff/exams/:exam_id/questions",
            get(routes::staff::exam_questions),
        )
        .route(
            "/api/staff/exams/:exam_id/registrations",
            get(routes::staff::list_registrations),
        )
        .route(
            "/api/staff/registrations/:id",
            patch(routes::staff::update_registration),
        )
        .route(
            "/api/staff/exams/:exam_id/attempts",
            get(routes::staff::list_attempts),
        )
        .route(
            "/api/staff/attempts/:id/violations",
            get(routes::staff::list_violations),
        )
        .route(
            "/api/staff/violations/:id/review",
            patch(routes::staff::review_violation),
        )
        .layer(from_fn(auth::require_staff))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.staff_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(student_api)
        .merge(staff_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
