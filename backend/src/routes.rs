// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assignments, grades, health, reports, take},
    state::AppState,
    utils::jwt::{auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * `/api/take/{token}/...` is opened by the student's magic link.
/// * Everything else under `/api` requires a teacher bearer token.
/// * Applies global middleware (Trace, CORS) and injects `AppState`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let take_routes = Router::new()
        .route("/{token}", get(take::view))
        .route("/{token}/start", post(take::start))
        .route("/{token}/submit", post(take::submit))
        .route("/{token}/answers/{question_id}", put(take::save_answer))
        .route("/{token}/events", post(take::record_event));

    let assignment_routes = Router::new()
        .route("/", post(assignments::create_assignment))
        .route(
            "/{id}",
            get(assignments::get_assignment).delete(assignments::delete_assignment),
        )
        .route("/{id}/answers", get(assignments::list_answers))
        .route(
            "/{id}/answers/{question_id}/score",
            put(assignments::score_answer),
        )
        .route("/{id}/finalize", post(assignments::finalize))
        .route("/{id}/events", get(assignments::list_events));

    let grade_routes = Router::new()
        .route("/", post(grades::create_grade))
        .route("/preview", post(grades::preview_grade))
        .route("/{assignment_id}", get(grades::get_grade));

    let report_routes = Router::new().route("/{exam_id}/report", get(reports::exam_report));

    // Auth runs first, then the role check.
    let teacher_routes = Router::new()
        .nest("/assignments", assignment_routes)
        .nest("/grades", grade_routes)
        .nest("/exams", report_routes)
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/take", take_routes)
        .nest("/api", teacher_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
