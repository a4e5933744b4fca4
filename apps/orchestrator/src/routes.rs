// [apps/orchestrator/src/routes.rs]
/*!
 * =================================================================
 * APARATO: HTTP ROUTING MATRIX
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: COMPOSICIÓN DE LA SUPERFICIE HTTP DEL PIPELINE:
 *                  SALUD, INTAKE DE PUSH, Y APIS DE LECTURA/ADMIN
 * =================================================================
 */

use std::time::Duration;

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{admin, health, posts, push};
use crate::middleware::health_guard;
use crate::state::AppState;

pub fn build_router(application_shared_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let ingest_stratum = Router::new()
        .route("/push", post(push::handle_push))
        .route("/poll/force", post(push::handle_force_poll))
        .layer(middleware::from_fn_with_state(application_shared_state.clone(), health_guard));

    let read_stratum = Router::new()
        .route("/posts", get(posts::handle_list_posts))
        .route("/posts/:id", get(posts::handle_get_post))
        .route("/posts/:id/analysis", get(posts::handle_get_analysis))
        .route("/stats", get(posts::handle_stats));

    let admin_stratum = Router::new()
        .route("/posts/:id/reanalyze", post(admin::handle_reanalyze))
        .route("/settings/:key", get(admin::handle_get_setting).post(admin::handle_set_setting));

    Router::new()
        .route("/health", get(health::handle_health))
        .nest("/ingest", ingest_stratum)
        .nest("/api/v1", read_stratum)
        .nest("/admin", admin_stratum)
        .layer(cors)
        .with_state(application_shared_state)
}

