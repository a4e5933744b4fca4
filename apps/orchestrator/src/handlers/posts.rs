// [apps/orchestrator/src/handlers/posts.rs]
/*!
 * =================================================================
 * APARATO: READ API HANDLERS
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONSULTAS PAGINADAS DE SOLO LECTURA SOBRE POSTS,
 *                  SUS ANÁLISIS Y ESTADÍSTICAS AGREGADAS POR ESTADO,
 *                  PARA EL TABLERO DE OPERACIÓN
 *
 * Sin caché ni proyección: cada petición golpea el Store directamente.
 * El contrato solo exige paginación y filtro por cuenta/estado, nada
 * sobre latencia de lectura — no hay presupuesto que justifique una
 * capa de agregación encima del Store.
 * =================================================================
 */

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use courier_domain_models::PostId;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPostsParams {
    pub account: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn handle_list_posts(
    State(state): State<AppState>,
    Query(params): Query<ListPostsParams>,
) -> (StatusCode, Json<Value>) {
    let limit = params.limit.min(200);

    match state
        .store
        .list_posts(
            params.account.as_deref(),
            params.status.as_deref(),
            limit,
            params.offset,
        )
        .await
    {
        Ok(posts) => (StatusCode::OK, Json(json!({"posts": posts, "limit": limit, "offset": params.offset}))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))),
    }
}

pub async fn handle_get_post(State(state): State<AppState>, Path(post_id): Path<String>) -> (StatusCode, Json<Value>) {
    match state.store.get_post(&PostId::from(post_id)).await {
        Ok(post) => (StatusCode::OK, Json(json!(post))),
        Err(_) => (StatusCode::NOT_FOUND, Json(json!({"error": "POST_NOT_FOUND"}))),
    }
}

pub async fn handle_get_analysis(State(state): State<AppState>, Path(post_id): Path<String>) -> (StatusCode, Json<Value>) {
    match state.store.get_latest_analysis(&PostId::from(post_id)).await {
        Ok(analysis) => (StatusCode::OK, Json(json!(analysis))),
        Err(_) => (StatusCode::NOT_FOUND, Json(json!({"error": "ANALYSIS_NOT_FOUND"}))),
    }
}

const STATUS_TAGS: [&str; 6] = ["NEW", "ANALYZING", "ANALYZED", "DISPATCHING", "DISPATCHED", "FAILED"];

pub async fn handle_stats(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mut counts = std::collections::HashMap::new();

    for tag in STATUS_TAGS {
        let mut total: u64 = 0;
        let mut offset = 0u32;
        loop {
            match state.store.list_posts(None, Some(tag), 500, offset).await {
                Ok(batch) => {
                    let fetched = batch.len() as u32;
                    total += fetched as u64;
                    if fetched < 500 {
                        break;
                    }
                    offset += 500;
                }
                Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))),
            }
        }
        counts.insert(tag.to_string(), total);
    }

    (StatusCode::OK, Json(json!({"counts_by_status": counts})))
}
