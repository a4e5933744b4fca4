// [apps/orchestrator/src/handlers/admin.rs]
/*!
 * =================================================================
 * APARATO: ADMIN HANDLERS
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: MUTACIONES ADMINISTRATIVAS FUERA DEL CAMINO
 *                  CRÍTICO — REANÁLISIS MANUAL Y LECTURA/ESCRITURA DE
 *                  AJUSTES EN CALIENTE
 *
 * La re-ejecución de análisis no dispara un redespacho automático: un
 * post reseteado a NEW vuelve a recorrer el pipeline entero, incluyendo
 * un nuevo intento de despacho solo si el análisis resultante produce
 * una fila ANALYZED de nuevo — no hay atajo que salte el despacho de la
 * versión anterior del análisis.
 * =================================================================
 */

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use courier_domain_models::PostId;

use crate::state::AppState;

pub async fn handle_reanalyze(State(state): State<AppState>, Path(post_id): Path<String>) -> (StatusCode, Json<Value>) {
    let post_id = PostId::from(post_id);

    match state.store.reset_for_reanalysis(&post_id).await {
        Ok(()) => {
            let _ = state.queues.analysis_hint_tx.try_send(post_id.clone());
            (StatusCode::OK, Json(json!({"status": "reset_to_new", "post_id": post_id.as_str()})))
        }
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({"error": e.to_string()}))),
    }
}

pub async fn handle_get_setting(State(state): State<AppState>, Path(key): Path<String>) -> (StatusCode, Json<Value>) {
    match state.store.get_setting(&key).await {
        Ok(Some(setting)) => (StatusCode::OK, Json(json!(setting))),
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({"error": "SETTING_NOT_FOUND"}))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))),
    }
}

#[derive(Debug, Deserialize)]
pub struct SetSettingBody {
    pub value: String,
}

pub async fn handle_set_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<SetSettingBody>,
) -> (StatusCode, Json<Value>) {
    match state.store.set_setting(&key, &body.value).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "updated"}))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))),
    }
}
