// [apps/orchestrator/src/handlers/push.rs]
/*!
 * =================================================================
 * APARATO: PUSH INTAKE HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: VERIFICAR LA FIRMA DE WEBHOOKS ENTRANTES, RESOLVER
 *                  LA CUENTA MENCIONADA Y ENCOLAR UN DISPARADOR DE
 *                  INGESTA COALESCIBLE; TAMBIÉN SIRVE EL DISPARO
 *                  FORZADO DE ADMINISTRACIÓN
 *
 * La firma se verifica sobre los bytes crudos del cuerpo, antes de
 * cualquier intento de interpretarlos como JSON — un cuerpo que no
 * parsea pero cuya firma es válida sigue contando como intento de
 * autenticación fallido en la clasificación 400 vs 401.
 * =================================================================
 */

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use courier_domain_models::AccountUsername;

use crate::middleware::verify_push_signature;
use crate::services::source_coordinator::{PollTrigger, PushSignal, TriggerReason};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-signature";

pub async fn handle_push(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> (StatusCode, Json<Value>) {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok()) else {
        state.health.record_push_auth_failure();
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "MISSING_SIGNATURE"})));
    };

    if !verify_push_signature(&body, signature, &state.config.push_shared_secret) {
        state.health.record_push_auth_failure();
        warn!("🔒 [PUSH_AUTH_FAILED]: signature mismatch");
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "SIGNATURE_MISMATCH"})));
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "MALFORMED_BODY"})));
        }
    };

    let Some(username) = crate::services::source_coordinator::extract_username(&payload) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "UNRECOGNIZED_PAYLOAD_SHAPE"})));
    };

    let account = AccountUsername::from(username);

    match state.store.get_account(account.as_str()).await {
        Ok(record) if record.enabled => {}
        Ok(_) => {
            state.health.record_push_rejected_unmonitored();
            return (StatusCode::FORBIDDEN, Json(json!({"error": "ACCOUNT_DISABLED"})));
        }
        Err(_) => {
            state.health.record_push_rejected_unmonitored();
            return (StatusCode::FORBIDDEN, Json(json!({"error": "ACCOUNT_NOT_MONITORED"})));
        }
    }

    let signal = PushSignal {
        account,
        received_at: Utc::now(),
    };

    match state.queues.push_tx.try_send(signal) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({"status": "queued"}))),
        Err(_) => {
            warn!("📡 [PUSH_QUEUE_SATURATED]: dropping push intake");
            (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": "QUEUE_SATURATED"})))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ForcePollParams {
    pub account: String,
}

/// Disparo administrativo que evita la rejilla de coalescing del
/// `SourceCoordinator` por completo: se emite directamente como
/// `TriggerReason::Forced` hacia el pipeline de ingesta.
pub async fn handle_force_poll(
    State(state): State<AppState>,
    Query(params): Query<ForcePollParams>,
) -> (StatusCode, Json<Value>) {
    let account = AccountUsername::from(params.account);

    if state.store.get_account(account.as_str()).await.is_err() {
        return (StatusCode::FORBIDDEN, Json(json!({"error": "ACCOUNT_NOT_MONITORED"})));
    }

    let trigger = PollTrigger {
        account,
        reason: TriggerReason::Forced,
    };

    match state.queues.trigger_tx.try_send(trigger) {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({"status": "queued"}))),
        Err(_) => (StatusCode::TOO_MANY_REQUESTS, Json(json!({"error": "QUEUE_SATURATED"}))),
    }
}
