// [apps/orchestrator/src/handlers/health.rs]
/*!
 * =================================================================
 * APARATO: HEALTH HANDLER
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: EXPONER MODO OPERACIONAL, TIEMPO DE ACTIVIDAD Y
 *                  MARCAS DE PROGRESO POR COMPONENTE
 * =================================================================
 */

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::state::{mode::SystemMode, AppState};

/// Items currently queued, not the sender's remaining free slots:
/// `Sender::capacity()` reports headroom, which shrinks as the queue
/// fills, the opposite of what `queue_depths` means to a reader.
fn queue_depth<T>(tx: &tokio::sync::mpsc::Sender<T>) -> usize {
    tx.max_capacity() - tx.capacity()
}

pub async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.health.snapshot();
    let status = match state.gate.mode() {
        SystemMode::Operational => "operational",
        SystemMode::Draining => "draining",
    };

    Json(json!({
        "status": status,
        "uptime_s": state.gate.uptime().num_seconds(),
        "queue_depths": {
            "push": queue_depth(&state.queues.push_tx),
            "trigger": queue_depth(&state.queues.trigger_tx),
            "analysis_hint": queue_depth(&state.queues.analysis_hint_tx),
            "dispatch_hint": queue_depth(&state.queues.dispatch_hint_tx),
        },
        "last_progress_per_component": snapshot
            .components
            .into_iter()
            .map(|(name, at)| (name, at.to_rfc3339()))
            .collect::<std::collections::HashMap<_, _>>(),
        "counters": {
            "push_auth_failures": snapshot.push_auth_failures,
            "push_rejected_unmonitored": snapshot.push_rejected_unmonitored,
            "push_coalesced": snapshot.push_coalesced,
            "scheduled_triggers_dropped": snapshot.scheduled_triggers_dropped,
        },
    }))
}
