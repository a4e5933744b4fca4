// [apps/orchestrator/src/middleware.rs]
/*!
 * =================================================================
 * APARATO: PERIMETER GUARDS
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VERIFICACIÓN DE FIRMA DE WEBHOOKS DE PUSH Y
 *                  REJILLA DE SALUD OPERACIONAL
 *
 * La verificación de firma es una función pura sobre bytes crudos, no
 * una capa de `axum::middleware` — el cuerpo debe llegar sin tocar al
 * extractor JSON para que el hash coincida con lo que firmó el remitente.
 * El handler de `/ingest/push` la invoca él mismo antes de deserializar.
 * =================================================================
 */

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Compara `X-Signature` contra HMAC-SHA256(body, secret) en tiempo
/// constante. La firma recibida debe venir en hex minúscula.
pub fn verify_push_signature(body: &[u8], signature_header: &str, secret: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    let expected_hex = hex::encode(expected);

    expected_hex.as_bytes().ct_eq(signature_header.as_bytes()).into()
}

/// Bloquea el tráfico de intake cuando el proceso está drenando.
pub async fn health_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.gate.accepts_intake() {
        warn!("⛔ [INTAKE_BLOCKED]: process is draining, rejecting new intake");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "PROCESS_DRAINING",
                "retry_after": 30
            })),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_push_signature_accepts_matching_hmac() {
        let body = b"{\"account\":\"alice\"}";
        let secret = "shh";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_push_signature(body, &signature, secret));
    }

    #[test]
    fn verify_push_signature_rejects_tampered_body() {
        let body = b"{\"account\":\"alice\"}";
        let secret = "shh";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(b"{\"account\":\"mallory\"}");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(!verify_push_signature(body, &signature, secret));
    }

    #[test]
    fn verify_push_signature_rejects_malformed_hex() {
        assert!(!verify_push_signature(b"irrelevant", "not-hex", "shh"));
    }
}
