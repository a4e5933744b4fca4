// [apps/orchestrator/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: HTTP HANDLERS
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TRADUCIR PETICIONES HTTP A OPERACIONES SOBRE EL
 *                  ESTADO COMPARTIDO, Y SUS RESULTADOS DE VUELTA A
 *                  RESPUESTAS JSON
 * =================================================================
 */

pub mod admin;
pub mod health;
pub mod posts;
pub mod push;
