// [apps/orchestrator/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR LIBRARY ROOT (ESTRATO L3)
 * CLASIFICACIÓN: CRATE ROOT
 * RESPONSABILIDAD: DEFINICIÓN SUPREMA DEL ÁRBOL DE MÓDULOS DEL
 *                  PIPELINE DE INGESTA-ANÁLISIS-DESPACHO
 * =================================================================
 */

/// Carga y validación de la instantánea de configuración del proceso.
pub mod config;
/// Adaptadores de entrada HTTP (salud, intake de push, lectura, admin).
pub mod handlers;
/// Núcleo de mando: arranque ordenado y ciclo de vida del proceso.
pub mod kernel;
/// Guardias perimetrales: verificación de firma de push y modo operativo.
pub mod middleware;
/// Topología de rutas HTTP.
pub mod routes;
/// Daemons de fondo: coordinador de fuentes, workers de análisis/despacho, barredoras.
pub mod services;
/// Estado compartido del proceso (Store, colas, gobernador de tasa).
pub mod state;

pub mod prelude {
    pub use crate::config::ConfigSnapshot;
    pub use crate::kernel::OrchestratorKernel;
    pub use crate::state::AppState;
}
