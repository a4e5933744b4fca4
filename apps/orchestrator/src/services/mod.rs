// [apps/orchestrator/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICES TOPOLOGY
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE (ESTRATO L2-APP)
 * RESPONSABILIDAD: DAEMONS DE FONDO DEL PIPELINE INGESTA → ANÁLISIS →
 *                  DESPACHO
 *
 * Flujo de datos entre servicios (todo vía `mpsc` salvo donde se indica):
 *
 *   HTTP POST /ingest/push ──▶ PushSender ──▶ SourceCoordinatorService
 *   scheduler interno (tick)  ───────────────▲
 *                                            │ TriggerSender (coalescido)
 *                                            ▼
 *                              IngestPipelineService ──▶ AnalysisHintSender
 *                                            │
 *                                            ▼ (upsert_post)
 *                                   courier_infra_store::Store
 *                                            ▲
 *                                            │ claim_for_analysis
 *                              AnalysisWorkerPool (N workers + 1 bomba)
 *                                            │ DispatchHintSender
 *                                            ▼
 *                              DispatchWorkerPool (N workers + 1 bomba)
 *
 * `supervisor::supervise` envuelve únicamente a los daemons sin receptor
 * exclusivo (el `RetentionSweeper`); el resto se lanza directamente desde
 * el kernel porque su receptor de canal no se puede reconstruir tras un
 * pánico.
 * =================================================================
 */

pub mod analysis_worker;
pub mod dispatch_worker;
pub mod ingest_pipeline;
pub mod source_coordinator;
pub mod supervisor;
pub mod sweeper;
