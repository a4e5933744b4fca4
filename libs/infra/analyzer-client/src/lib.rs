// [libs/infra/analyzer-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COURIER INFRA ANALYZER CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod testing;

pub use client::{AnalysisOutcome, Analyzer, HttpAnalyzer};
pub use errors::AnalyzerError;
