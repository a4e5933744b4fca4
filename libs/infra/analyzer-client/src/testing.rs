// [libs/infra/analyzer-client/src/testing.rs]
/*!
 * =================================================================
 * APARATO: ANALYZER CLIENT — DOBLE DE PRUEBA
 * CLASIFICACIÓN: TEST SUPPORT (ESTRATO L3)
 * =================================================================
 */

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{AnalysisOutcome, Analyzer};
use crate::errors::AnalyzerError;

/// Devuelve siempre el mismo resultado escriptado, sin llamar a ningún
/// proveedor LLM real.
pub struct FakeAnalyzer {
    outcome: Result<AnalysisOutcome, String>,
}

impl FakeAnalyzer {
    pub fn always_succeeding(text: impl Into<String>, tokens_used: u64, cost_estimate: f64) -> Self {
        Self {
            outcome: Ok(AnalysisOutcome {
                text: text.into(),
                tokens_used,
                cost_estimate,
            }),
        }
    }

    pub fn always_rejecting(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
        }
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(
        &self,
        _prompt: &str,
        _model: &str,
        _params: &Value,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        self.outcome
            .clone()
            .map_err(AnalyzerError::ModelRejected)
    }
}
