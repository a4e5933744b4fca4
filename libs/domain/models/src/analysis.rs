// [libs/domain/models/src/analysis.rs]
/*!
 * =================================================================
 * APARATO: ENTIDAD ANALYSIS
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L1)
 *
 * Existe si y solo si el Post asociado alcanzó alguna vez ANALYZED;
 * inmutable una vez escrita. Una re-análisis produce una fila nueva que
 * reemplaza a la anterior como la "última" (uno-a-uno con el intento
 * más reciente), no una mutación in-place.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::PostId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub post_id: PostId,
    pub model: String,
    pub parameters_snapshot: Value,
    pub prompt_snapshot: String,
    pub output_text: String,
    pub tokens_used: u64,
    pub cost_estimate: f64,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}
