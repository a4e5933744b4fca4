// [libs/domain/models/src/dispatch_record.rs]
/*!
 * =================================================================
 * APARATO: ENTIDAD DISPATCH RECORD
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L1)
 *
 * Bitácora de solo-anexado (append-only); la fila más reciente por
 * (post_id, destination) es canónica. Nunca se actualiza ni se borra
 * una fila existente.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PostId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchOutcome {
    Ok,
    TransientFail,
    PermanentFail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub post_id: PostId,
    pub destination: String,
    pub attempt_number: u32,
    pub outcome: DispatchOutcome,
    pub error_detail: Option<String>,
    pub sent_at: DateTime<Utc>,
}
