// [libs/infra/store/src/repositories/dispatch_records.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH RECORD REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: BITÁCORA DE SOLO-ANEXADO DE INTENTOS DE DESPACHO
 * =================================================================
 */

use libsql::{params, Connection};
use tracing::instrument;

use courier_domain_models::{DispatchOutcome, DispatchRecord};

use crate::errors::StoreResult;

pub struct DispatchRecordRepository {
    connection: Connection,
}

impl DispatchRecordRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self, record))]
    pub async fn append(&self, record: &DispatchRecord) -> StoreResult<()> {
        let outcome_tag = match record.outcome {
            DispatchOutcome::Ok => "OK",
            DispatchOutcome::TransientFail => "TRANSIENT_FAIL",
            DispatchOutcome::PermanentFail => "PERMANENT_FAIL",
        };

        self.connection
            .execute(
                r#"
                INSERT INTO dispatch_records (
                    post_id, destination, attempt_number, outcome, error_detail, sent_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    record.post_id.as_str().to_string(),
                    record.destination.clone(),
                    record.attempt_number as i64,
                    outcome_tag.to_string(),
                    record.error_detail.clone(),
                    record.sent_at.to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Número del intento más reciente registrado para (post, destino), o 0
    /// si nunca se intentó — usado para calcular el próximo `attempt_number`
    /// y el back-off exponencial correspondiente.
    #[instrument(skip(self))]
    pub async fn latest_attempt_number(&self, post_id: &str, destination: &str) -> StoreResult<u32> {
        let mut rows = self
            .connection
            .query(
                r#"
                SELECT attempt_number FROM dispatch_records
                WHERE post_id = ?1 AND destination = ?2
                ORDER BY sent_at DESC LIMIT 1
                "#,
                params![post_id.to_string(), destination.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u32),
            None => Ok(0),
        }
    }
}
