// [libs/infra/store/src/repositories/analyses.rs]
/*!
 * =================================================================
 * APARATO: ANALYSIS REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA INMUTABLE DE RESULTADOS DE ANÁLISIS
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use tracing::instrument;

use courier_domain_models::Analysis;

use crate::errors::{StoreError, StoreResult};

pub struct AnalysisRepository {
    connection: Connection,
}

impl AnalysisRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Escribe una fila de análisis. Inmutable una vez escrita: una
    /// re-análisis crea una fila nueva, nunca muta la anterior.
    #[instrument(skip(self, analysis))]
    pub async fn insert(&self, analysis: &Analysis) -> StoreResult<()> {
        self.connection
            .execute(
                r#"
                INSERT INTO analyses (
                    post_id, model, parameters_snapshot, prompt_snapshot,
                    output_text, tokens_used, cost_estimate, elapsed_ms, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    analysis.post_id.as_str().to_string(),
                    analysis.model.clone(),
                    analysis.parameters_snapshot.to_string(),
                    analysis.prompt_snapshot.clone(),
                    analysis.output_text.clone(),
                    analysis.tokens_used as i64,
                    analysis.cost_estimate,
                    analysis.elapsed_ms as i64,
                    analysis.created_at.to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn latest_for_post(&self, post_id: &str) -> StoreResult<Analysis> {
        let mut rows = self
            .connection
            .query(
                r#"
                SELECT post_id, model, parameters_snapshot, prompt_snapshot,
                       output_text, tokens_used, cost_estimate, elapsed_ms, created_at
                FROM analyses WHERE post_id = ?1
                ORDER BY created_at DESC LIMIT 1
                "#,
                params![post_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let post_id: String = row.get(0)?;
                let model: String = row.get(1)?;
                let parameters_snapshot: String = row.get(2)?;
                let prompt_snapshot: String = row.get(3)?;
                let output_text: String = row.get(4)?;
                let tokens_used: i64 = row.get(5)?;
                let cost_estimate: f64 = row.get(6)?;
                let elapsed_ms: i64 = row.get(7)?;
                let created_at: String = row.get(8)?;

                Ok(Analysis {
                    post_id: post_id.into(),
                    model,
                    parameters_snapshot: serde_json::from_str(&parameters_snapshot)
                        .map_err(|e| StoreError::Unavailable(format!("parameters mapping: {}", e)))?,
                    prompt_snapshot,
                    output_text,
                    tokens_used: tokens_used as u64,
                    cost_estimate,
                    elapsed_ms: elapsed_ms as u64,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map_err(|e| StoreError::Unavailable(format!("timestamp mapping: {}", e)))?
                        .with_timezone(&Utc),
                })
            }
            None => Err(StoreError::NotFound(format!("analysis for post '{}'", post_id))),
        }
    }

    /// Suma de `cost_estimate` para las filas creadas a partir de `since`.
    /// Sostiene el techo de costo diario configurable del pool de análisis.
    #[instrument(skip(self))]
    pub async fn cumulative_cost_since(&self, since: DateTime<Utc>) -> StoreResult<f64> {
        let mut rows = self
            .connection
            .query(
                "SELECT COALESCE(SUM(cost_estimate), 0.0) FROM analyses WHERE created_at >= ?1",
                params![since.to_rfc3339()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<f64>(0)?),
            None => Ok(0.0),
        }
    }
}
