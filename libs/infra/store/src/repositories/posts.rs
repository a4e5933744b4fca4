// [libs/infra/store/src/repositories/posts.rs]
/*!
 * =================================================================
 * APARATO: POST REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA IDEMPOTENTE Y MÁQUINA DE ESTADOS DE POST
 *
 * # Mathematical Proof (Transactional Exclusivity):
 * `claim_for_analysis`/`claim_for_dispatch` encapsulan la búsqueda y la
 * transición de estado dentro de la misma transacción serializable, de
 * modo que dos workers concurrentes jamás observen el mismo conjunto de
 * filas elegibles — generalización por lote del candado de misión único
 * usado en el resto del ecosistema.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::{params, Connection, Row};
use tracing::{info, instrument, warn};

use courier_domain_models::{Engagement, MediaItem, Post, PostId, PostStatus};

use crate::errors::{StoreError, StoreResult};

pub struct PostRepository {
    connection: Connection,
}

impl PostRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Inserta un post si no existe; si ya existe, solo refresca los
    /// contadores de interacción. Nunca sobreescribe `status`, `text`, ni
    /// ningún otro campo de un post preexistente.
    #[instrument(skip(self, post))]
    pub async fn upsert(&self, post: &Post) -> StoreResult<bool> {
        let media_json = serde_json::to_string(&post.media)
            .map_err(|e| StoreError::Unavailable(format!("media serialization: {}", e)))?;

        let inserted_rows = self
            .connection
            .execute(
                r#"
                INSERT OR IGNORE INTO posts (
                    id, account, text, created_at, ingested_at,
                    likes, reshares, replies, media_json, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'NEW')
                "#,
                params![
                    post.id.as_str().to_string(),
                    post.account.as_str().to_lowercase(),
                    post.text.clone(),
                    post.created_at.to_rfc3339(),
                    post.ingested_at.to_rfc3339(),
                    post.engagement.likes as i64,
                    post.engagement.reshares as i64,
                    post.engagement.replies as i64,
                    media_json,
                ],
            )
            .await?;

        if inserted_rows == 0 {
            self.connection
                .execute(
                    "UPDATE posts SET likes = ?1, reshares = ?2, replies = ?3 WHERE id = ?4",
                    params![
                        post.engagement.likes as i64,
                        post.engagement.reshares as i64,
                        post.engagement.replies as i64,
                        post.id.as_str().to_string(),
                    ],
                )
                .await?;
        }

        Ok(inserted_rows == 1)
    }

    /// Transiciona hasta `batch_size` posts NEW -> ANALYZING, más antiguos
    /// primero, incluyendo los que regresaron a NEW con un `retry_after` ya
    /// vencido.
    #[instrument(skip(self))]
    pub async fn claim_for_analysis(&self, batch_size: usize) -> StoreResult<Vec<Post>> {
        self.claim_batch("NEW", "ANALYZING", batch_size).await
    }

    /// Transiciona hasta `batch_size` posts ANALYZED -> DISPATCHING, más
    /// antiguos primero (garantiza el FIFO por `created_at` exigido para el
    /// orden de despacho por destino).
    #[instrument(skip(self))]
    pub async fn claim_for_dispatch(&self, batch_size: usize) -> StoreResult<Vec<Post>> {
        self.claim_batch("ANALYZED", "DISPATCHING", batch_size).await
    }

    async fn claim_batch(
        &self,
        from_status: &str,
        to_status: &str,
        batch_size: usize,
    ) -> StoreResult<Vec<Post>> {
        let transaction = self
            .connection
            .transaction()
            .await
            .map_err(|e| StoreError::Unavailable(format!("transaction open failed: {}", e)))?;

        let now = Utc::now().to_rfc3339();

        let mut candidate_rows = transaction
            .query(
                r#"
                SELECT id FROM posts
                WHERE status = ?1 AND (retry_after IS NULL OR retry_after <= ?2)
                ORDER BY created_at ASC
                LIMIT ?3
                "#,
                params![from_status.to_string(), now.clone(), batch_size as i64],
            )
            .await?;

        let mut claimed_ids = Vec::new();
        while let Some(row) = candidate_rows.next().await? {
            claimed_ids.push(row.get::<String>(0)?);
        }

        if claimed_ids.is_empty() {
            transaction
                .commit()
                .await
                .map_err(|e| StoreError::Unavailable(format!("transaction commit failed: {}", e)))?;
            return Ok(Vec::new());
        }

        for id in &claimed_ids {
            transaction
                .execute(
                    "UPDATE posts SET status = ?1, failure_reason = NULL, retry_after = NULL WHERE id = ?2",
                    params![to_status.to_string(), id.clone()],
                )
                .await?;
        }

        let mut claimed = Vec::with_capacity(claimed_ids.len());
        for id in &claimed_ids {
            let mut row_result = transaction
                .query(
                    r#"
                    SELECT id, account, text, created_at, ingested_at,
                           likes, reshares, replies, media_json, status,
                           failure_reason, retry_after
                    FROM posts WHERE id = ?1
                    "#,
                    params![id.clone()],
                )
                .await?;
            if let Some(row) = row_result.next().await? {
                claimed.push(map_row_to_post(&row)?);
            }
        }

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Unavailable(format!("transaction commit failed: {}", e)))?;

        info!(
            "claimed {} post(s) {} -> {}",
            claimed.len(),
            from_status,
            to_status
        );

        Ok(claimed)
    }

    /// Transiciona ANALYZING -> ANALYZED. Se invoca junto con la escritura de
    /// la fila `Analysis` en la misma unidad atómica por el Store compuesto.
    #[instrument(skip(self))]
    pub async fn mark_analyzed(&self, post_id: &PostId) -> StoreResult<()> {
        self.transition(post_id, "ANALYZING", "ANALYZED", None, None)
            .await
    }

    /// ANALYZING -> NEW (reintentable) o ANALYZING -> FAILED (permanente).
    #[instrument(skip(self))]
    pub async fn fail_analysis(
        &self,
        post_id: &PostId,
        reason: &str,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let target = if retry_after.is_some() { "NEW" } else { "FAILED" };
        self.transition(post_id, "ANALYZING", target, Some(reason), retry_after)
            .await
    }

    /// DISPATCHING -> DISPATCHED.
    #[instrument(skip(self))]
    pub async fn mark_dispatched(&self, post_id: &PostId) -> StoreResult<()> {
        self.transition(post_id, "DISPATCHING", "DISPATCHED", None, None)
            .await
    }

    /// DISPATCHING -> ANALYZED (reintentable, con `retry_after`) o
    /// DISPATCHING -> FAILED (permanente).
    #[instrument(skip(self))]
    pub async fn fail_dispatch(
        &self,
        post_id: &PostId,
        reason: &str,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let target = if retry_after.is_some() {
            "ANALYZED"
        } else {
            "FAILED"
        };
        self.transition(post_id, "DISPATCHING", target, Some(reason), retry_after)
            .await
    }

    async fn transition(
        &self,
        post_id: &PostId,
        from_status: &str,
        to_status: &str,
        reason: Option<&str>,
        retry_after: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let affected = self
            .connection
            .execute(
                r#"
                UPDATE posts SET status = ?1, failure_reason = ?2, retry_after = ?3
                WHERE id = ?4 AND status = ?5
                "#,
                params![
                    to_status.to_string(),
                    reason.map(|r| r.to_string()),
                    retry_after.map(|t| t.to_rfc3339()),
                    post_id.as_str().to_string(),
                    from_status.to_string(),
                ],
            )
            .await?;

        if affected == 0 {
            warn!(
                "transition {} -> {} rejected for post {}: not currently {}",
                from_status,
                to_status,
                post_id,
                from_status
            );
            return Err(StoreError::Conflict(format!(
                "post {} is not in expected state {}",
                post_id, from_status
            )));
        }

        Ok(())
    }

    pub async fn get(&self, post_id: &PostId) -> StoreResult<Post> {
        let mut rows = self
            .connection
            .query(
                r#"
                SELECT id, account, text, created_at, ingested_at,
                       likes, reshares, replies, media_json, status,
                       failure_reason, retry_after
                FROM posts WHERE id = ?1
                "#,
                params![post_id.as_str().to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => map_row_to_post(&row),
            None => Err(StoreError::NotFound(format!("post '{}'", post_id))),
        }
    }

    const LIST_COLUMNS: &'static str = r#"
        SELECT id, account, text, created_at, ingested_at,
               likes, reshares, replies, media_json, status,
               failure_reason, retry_after
        FROM posts
    "#;

    /// Listado paginado y filtrable para las APIs de lectura (UI, fuera de
    /// alcance del núcleo salvo por este contrato de solo lectura). Las
    /// cuatro combinaciones de filtro se enumeran explícitamente en vez de
    /// construir SQL dinámico, para mantener cada consulta preparada y
    /// auditable.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        account: Option<&str>,
        status: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> StoreResult<Vec<Post>> {
        let mut rows = match (account, status) {
            (Some(a), Some(s)) => {
                self.connection
                    .query(
                        &format!(
                            "{} WHERE account = ?1 AND status = ?2 ORDER BY created_at DESC LIMIT ?3 OFFSET ?4",
                            Self::LIST_COLUMNS
                        ),
                        params![a.to_lowercase(), s.to_string(), limit as i64, offset as i64],
                    )
                    .await?
            }
            (Some(a), None) => {
                self.connection
                    .query(
                        &format!(
                            "{} WHERE account = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                            Self::LIST_COLUMNS
                        ),
                        params![a.to_lowercase(), limit as i64, offset as i64],
                    )
                    .await?
            }
            (None, Some(s)) => {
                self.connection
                    .query(
                        &format!(
                            "{} WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                            Self::LIST_COLUMNS
                        ),
                        params![s.to_string(), limit as i64, offset as i64],
                    )
                    .await?
            }
            (None, None) => {
                self.connection
                    .query(
                        &format!(
                            "{} ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
                            Self::LIST_COLUMNS
                        ),
                        params![limit as i64, offset as i64],
                    )
                    .await?
            }
        };

        let mut posts = Vec::new();
        while let Some(row) = rows.next().await? {
            posts.push(map_row_to_post(&row)?);
        }
        Ok(posts)
    }

    /// Purga posts en estado terminal (DISPATCHED o FAILED) cuyo `created_at`
    /// cayó fuera de la ventana de retención. Nunca toca NEW, ANALYZING,
    /// ANALYZED ni DISPATCHING.
    #[instrument(skip(self))]
    pub async fn delete_terminal_older_than(&self, days: i64) -> StoreResult<u64> {
        let floor = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let deleted = self
            .connection
            .execute(
                r#"
                DELETE FROM posts
                WHERE created_at < ?1 AND status IN ('DISPATCHED', 'FAILED')
                "#,
                params![floor],
            )
            .await?;
        Ok(deleted)
    }

    /// Mayor `created_at` entre los posts ya conocidos de una cuenta. Usado
    /// por la ingesta para decidir si un post recién visto es retroactivo
    /// (anterior al punto más alto ya ingerido) cuando `allow_backdated_posts`
    /// está desactivado.
    #[instrument(skip(self))]
    pub async fn highest_known_created_at(&self, account: &str) -> StoreResult<Option<DateTime<Utc>>> {
        let mut rows = self
            .connection
            .query(
                "SELECT MAX(created_at) FROM posts WHERE account = ?1",
                params![account.to_lowercase()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let raw: Option<String> = row.get(0)?;
                raw.map(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| StoreError::Unavailable(format!("timestamp mapping: {}", e)))
                })
                .transpose()
            }
            None => Ok(None),
        }
    }

    /// Restablece un post ya terminal (ANALYZED, DISPATCHED o FAILED) a NEW
    /// para forzar un nuevo ciclo de análisis. Nunca interrumpe un post
    /// actualmente en vuelo (ANALYZING/DISPATCHING).
    #[instrument(skip(self))]
    pub async fn reset_for_reanalysis(&self, post_id: &PostId) -> StoreResult<()> {
        let affected = self
            .connection
            .execute(
                r#"
                UPDATE posts SET status = 'NEW', failure_reason = NULL, retry_after = NULL
                WHERE id = ?1 AND status IN ('ANALYZED', 'DISPATCHED', 'FAILED')
                "#,
                params![post_id.as_str().to_string()],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::Conflict(format!(
                "post {} is not in a resettable state",
                post_id
            )));
        }

        Ok(())
    }
}

fn map_row_to_post(row: &Row) -> StoreResult<Post> {
    let id: String = row.get(0)?;
    let account: String = row.get(1)?;
    let text: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let ingested_at: String = row.get(4)?;
    let likes: i64 = row.get(5)?;
    let reshares: i64 = row.get(6)?;
    let replies: i64 = row.get(7)?;
    let media_json: String = row.get(8)?;
    let status_tag: String = row.get(9)?;
    let failure_reason: Option<String> = row.get(10)?;
    let retry_after: Option<String> = row.get(11)?;

    let media: Vec<MediaItem> = serde_json::from_str(&media_json)
        .map_err(|e| StoreError::Unavailable(format!("media mapping: {}", e)))?;

    let parse_ts = |s: &str| -> StoreResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Unavailable(format!("timestamp mapping: {}", e)))
    };

    let retry_after_parsed = retry_after.map(|s| parse_ts(&s)).transpose()?;

    let status = match status_tag.as_str() {
        "NEW" => PostStatus::New,
        "ANALYZING" => PostStatus::Analyzing,
        "ANALYZED" => PostStatus::Analyzed,
        "DISPATCHING" => PostStatus::Dispatching,
        "DISPATCHED" => PostStatus::Dispatched,
        "FAILED" => PostStatus::Failed {
            reason: failure_reason.unwrap_or_default(),
            retry_after: retry_after_parsed,
        },
        other => {
            return Err(StoreError::InvariantViolation(format!(
                "unknown post status tag '{}'",
                other
            )))
        }
    };

    Ok(Post {
        id: id.into(),
        account: account.into(),
        text,
        created_at: parse_ts(&created_at)?,
        ingested_at: parse_ts(&ingested_at)?,
        engagement: Engagement {
            likes: likes as u64,
            reshares: reshares as u64,
            replies: replies as u64,
        },
        media,
        status,
    })
}
