// [libs/infra/store/src/repositories/settings.rs]
/*!
 * =================================================================
 * APARATO: SETTING REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PARÁMETROS EDITABLES EN TIEMPO DE EJECUCIÓN
 * =================================================================
 */

use chrono::Utc;
use libsql::{params, Connection};
use tracing::instrument;

use courier_domain_models::Setting;

use crate::errors::{StoreError, StoreResult};

pub struct SettingRepository {
    connection: Connection,
}

impl SettingRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<Setting>> {
        let mut rows = self
            .connection
            .query(
                "SELECT key, value, updated_at FROM settings WHERE key = ?1",
                params![key.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let key: String = row.get(0)?;
                let value: String = row.get(1)?;
                let updated_at: String = row.get(2)?;
                Ok(Some(Setting {
                    key,
                    value,
                    updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
                        .map_err(|e| StoreError::Unavailable(format!("timestamp mapping: {}", e)))?
                        .with_timezone(&Utc),
                }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.connection
            .execute(
                r#"
                INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                params![key.to_string(), value.to_string(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }
}
