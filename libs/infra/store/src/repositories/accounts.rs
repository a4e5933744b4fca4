// [libs/infra/store/src/repositories/accounts.rs]
/*!
 * =================================================================
 * APARATO: ACCOUNT REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA DEL INVENTARIO DE CUENTAS MONITOREADAS
 * =================================================================
 */

use chrono::{DateTime, Utc};
use libsql::{params, Connection};
use tracing::instrument;

use courier_domain_models::Account;

use crate::errors::{StoreError, StoreResult};

pub struct AccountRepository {
    connection: Connection,
}

impl AccountRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    #[instrument(skip(self))]
    pub async fn list_monitored(&self) -> StoreResult<Vec<Account>> {
        let mut rows = self
            .connection
            .query(
                "SELECT username, enabled, last_polled_at, last_seen_post_id FROM accounts WHERE enabled = 1",
                (),
            )
            .await?;

        let mut accounts = Vec::new();
        while let Some(row) = rows.next().await? {
            accounts.push(map_row_to_account(&row)?);
        }
        Ok(accounts)
    }

    pub async fn get(&self, username: &str) -> StoreResult<Account> {
        let mut rows = self
            .connection
            .query(
                "SELECT username, enabled, last_polled_at, last_seen_post_id FROM accounts WHERE username = ?1",
                params![username.to_lowercase()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => map_row_to_account(&row),
            None => Err(StoreError::NotFound(format!("account '{}'", username))),
        }
    }

    #[instrument(skip(self))]
    pub async fn upsert(&self, account: &Account) -> StoreResult<()> {
        self.connection
            .execute(
                r#"
                INSERT INTO accounts (username, enabled, last_polled_at, last_seen_post_id)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(username) DO UPDATE SET enabled = excluded.enabled
                "#,
                params![
                    account.username.as_str().to_lowercase(),
                    account.enabled as i64,
                    account.last_polled_at.map(|t| t.to_rfc3339()),
                    account.last_seen_post_id.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Actualiza atómicamente el cursor de ingesta tras un ciclo de polling exitoso.
    #[instrument(skip(self))]
    pub async fn advance_cursor(
        &self,
        username: &str,
        last_seen_post_id: &str,
        polled_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let affected = self
            .connection
            .execute(
                "UPDATE accounts SET last_seen_post_id = ?1, last_polled_at = ?2 WHERE username = ?3",
                params![
                    last_seen_post_id.to_string(),
                    polled_at.to_rfc3339(),
                    username.to_lowercase(),
                ],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("account '{}'", username)));
        }
        Ok(())
    }
}

fn map_row_to_account(row: &libsql::Row) -> StoreResult<Account> {
    let username: String = row.get(0)?;
    let enabled: i64 = row.get(1)?;
    let last_polled_at: Option<String> = row.get(2)?;
    let last_seen_post_id: Option<String> = row.get(3)?;

    Ok(Account {
        username: username.into(),
        enabled: enabled != 0,
        last_polled_at: last_polled_at
            .map(|s| DateTime::parse_from_rfc3339(&s))
            .transpose()
            .map_err(|e| StoreError::Unavailable(format!("timestamp mapping: {}", e)))?
            .map(|dt| dt.with_timezone(&Utc)),
        last_seen_post_id,
    })
}
