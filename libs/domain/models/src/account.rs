// [libs/domain/models/src/account.rs]
/*!
 * =================================================================
 * APARATO: ENTIDAD ACCOUNT
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L1)
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AccountUsername;

/// Cuenta monitoreada del origen externo. Creada por mutación administrativa;
/// `last_polled_at`/`last_seen_post_id` son mutados exclusivamente por el
/// pipeline de ingesta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub username: AccountUsername,
    pub enabled: bool,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub last_seen_post_id: Option<String>,
}

impl Account {
    pub fn new(username: impl Into<AccountUsername>) -> Self {
        Self {
            username: username.into(),
            enabled: true,
            last_polled_at: None,
            last_seen_post_id: None,
        }
    }
}
