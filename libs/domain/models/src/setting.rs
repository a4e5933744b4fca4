// [libs/domain/models/src/setting.rs]
/*!
 * =================================================================
 * APARATO: ENTIDAD SETTING
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L1)
 * RESPONSABILIDAD: PARÁMETROS EDITABLES EN TIEMPO DE EJECUCIÓN
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            updated_at,
        }
    }
}
