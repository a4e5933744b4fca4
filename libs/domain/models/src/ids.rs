// [libs/domain/models/src/ids.rs]
/*!
 * =================================================================
 * APARATO: IDENTIFICADORES SOBERANOS (NEWTYPES)
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L1)
 * RESPONSABILIDAD: IDENTIDAD ÚNICA DE ENTIDADES DEL PIPELINE
 * =================================================================
 */

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identificador de post, suministrado por la fuente externa. Único global.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Nombre de cuenta monitoreada. La igualdad y el hash son insensibles a
/// mayúsculas/minúsculas, de modo que `@Foo` y `@foo` colisionan como
/// la misma clave primaria, según exige el invariante de unicidad.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountUsername(pub String);

impl AccountUsername {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PartialEq for AccountUsername {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for AccountUsername {}

impl Hash for AccountUsername {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for AccountUsername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountUsername {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccountUsername {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn account_username_eq_is_case_insensitive() {
        let a = AccountUsername::from("Foo");
        let b = AccountUsername::from("foo");
        assert_eq!(a, b);
    }

    #[test]
    fn account_username_hash_collapses_case_variants_in_a_set() {
        let mut set = HashSet::new();
        set.insert(AccountUsername::from("Foo"));
        set.insert(AccountUsername::from("FOO"));
        set.insert(AccountUsername::from("foo"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn post_id_displays_as_inner_string() {
        let id = PostId::from("123456789");
        assert_eq!(id.to_string(), "123456789");
    }
}
