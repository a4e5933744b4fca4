// [libs/domain/models/src/post.rs]
/*!
 * =================================================================
 * APARATO: ENTIDAD POST Y MÁQUINA DE ESTADOS
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L1)
 * RESPONSABILIDAD: REPRESENTACIÓN DEL CICLO DE VIDA DE UN POST
 *
 * La máquina de estados es NEW -> ANALYZING -> ANALYZED -> DISPATCHING
 * -> DISPATCHED, con FAILED(reason, retry_after) alcanzable desde
 * ANALYZING o DISPATCHING. Las transiciones fuera de este grafo son un
 * error de invariante y deben ser rechazadas por el Store, no por los
 * llamadores.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountUsername, PostId};

/// Tipo de adjunto multimedia de un post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Gif,
}

/// Adjunto multimedia, opcionalmente descargado a almacenamiento local.
/// La descarga en sí (`local_ref`) está fuera del camino crítico; el
/// campo se modela para no bloquear una extensión futura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub url: String,
    pub local_ref: Option<String>,
}

/// Contadores de interacción de un post en el momento de la ingesta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub reshares: u64,
    pub replies: u64,
}

/// Estado de un post en la máquina de estados del pipeline.
///
/// `Failed` es una variante de estructura, no una etiqueta plana, de modo
/// que la razón del fallo y el instante de reintento viajan junto con el
/// estado en vez de vivir en una columna separada que podría desincronizarse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    New,
    Analyzing,
    Analyzed,
    Dispatching,
    Dispatched,
    Failed {
        reason: String,
        retry_after: Option<DateTime<Utc>>,
    },
}

impl PostStatus {
    /// Nombre de la etiqueta de estado, sin el payload — usado para columnas
    /// SQL de discriminación (`WHERE status = ?`).
    pub fn tag(&self) -> &'static str {
        match self {
            PostStatus::New => "NEW",
            PostStatus::Analyzing => "ANALYZING",
            PostStatus::Analyzed => "ANALYZED",
            PostStatus::Dispatching => "DISPATCHING",
            PostStatus::Dispatched => "DISPATCHED",
            PostStatus::Failed { .. } => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Dispatched | PostStatus::Failed { .. })
    }
}

/// Post ingerido de una cuenta monitoreada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub account: AccountUsername,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub engagement: Engagement,
    pub media: Vec<MediaItem>,
    pub status: PostStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_discards_failed_payload() {
        let status = PostStatus::Failed {
            reason: "timeout".into(),
            retry_after: None,
        };
        assert_eq!(status.tag(), "FAILED");
    }

    #[test]
    fn dispatched_and_failed_are_terminal() {
        assert!(PostStatus::Dispatched.is_terminal());
        assert!(PostStatus::Failed {
            reason: "x".into(),
            retry_after: None
        }
        .is_terminal());
        assert!(!PostStatus::New.is_terminal());
        assert!(!PostStatus::Analyzing.is_terminal());
    }
}
