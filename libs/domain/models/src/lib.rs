// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COURIER DOMAIN MODELS (SINGLE SOURCE OF TRUTH)
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L1)
 * RESPONSABILIDAD: DEFINICIONES DE TIPOS COMPARTIDOS Y ENTIDADES DEL
 *                  DOMINIO PARA EL PIPELINE DE INGESTA-ANÁLISIS-DESPACHO
 * =================================================================
 */

pub mod account;
pub mod analysis;
pub mod dispatch_record;
pub mod errors;
pub mod ids;
pub mod post;
pub mod setting;

pub use account::Account;
pub use analysis::Analysis;
pub use dispatch_record::{DispatchOutcome, DispatchRecord};
pub use errors::{Classified, ErrorKind};
pub use ids::{AccountUsername, PostId};
pub use post::{Engagement, MediaItem, MediaKind, Post, PostStatus};
pub use setting::Setting;
