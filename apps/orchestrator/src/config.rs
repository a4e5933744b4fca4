// [apps/orchestrator/src/config.rs]
/*!
 * =================================================================
 * APARATO: CONFIG SNAPSHOT (ESTRATO L1-APP)
 * CLASIFICACIÓN: APPLICATION CONFIGURATION
 * RESPONSABILIDAD: INSTANTÁNEA INMUTABLE DE CONFIGURACIÓN DE PROCESO
 *
 * Centraliza las llamadas `std::env::var(...).unwrap_or_else(...)` que
 * el kernel del orquestador esparcía antes en `main.rs`, de modo que
 * reglas de piso/defecto (p.ej. `poll_interval_s` con piso de 30s) se
 * apliquen en un único lugar y sean verificables sin levantar el
 * proceso completo. El subconjunto editable en caliente vive en
 * `Setting` (ver `courier-infra-store`), no aquí: esta instantánea se
 * construye una única vez, al arranque.
 * =================================================================
 */

use std::time::Duration;

/// Instantánea inmutable de la configuración de arranque del proceso.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub database_url: String,
    pub database_token: Option<String>,
    pub listen_port: u16,

    pub source_base_url: String,
    pub source_bearer_token: String,
    pub analyzer_base_url: String,
    pub analyzer_bearer_token: String,
    pub dispatch_base_url: String,
    pub dispatch_bearer_token: String,

    pub poll_interval_s: u64,
    pub min_poll_spacing_s: u64,
    pub historical_hours: i64,
    pub allow_backdated_posts: bool,
    pub max_fetch: usize,

    pub analyzer_model: String,
    pub analyzer_prompt: String,
    pub analyze_timeout_s: u64,
    pub analysis_concurrency: usize,
    pub analysis_batch: usize,
    pub daily_cost_ceiling: f64,

    pub dispatch_rate_per_s: u32,
    pub dispatch_max_retries: u32,
    pub dispatch_max_backoff_s: u64,
    pub default_destination: String,

    pub retention_days: i64,
    pub notifications_enabled: bool,
    pub notify_only_analyzed: bool,

    pub push_shared_secret: String,
    pub push_queue_depth: usize,
    pub ingest_queue_depth: usize,

    pub shutdown_drain_s: u64,
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl ConfigSnapshot {
    /// Construye la instantánea desde el entorno del proceso (ya hidratado
    /// por `dotenvy::dotenv()` en `main.rs`). Aplica los pisos que exige
    /// la tabla de configuración: `poll_interval_s` nunca baja de 30s.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL is not set".to_string())?;

        let push_shared_secret = std::env::var("PUSH_SHARED_SECRET")
            .map_err(|_| "PUSH_SHARED_SECRET is not set".to_string())?;

        let poll_interval_s = env_parsed("POLL_INTERVAL_S", 60u64).max(30);

        Ok(Self {
            database_url,
            database_token: std::env::var("TURSO_AUTH_TOKEN").ok(),
            listen_port: env_parsed("PORT", 3000u16),

            source_base_url: env_string("SOURCE_API_BASE_URL", "https://source.invalid"),
            source_bearer_token: env_string("SOURCE_API_TOKEN", ""),
            analyzer_base_url: env_string("ANALYZER_API_BASE_URL", "https://analyzer.invalid"),
            analyzer_bearer_token: env_string("ANALYZER_API_TOKEN", ""),
            dispatch_base_url: env_string("DISPATCH_API_BASE_URL", "https://dispatch.invalid"),
            dispatch_bearer_token: env_string("DISPATCH_API_TOKEN", ""),

            poll_interval_s,
            min_poll_spacing_s: env_parsed("MIN_POLL_SPACING_S", 300u64),
            historical_hours: env_parsed("HISTORICAL_HOURS", 24i64),
            allow_backdated_posts: env_bool("ALLOW_BACKDATED_POSTS", false),
            max_fetch: env_parsed("MAX_FETCH", 50usize),

            analyzer_model: env_string("ANALYZER_MODEL", "default-model"),
            analyzer_prompt: env_string(
                "ANALYZER_PROMPT",
                "Summarize and comment on the following post from {author} ({created_at}):\n{text}",
            ),
            analyze_timeout_s: env_parsed("ANALYZE_TIMEOUT_S", 60u64),
            analysis_concurrency: env_parsed("ANALYSIS_CONCURRENCY", 2usize).max(1),
            analysis_batch: env_parsed("ANALYSIS_BATCH", 1usize).max(1),
            daily_cost_ceiling: env_parsed("DAILY_COST_CEILING_USD", 25.0f64),

            dispatch_rate_per_s: env_parsed("DISPATCH_RATE_PER_S", 1u32).max(1),
            dispatch_max_retries: env_parsed("DISPATCH_MAX_RETRIES", 5u32),
            dispatch_max_backoff_s: env_parsed("DISPATCH_MAX_BACKOFF_S", 300u64),
            default_destination: env_string("DEFAULT_DESTINATION", "#general"),

            retention_days: env_parsed("RETENTION_DAYS", 30i64),
            notifications_enabled: env_bool("NOTIFICATIONS_ENABLED", true),
            notify_only_analyzed: env_bool("NOTIFY_ONLY_ANALYZED", true),

            push_shared_secret,
            push_queue_depth: env_parsed("PUSH_QUEUE_DEPTH", 256usize),
            ingest_queue_depth: env_parsed("INGEST_QUEUE_DEPTH", 512usize),

            shutdown_drain_s: env_parsed("SHUTDOWN_DRAIN_S", 30u64),
        })
    }

    pub fn analyze_timeout(&self) -> Duration {
        Duration::from_secs(self.analyze_timeout_s)
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_s)
    }

    pub fn min_poll_spacing(&self) -> Duration {
        Duration::from_secs(self.min_poll_spacing_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_is_floored_at_thirty_seconds() {
        std::env::set_var("POLL_INTERVAL_S", "5");
        std::env::set_var("DATABASE_URL", ":memory:");
        std::env::set_var("PUSH_SHARED_SECRET", "test-secret");

        let snapshot = ConfigSnapshot::from_env().unwrap();
        assert_eq!(snapshot.poll_interval_s, 30);

        std::env::remove_var("POLL_INTERVAL_S");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("PUSH_SHARED_SECRET");
    }

    #[test]
    fn missing_database_url_is_a_config_error() {
        std::env::remove_var("DATABASE_URL");
        std::env::set_var("PUSH_SHARED_SECRET", "test-secret");
        assert!(ConfigSnapshot::from_env().is_err());
        std::env::remove_var("PUSH_SHARED_SECRET");
    }
}
