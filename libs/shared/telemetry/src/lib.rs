// [libs/shared/telemetry/src/lib.rs]
/*!
 * =================================================================
 * APARATO: COURIER TELEMETRY
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4)
 * RESPONSABILIDAD: GESTIÓN DE TRAZADO ESTRUCTURADO Y CAPTURA DE PÁNICOS
 *
 * Modo desarrollo: logs compactos y coloreados para lectura humana.
 * Modo producción: líneas JSON planas listas para un colector externo.
 * =================================================================
 */

use std::panic;

use tracing::{error, info, instrument};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Construye la directiva de filtrado por defecto cuando `RUST_LOG` no está
/// presente en el entorno: nivel `debug` en desarrollo, `info` en producción,
/// silenciando el ruido de las dependencias de transporte.
fn default_filter_directive(service_nominal_identifier: &str, is_production_strata: bool) -> String {
    format!(
        "{}={level},tower_http=warn,hyper=warn,libsql=error",
        service_nominal_identifier,
        level = if is_production_strata { "info" } else { "debug" }
    )
}

/// Inicializa el sistema de trazado con blindaje de pánicos.
///
/// # Panics
/// Entra en pánico si otro suscriptor global ya fue inicializado en este
/// proceso — `init_tracing` debe llamarse una única vez, al arranque.
#[instrument(skip_all)]
pub fn init_tracing(service_nominal_identifier: &str) {
    let is_production_strata = !cfg!(debug_assertions);

    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        default_filter_directive(service_nominal_identifier, is_production_strata).into()
    });

    if is_production_strata {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    }

    let service_id_snapshot = service_nominal_identifier.to_string();

    panic::set_hook(Box::new(move |panic_metadata| {
        let panic_location = panic_metadata
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let panic_payload_message = panic_metadata
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_metadata.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("undefined panic payload");

        error!(
            target: "panic_monitor",
            service = %service_id_snapshot,
            location = %panic_location,
            "thread terminated abruptly: {}",
            panic_payload_message
        );
    }));

    info!("telemetry initialized for service [{}]", service_nominal_identifier);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_filter_uses_debug_level() {
        let directive = default_filter_directive("courier-orchestrator", false);
        assert_eq!(directive, "courier-orchestrator=debug,tower_http=warn,hyper=warn,libsql=error");
    }

    #[test]
    fn production_filter_uses_info_level() {
        let directive = default_filter_directive("courier-orchestrator", true);
        assert_eq!(directive, "courier-orchestrator=info,tower_http=warn,hyper=warn,libsql=error");
    }
}
