// [apps/orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO, TELEMETRÍA Y ARRANQUE DEL
 *                  KERNEL DEL ORQUESTADOR
 *
 * Códigos de salida: 0 apagado limpio, 2 error de configuración fatal,
 * 3 error fatal de Store, 4 escalado del supervisor tras fallos
 * repetidos de un worker.
 * =================================================================
 */

use courier_orchestrator::prelude::*;
use dotenvy::dotenv;
use tracing::{error, info};

fn main() {
    dotenv().ok();
    courier_shared_telemetry::init_tracing("courier-orchestrator");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to build tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    let exit_code = runtime.block_on(run());
    std::process::exit(exit_code);
}

async fn run() -> i32 {
    let config = match ConfigSnapshot::from_env() {
        Ok(config) => config,
        Err(reason) => {
            error!("💀 [CONFIG_FAULT]: {}", reason);
            return 2;
        }
    };

    info!("🛰️  [COMMAND_CENTER]: ignition sequence starting");

    let kernel = match OrchestratorKernel::ignite(config).await {
        Ok(kernel) => kernel,
        Err(e) => {
            error!("💀 [IGNITE_FAULT]: {}", e);
            return 3;
        }
    };

    kernel.launch().await
}
