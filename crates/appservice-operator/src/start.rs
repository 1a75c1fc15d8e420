use std::process;

use anyhow::{Result, anyhow};
use tracing::{error, info};

use fluvio_future::task::run_block_on;
use k8_client::load_and_share;

use crate::cli::OperatorOpt;
use crate::config::OperatorConfig;
use crate::controller::AppServiceController;
use crate::core::ShutdownEvent;

pub fn main_loop(opt: OperatorOpt) {
    // parse configuration (program exits on error)
    let config = opt.parse_cli_or_exit();

    info!(version = crate::VERSION, "Platform");
    println!("starting appservice operator");

    if let Err(err) = run_block_on(start_operator(config)) {
        error!(%err, "operator failed");
        eprintln!("operator failed: {err}");
        process::exit(1);
    }

    println!("appservice operator stopped");
}

/// run controller against current kubernetes context until SIGINT or SIGTERM
pub async fn start_operator(config: OperatorConfig) -> Result<()> {
    let client =
        load_and_share().map_err(|err| anyhow!("unable to load kubernetes client: {err}"))?;

    let shutdown = ShutdownEvent::shared();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("detected termination signal, shutting down");
        signal.notify();
    })
    .map_err(|err| anyhow!("termination handler can't be initialized: {err}"))?;

    let handle = AppServiceController::start(client, config, shutdown)?;
    println!("AppService operator Version: {} started successfully", crate::VERSION);

    handle.stopped().await;
    info!("all workers terminated");
    Ok(())
}
