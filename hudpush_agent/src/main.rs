//! hudpush_agent: samples local GPUs and pushes widget updates to a dashboard.

use std::env;
use std::process::ExitCode;

use hudpush_agent::config::{parse_args, usage, AgentConfig};
use hudpush_agent::gpu::NvmlSource;
use hudpush_agent::procname::platform_resolver;
use hudpush_agent::push::{HttpTransport, PushClient};
use hudpush_agent::sampler::Sidecar;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupt received, shutting down"),
        Err(e) => {
            error!("signal handler failed: {e}");
            std::future::pending::<()>().await
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    let prog = args
        .first()
        .cloned()
        .unwrap_or_else(|| "hudpush_agent".into());
    let parsed = match parse_args(args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}\n{}", usage(&prog));
            return Ok(ExitCode::from(2));
        }
    };
    if parsed.help {
        println!("{}", usage(&prog));
        return Ok(ExitCode::SUCCESS);
    }

    let cfg = AgentConfig::load(&parsed)?;
    info!(
        "pushing to {} every {:?} (timeout {:?})",
        cfg.url, cfg.interval, cfg.timeout
    );

    let source = NvmlSource::init().inspect_err(|e| error!("{e}"))?;
    let transport = HttpTransport::new(cfg.url.clone(), cfg.timeout)?;
    let mut sidecar = Sidecar::new(
        source,
        platform_resolver(),
        PushClient::new(transport),
        cfg.prefix.clone(),
    );
    sidecar.start().inspect_err(|e| error!("{e}"))?;

    // Registration runs inside the guarded future: an interrupt at any point
    // after this still unwinds through the drop below.
    sidecar.run_until(cfg.interval, interrupted()).await;
    // Dropping the sidecar releases NVML.
    drop(sidecar);
    info!("stopped");
    Ok(ExitCode::SUCCESS)
}
