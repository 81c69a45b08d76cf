use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use curation_engine::{
    app::{ComponentRegistry, build_router},
    config::Config,
    scheduler::spawn_rule_daemon,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(
                thread = thread_name,
                message, "panic occurred without location information"
            );
        }
    }));

    // Tracing initialization is handled by Telemetry::new()
    let config = Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.http_bind();
    let registry = ComponentRegistry::build(&config).context("failed to build component registry")?;
    registry
        .ensure_schema()
        .await
        .context("failed to prepare curation schema")?;

    if config.rule_daemon_enabled() {
        let _rule_daemon = spawn_rule_daemon(
            registry.rule_scheduler().clone(),
            registry.rule_store(),
            config.rule_tick_interval(),
            config.rule_owner_concurrency(),
        );
    } else {
        warn!("rule daemon disabled; recurring rules run only when executed explicitly");
    }
    let router = build_router(registry);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {bind_addr}"))?;

    info!(%bind_addr, "listening");

    if let Err(error) = axum::serve(listener, router).await {
        warn!(error = %error, "server exited with error");
    }

    Ok(())
}
