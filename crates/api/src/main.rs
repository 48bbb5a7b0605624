use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use nexgen_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nexgen_observability::init();

    let settings = Settings::from_env().context("failed to load configuration")?;
    tracing::info!(?settings, "configuration loaded");

    let state = nexgen_api::app::build_state(&settings)
        .await
        .context("failed to initialize application state")?;
    let _cleanup = state
        .rate_limiter
        .spawn_cleanup(settings.login_rate_window.max(Duration::from_secs(60)));
    let app = nexgen_api::app::build_app(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;
    Ok(())
}
