//! pulse service binary.
//!
//! Order matters: logging first, then the build identity is frozen, then the
//! listener is bound. No request is accepted before the identity exists.

use tokio::net::TcpListener;

use pulse_core::{BuildIdentity, ProcessEnv};
use pulse_service::{app_state::AppState, config, obs, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = ProcessEnv;
    let cfg = config::load(&env)?;
    let _log_guard = obs::logging::init(cfg.log_format);

    let identity = BuildIdentity::resolve(&env);
    let state = AppState::new(identity);
    let app = router::build_router(state.clone());

    let listener = TcpListener::bind(cfg.listen_addr()).await?;
    tracing::info!(
        port = cfg.port,
        git_sha = %state.identity().commit_sha(),
        "server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
