use std::sync::Arc;

use warehaus_food::app;
use warehaus_food::clock::{Clock, SystemClock};
use warehaus_food::config::AppConfig;
use warehaus_food::photos::purge::spawn_daily_purge;
use warehaus_food::state::AppState;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "warehaus_food=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // the local offset can only be read while the process is single-threaded
    let clock = Arc::new(SystemClock::detect()) as Arc<dyn Clock>;
    let config = AppConfig::from_env()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config, clock))
}

async fn run(config: AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let app_state = AppState::init(config, clock)?;
    tracing::info!(
        storage_dir = %app_state.config.storage_dir.display(),
        slot = %app_state.config.photos.slot_key,
        "state ready"
    );

    // aborted when dropped at shutdown
    let _purge = spawn_daily_purge(app_state.photos.clone());

    let app = app::build_app(app_state);
    app::serve(app, addr).await
}
