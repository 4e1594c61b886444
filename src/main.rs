use std::time::Duration;

use marketplace_auth::{app, state::AppState, sweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "marketplace_auth=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;

    let sweep = &app_state.config.sweep;
    if sweep.enabled {
        sweeper::spawn_unverified_sweep(
            app_state.users.clone(),
            Duration::from_secs(sweep.interval_minutes * 60),
            time::Duration::minutes(sweep.max_age_minutes),
        );
        tracing::info!(
            interval_minutes = sweep.interval_minutes,
            max_age_minutes = sweep.max_age_minutes,
            "unverified account sweep scheduled"
        );
    }

    app::serve(app::build_app(app_state)).await
}
