mod app;
mod config;
mod db;
mod error;
mod files;
mod proxy;
mod repo;
mod response;
mod state;
mod storage;
mod uploads;
mod users;

#[cfg(test)]
mod test_support;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "campus_files=debug,axum=info,tower_http=info".to_string());
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
    tracing::info!(
        auto_provision = app_state.config.auto_provision_users,
        proxy_host = %app_state.config.proxy.allowed_host,
        proxy_folder = %app_state.config.proxy.allowed_folder,
        "configuration loaded"
    );

    app::serve(app::build_app(app_state)).await
}
