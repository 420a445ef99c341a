// src/main.rs
mod api;
mod config;
mod feasibility;
mod milp;
mod model;
mod optimizer;
mod preprocess;

use config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let solver_config = app_config.solver.clone();

    println!("🚀 Bin solver service starting...");
    api::start_api_server(api_config, solver_config).await;
}
