use std::process;
use std::sync::Arc;

use checkout_service::config::Config;
use checkout_service::infrastructure::razorpay::RazorpayGateway;
use checkout_service::{build_server, create_pool, run_migrations, AppState};
use dotenvy::dotenv;
use log::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().unwrap_or_else(|e| {
        error!("Invalid configuration: {e}");
        process::exit(1);
    });

    let pool = create_pool(&config.database_url).unwrap_or_else(|e| {
        error!("Failed to create database pool: {e}");
        process::exit(1);
    });
    if let Err(e) = run_migrations(&pool) {
        error!("Failed to run database migrations: {e}");
        process::exit(1);
    }

    let gateway = RazorpayGateway::new(&config.gateway).unwrap_or_else(|e| {
        error!("Failed to build payment gateway client: {e}");
        process::exit(1);
    });
    let state = AppState::with_pool(pool, Arc::new(gateway), &config.gateway);

    info!(
        "Starting server at http://{}:{} (gateway {}, currency {})",
        config.host, config.port, config.gateway.base_url, config.gateway.currency
    );

    build_server(state, &config.host, config.port)?.await
}
