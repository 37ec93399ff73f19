use axum::Router;
use oracle_be::{AppState, routes, services::scheduler, utils::env::EnvVars};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    std::panic::set_hook(Box::new(|info| {
        log::error!("Panic: {}", info);
    }));

    let env_vars = match EnvVars::from_env() {
        Ok(env_vars) => env_vars,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let port = env_vars.port;
    let update_interval = env_vars.update_interval();

    let state = match AppState::new(env_vars) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            log::error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    match update_interval {
        Some(interval) => {
            let orchestrator = state.orchestrator.clone();
            tokio::spawn(async move {
                // Supervisor: a panicking service is logged, the server keeps running
                let handle = tokio::spawn(scheduler::run_price_update_service(
                    orchestrator,
                    interval,
                ));
                if let Err(e) = handle.await {
                    log::error!("Price update service stopped: {}", e);
                }
            });
        }
        None => log::info!("UPDATE_INTERVAL_MINUTES is 0, background price updates disabled"),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_routes(state))
        .layer(cors);

    let addr = format!("0.0.0.0:{}", port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    log::info!("Server running on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
