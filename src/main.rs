use std::{net::SocketAddr, sync::Arc};

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Server,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use todo_lists::{config::Config, db, route::create_router, AppState};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("todo_lists=debug,tower_http=debug,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        return;
    }
    tracing::info!("Received Ctrl-C, shutting down");
}

// Entry point of the application
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    // Connect to the database, creating the file if needed
    let pool = match db::connect(&config.database_url, 10).await {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {err:?}");
            std::process::exit(1);
        }
    };

    if let Err(err) = db::create_schema(&pool).await {
        tracing::error!("Failed to create tables: {err:?}");
        std::process::exit(1);
    }

    let origin = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(err) => {
            tracing::error!("Invalid CORS_ORIGIN {}: {err}", config.cors_origin);
            std::process::exit(1);
        }
    };

    // Configure CORS settings for the application
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    let app_state = Arc::new(AppState::new(pool, &config));
    let app = create_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from((config.host, config.port));
    tracing::info!("Server started successfully on http://{addr}");

    if let Err(err) = Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {err}");
        std::process::exit(1);
    }
}
