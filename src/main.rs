use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vetbridge_server::auth::handlers::{login, register};
use vetbridge_server::proxy::translate_mos;
use vetbridge_server::{health_check, AppState, RateLimit, RateLimiter, RequireAuth, Settings};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("configuration loaded for {} environment", config.environment);

    if config.auth.jwt_secret.is_none() {
        // Startup continues so the health endpoint stays reachable, but
        // login and every protected route will fail until this is fixed.
        error!("auth.jwt_secret is not configured; login and protected routes will fail");
    }
    if config.generation.api_key.is_none() {
        error!("generation.api_key is not configured; MOS translation will fail");
    }

    // Initialize application state
    let state = web::Data::new(AppState::new(config.clone()).await?);

    // Process-wide admission control, owned here and handed to the middleware
    let limiter = Arc::new(RateLimiter::new(
        Duration::from_secs(config.rate_limit.window_seconds),
        config.rate_limit.max_requests,
    ));

    // Periodically drop windows for addresses that went quiet
    let sweeper = limiter.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            sweeper.sweep().await;
        }
    });

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("starting server at {}:{}", config.server.host, config.server.port);

    let workers = config.server.workers as usize;
    HttpServer::new(move || {
        let cors = match config.cors.allowed_origin.as_deref() {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allowed_methods(vec!["GET", "POST"])
                .allowed_headers(vec!["Authorization", "Content-Type"])
                .supports_credentials(),
            // same-origin deployment: the SPA is served from this host
            None => Cors::permissive(),
        };

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            // registered last so admission control runs before everything else
            .wrap(RateLimit::new(limiter.clone()))
            .app_data(state.clone())
            .route("/api/health", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login)),
            )
            .service(
                web::scope("/api/ai")
                    .wrap(RequireAuth::new(state.tokens.clone()))
                    .route("/translate-mos", web::post().to(translate_mos)),
            )
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await?;

    Ok(())
}
