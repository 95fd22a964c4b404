mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::auth::TokenSigner;
use services::directory::PgProjectDirectory;
use services::fanout::{FanoutBridge, RedisFanout};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()
        .expect("invalid PORT");
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");

    let signer = match std::env::var("TOKEN_SECRET") {
        Ok(secret) => TokenSigner::new(secret),
        Err(_) => {
            tracing::warn!("TOKEN_SECRET not set — using an ephemeral secret; tokens will not survive restarts");
            TokenSigner::ephemeral()
        }
    };

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");
    let directory = Arc::new(PgProjectDirectory::new(pool));

    let mut state = state::AppState::new(directory, Arc::new(signer));

    // Cross-process fanout is optional: without it the relay still serves
    // single-process rooms, the same degrade path used when the backbone
    // drops mid-flight.
    match std::env::var("REDIS_URL") {
        Ok(url) => match RedisFanout::connect(&url, state.clone()).await {
            Ok(fanout) => {
                tracing::info!("cross-process fanout connected");
                state.fanout = Some(Arc::new(fanout) as Arc<dyn FanoutBridge>);
            }
            Err(error) => {
                tracing::warn!(error = %error, "redis unavailable — running single-process");
            }
        },
        Err(_) => tracing::info!("REDIS_URL not set — running single-process"),
    }

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "drawing relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
