use std::sync::Arc;
use std::time::Duration;

use ad_insights_api::config::AppConfig;
use ad_insights_api::gemini::GeminiClient;
use ad_insights_api::server::{self, AppState, SERVICE_NAME};
use ad_insights_api::store::FirestoreClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let http = reqwest::ClientBuilder::new()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(concat!("ad-insights-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap();

    let gemini = GeminiClient::new(
        http.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    );

    let store = config
        .firestore
        .clone()
        .map(|credentials| FirestoreClient::new(http.clone(), credentials));
    if store.is_some() {
        tracing::info!("document store enabled");
    }

    let state = Arc::new(AppState { http, gemini, store });
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap();
    tracing::info!(
        "{} listening on {}",
        SERVICE_NAME,
        listener.local_addr().unwrap()
    );
    axum::serve(listener, app).await.unwrap();
}
