use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use quizgen::api::{self, AppState};
use quizgen::config::AppConfig;
use quizgen::llm::openai::OpenAIClient;
use quizgen::llm::ModelClient;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    let client: Arc<dyn ModelClient> = Arc::new(OpenAIClient::new(&config.provider)?);
    let state = web::Data::new(AppState::new(client, &config));

    let (host, port) = (config.server.host.clone(), config.server.port);
    tracing::info!("Starting server at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
