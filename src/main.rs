// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;

use photorevive::{
    AppState,
    config::AppConfig,
    handlers,
    orchestrator::RestorationContext,
    registry::RunRegistry,
    services::{GeminiClient, ImageModel, ImageProcessor},
    template::RestorationTemplate,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting photorevive service...");

    let config = AppConfig::from_env().context("invalid configuration")?;

    let template = match &config.template_path {
        Some(path) => {
            info!("Loading restoration template from {}", path.display());
            RestorationTemplate::from_path(path)?
        }
        None => RestorationTemplate::baseline(),
    };

    let model: Option<Arc<dyn ImageModel>> = match &config.api_key {
        Some(key) => {
            info!("Using image model {}", config.model);
            let client: Arc<dyn ImageModel> = Arc::new(GeminiClient::new(
                key.clone(),
                config.model.clone(),
                config.base_url.clone(),
            ));
            Some(client)
        }
        None => {
            warn!("GEMINI_API_KEY not set, every restoration will return the demo result");
            None
        }
    };

    let image_processor = Arc::new(ImageProcessor::new(config.max_upload_bytes));

    let registry = RunRegistry::with_retention(
        RestorationContext {
            model,
            processor: Arc::clone(&image_processor),
            template: Arc::new(template),
            ticker: config.ticker,
        },
        config.run_retention,
    );

    let app_state = AppState {
        registry,
        image_processor,
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}
