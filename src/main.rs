// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use crate::config::AppConfig;
use crate::services::Transcoder;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub transcoder: Arc<Transcoder>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();
    let app_state = AppState {
        config: config.clone(),
        transcoder: Arc::new(Transcoder::new()),
    };

    info!("Image API listening on http://0.0.0.0:{}", config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes)
            .route("/health", web::get().to(health_check))
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "squish",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
