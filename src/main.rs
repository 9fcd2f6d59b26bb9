use std::env;

use dotenv::dotenv;
use env_logger::Env;
use imgconvert::config::AppConfig;
use log::info;
use rocket::{
    figment::{
        providers::{Format, Toml},
        Figment, Profile,
    },
    Config,
};

#[rocket::launch]
async fn rocket() -> _ {
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    // Load config
    let mut figment = Figment::from(Config::default())
        .merge(Toml::file("App.toml").nested());

    // Merge result webhook if available
    if let Ok(webhook) = env::var("RESULT_WEBHOOK") {
        figment = figment.merge(("result_webhook", webhook));
    }

    figment = figment.select(Profile::from_env_or("APP_PROFILE", "default"));

    // App config
    let config = figment.extract::<AppConfig>().unwrap();
    info!("Configuration loaded successfully");

    let sink = imgconvert::build_sink(&config).expect("Failed to build result sink");
    let service =
        imgconvert::build_service(&config, sink).expect("Failed to build conversion service");

    info!(
        "Starting image conversion server on {}:{}",
        config.address, config.port
    );

    imgconvert::build_rocket(figment, service)
}
