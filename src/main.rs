use std::env;

use careflow::cli;
use careflow::config::{AppConfig, Settings};
use careflow::runtime;

const DEFAULT_RUN_MODE: &str = "cli";

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };

    let settings = match Settings::load(&config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };

    let run_mode = config
        .get("RUN_MODE")
        .or_else(|| env::var("RUN_MODE").ok())
        .unwrap_or(DEFAULT_RUN_MODE.to_string());
    if run_mode == "api" {
        runtime::run_api(settings).await;
    } else if run_mode == "cli" {
        cli::cli(settings).await;
    } else {
        println!("Invalid run mode {}", run_mode);
    }
}
