use dotenv::dotenv;
use tracing::{info, warn};

use healthcare_plus_backend::app::app::App;
use healthcare_plus_backend::util::logger::Logger;

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG and LOG_DIR apply
    let env_loaded = dotenv();

    let _logger = match Logger::new() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            std::process::exit(1);
        }
    };

    info!("🚀 Starting Healthcare Plus backend");
    match env_loaded {
        Ok(_) => info!("✅ Successfully loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    let app = App::new().await;
    app.start().await;
}
