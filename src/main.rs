use anyhow::Result;
use tracing::{error, info};

use forum_core::telemetry;
use forum_core::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    telemetry::init_tracing(&config.log_filter);

    info!("Preparing forum store");

    // Connect and migrate
    let app = App::new(config).await?;

    if let Err(e) = app.run().await {
        error!("Application error: {}", e);
        return Err(e);
    }

    Ok(())
}
