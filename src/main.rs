use anyhow::Result;
use trafficlens::{TrafficLensConfig, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = TrafficLensConfig::load()?;
    let telemetry = telemetry::init(&config.logging)?;

    let result = web::run(config).await;
    if let Err(e) = &result {
        tracing::error!("Server stopped with error: {e:#}");
    }

    telemetry.shutdown();
    result
}
