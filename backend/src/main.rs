//! Backend entry-point.

use actix_web::web;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::server::{AppConfig, create_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config).await?;
    server.await
}
