use actix_cors::Cors;
use actix_web::{middleware, App, HttpServer};
use anyhow::Context;
use tracing::info;

use quantum_hub::api::routes::middleware::ProcessTime;
use quantum_hub::gateway::{self, GatewayConfig, GatewayState};
use quantum_hub::utils::setup_tracing;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("🚪 Démarrage de l'API Gateway Quantum Hub");

    let config = GatewayConfig::from_env().context("❌ Impossible de charger la configuration du gateway")?;
    for upstream in &config.upstreams {
        info!("🔀 {} -> {} ({})", upstream.prefixes.join(", "), upstream.base_url, upstream.label);
    }

    let bind_address = format!("{}:{}", config.host, config.port);
    let state = GatewayState::new(config).context("❌ Impossible d'initialiser le client HTTP")?;

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let state = state.clone();
        App::new()
            .wrap(ProcessTime)
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(|cfg| gateway::configure(cfg, state))
    })
    .bind(&bind_address)
    .with_context(|| format!("❌ Impossible d'écouter sur {}", bind_address))?
    .shutdown_timeout(10);

    info!("✅ Gateway disponible sur http://{}", bind_address);
    server.run().await?;
    Ok(())
}
