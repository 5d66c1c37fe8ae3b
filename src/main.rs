use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use quantum_hub::api::{self, routes::middleware::ProcessTime, AppState};
use quantum_hub::utils::{setup_tracing, Config};
use quantum_hub::workers::{start_expiry_worker, ExpiryConfig};
use quantum_hub::Database;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialisation du logging
    setup_tracing();
    info!("🚀 Démarrage de Quantum Hub v{}", quantum_hub::VERSION);

    // Chargement de la configuration
    let config = Config::from_env().context("❌ Impossible de charger la configuration")?;
    info!("✅ Configuration chargée avec succès");
    if config.jwt_secret.len() < 32 {
        warn!("⚠️  JWT_SECRET trop court (< 32 caractères) - risque de sécurité");
    }
    let services: Vec<&str> = config.enabled_services.iter().map(|s| s.as_str()).collect();
    info!("🧩 Services actifs: {}", services.join(", "));

    // Initialisation du stockage
    let db = Database::connect(&config)
        .await
        .context("❌ Impossible de se connecter à la base de données")?;

    // Démarrage des workers background
    start_expiry_worker(
        ExpiryConfig { interval_seconds: config.expiry_sweep_interval_seconds },
        db.clone(),
    );

    let bind_address = format!("{}:{}", config.server_host, config.server_port);
    let workers = config.workers;
    let state = web::Data::new(AppState::new(db, Arc::new(config)));

    // Configuration du serveur Actix-Web
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(ProcessTime)
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(|cfg| api::configure_app(cfg, state.clone()))
    })
    .bind(&bind_address)
    .with_context(|| format!("❌ Impossible d'écouter sur {}", bind_address))?
    .workers(workers)
    .shutdown_timeout(10);

    info!("✅ Serveur démarré avec succès!");
    info!("🔗 API disponible sur http://{}/api/v1", bind_address);

    server.run().await?;
    Ok(())
}
