use actix_middleware::CorrelationIdMiddleware;
use actix_web::{middleware::Logger, web, App, HttpServer};
use crypto_core::jwt;
use db_pool::{create_pool, DbConfig};
use social_api::handlers::configure_routes;
use social_api::openapi::ApiDoc;
use social_api::services::{build_object_store, EmailService, ImageGenerationClient};
use social_api::{db, telemetry, AppState, Config};
use std::io;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    tracing::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{context}: {err}"))
}

/// Social API
///
/// # Routes
///
/// - `/register`, `/token`, `/confirm/{token}`, `/reconfirm` - accounts
/// - `/post`, `/post/{post_id}`, `/post/{post_id}/comments`, `/comment`,
///   `/like` - posts, comments, likes
/// - `/upload` - file upload to the bucket
/// - `/health`, `/health/live` - health checks
/// - `/docs/` - interactive API documentation (`/openapi.json`)
#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    telemetry::init_tracing(&config).map_err(|e| startup_error("Tracing setup failed", e))?;

    tracing::info!("Starting social-api v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.env_state);
    tracing::debug!(?config, "Configuration loaded");
    if config.uses_insecure_secret() {
        tracing::warn!(
            "SECRET_KEY not set; using an insecure development secret ({} state)",
            config.env_state
        );
    }

    jwt::initialize_jwt_secret(&config.secret_key)
        .map_err(|e| startup_error("Failed to initialize JWT secret", e))?;

    let db_cfg = DbConfig::from_env("social-api", &config.database.url);
    db_cfg.log_config();
    let db_pool = create_pool(db_cfg)
        .await
        .map_err(|e| startup_error("Database pool creation failed", e))?;

    db::run_migrations(&db_pool)
        .await
        .map_err(|e| startup_error("Database migration failed", e))?;

    if config.database.force_roll_back {
        tracing::warn!("DB_FORCE_ROLL_BACK is set; wiping all data");
        db::reset_database(&db_pool)
            .await
            .map_err(|e| startup_error("Database reset failed", e))?;
    }

    let mailer = EmailService::new(&config.mail)
        .map_err(|e| startup_error("Email service setup failed", e))?;
    let images = ImageGenerationClient::new(&config.image_generation)
        .map_err(|e| startup_error("Image generation client setup failed", e))?;
    let storage = build_object_store(&config.storage)
        .map_err(|e| startup_error("Object storage setup failed", e))?;

    let state = web::Data::new(AppState {
        db: db_pool,
        mailer,
        images,
        storage,
    });

    let bind_address = config.bind_address();
    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        let openapi_doc = ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .service(
                SwaggerUi::new(ApiDoc::docs_path())
                    .url(ApiDoc::openapi_json_path(), openapi_doc),
            )
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(CorrelationIdMiddleware)
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    tracing::info!("social-api shutting down");
    Ok(())
}
