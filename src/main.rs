use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use nutri_coach::config::Settings;
use nutri_coach::core::{AllergenChecker, ChatRouter, MealMatcher};
use nutri_coach::routes::{self, handle_json_payload_error, AppState};
use nutri_coach::services::{MealDbClient, NutritionCatalog, OllamaClient, ProfileStoreClient, WgerClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    // Initialize logging; LOG_LEVEL and LOG_FORMAT override the settings file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Nutri Coach chat service...");

    let profiles = Arc::new(
        ProfileStoreClient::new(
            settings.profile_store.endpoint.clone(),
            settings.profile_store.project_id.clone(),
            settings.profile_store.collection.clone(),
            settings.profile_store.api_key.clone(),
            std::time::Duration::from_secs(settings.profile_store.timeout_secs),
        )
        .map_err(|e| io_error("Failed to create profile store client", e))?,
    );

    let mealdb = Arc::new(
        MealDbClient::new(settings.mealdb.endpoint.clone(), settings.mealdb.timeout())
            .map_err(|e| io_error("Failed to create recipe client", e))?,
    );

    let wger = Arc::new(
        WgerClient::new(settings.wger.endpoint.clone(), settings.wger.timeout())
            .map_err(|e| io_error("Failed to create exercise client", e))?,
    );

    let ollama = Arc::new(
        OllamaClient::new(
            settings.ollama.endpoint.clone(),
            settings.ollama.model.clone(),
            settings.ollama.options(),
            settings.ollama.timeout(),
        )
        .map_err(|e| io_error("Failed to create generation client", e))?,
    );

    info!("Generation backend: {} at {}", ollama.model(), settings.ollama.endpoint);

    let catalog = Arc::new(NutritionCatalog::from_file(&settings.catalog.path));
    // A missing catalog only disables suggestions and lookups, so keep serving
    match catalog.meals().await {
        Ok(meals) => info!("Nutrition catalog loaded with {} meals", meals.len()),
        Err(e) => error!("Nutrition catalog not loaded, will retry on demand: {}", e),
    }

    let checker = AllergenChecker::new(mealdb, settings.allergen.policy());
    info!("Allergen checker using {} matching", checker.policy_name());

    let router = ChatRouter::new(catalog.clone(), checker, wger, ollama)
        .with_matcher(
            MealMatcher::new(settings.matching.tolerance)
                .with_check_concurrency(settings.matching.check_concurrency),
        )
        .with_suggestion_limit(settings.matching.suggestion_limit);

    let app_state = AppState {
        router: Arc::new(router),
        profiles,
        catalog,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
