use dotenvy::dotenv;
use ledgerly::{
    ai::{ChatModel, DeepSeekClient},
    api::{self, AppState},
    config::{
        CachePolicySetting, Settings,
        catalog::{load_catalog, seed_demo_user},
        database,
    },
    core::classify::{Classifier, EvictionPolicy, FingerprintCache, TesseractCli},
    errors::Result,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load settings
    let settings = Settings::from_env()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!("Running in {:?} mode", settings.environment);

    // 4. Connect and create tables
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the demo user and the catalog
    seed_demo_user(&db).await?;
    match load_catalog(&settings.catalog_path) {
        Ok(catalog) => {
            catalog
                .seed(&db)
                .await
                .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;
        }
        Err(e) => warn!("Catalog not loaded, continuing without seed data: {}", e),
    }

    // 6. Build the AI and classification services
    let chat: Option<Arc<dyn ChatModel>> = settings.deepseek_api_key.clone().map(|key| {
        info!("DeepSeek enabled with model {}", settings.deepseek_model);
        Arc::new(DeepSeekClient::new(
            &settings.deepseek_base_url,
            key,
            settings.deepseek_model.clone(),
        )) as Arc<dyn ChatModel>
    });
    if chat.is_none() {
        warn!("DEEPSEEK_API_KEY not set; AI features use offline fallbacks");
    }

    let policy = match settings.cache_policy {
        CachePolicySetting::Lru => EvictionPolicy::Lru,
        CachePolicySetting::ClearAll => EvictionPolicy::ClearAll,
    };
    let classifier = Classifier::new(
        FingerprintCache::new(settings.cache_capacity, policy, settings.cache_ttl),
        Arc::new(TesseractCli::new(settings.tesseract_bin.clone())),
        chat.clone(),
    );

    // 7. Serve until shutdown
    let state = AppState {
        db,
        classifier: Arc::new(classifier),
        chat,
        settings: Arc::new(settings),
    };
    api::serve(state)
        .await
        .inspect_err(|e| error!("Server error: {}", e))
}
