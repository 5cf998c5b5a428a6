//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        AnthropicChatAdapter, HttpImageFetcher, OpenAiChatAdapter, PgStudyRepository,
        SupabaseAuthAdapter, SupabaseStorageAdapter,
    },
    config::{ChatProvider, Config},
    error::ApiError,
    web::{build_router, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_assistant_core::{ports::ChatCompletionService, Tutor};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let repo = Arc::new(PgStudyRepository::new(db_pool));
    info!("Running database migrations...");
    repo.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .user_agent(concat!("teech-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let auth = Arc::new(SupabaseAuthAdapter::new(
        http.clone(),
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
    ));
    let storage = Arc::new(SupabaseStorageAdapter::new(
        http.clone(),
        config.supabase_url.clone(),
        config.supabase_anon_key.clone(),
        config.storage_bucket.clone(),
    ));

    let missing_key =
        |var: &str| ApiError::Internal(format!("{} is required for the selected chat provider", var));
    let chat: Arc<dyn ChatCompletionService> = match config.chat_provider {
        ChatProvider::Anthropic => Arc::new(AnthropicChatAdapter::new(
            http.clone(),
            config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| missing_key("ANTHROPIC_API_KEY"))?,
            config.chat_model.clone(),
            config.chat_max_tokens,
        )),
        ChatProvider::OpenAi => {
            let openai_config = OpenAIConfig::new().with_api_key(
                config
                    .openai_api_key
                    .as_ref()
                    .ok_or_else(|| missing_key("OPENAI_API_KEY"))?,
            );
            Arc::new(OpenAiChatAdapter::new(
                Client::with_config(openai_config),
                config.chat_model.clone(),
                config.chat_max_tokens,
            ))
        }
    };
    info!(
        "Chat provider: {:?} ({})",
        config.chat_provider, config.chat_model
    );
    let solver = Arc::new(Tutor::new(chat, Arc::new(HttpImageFetcher::new(http))));

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        repo,
        storage,
        auth,
        solver,
        config: config.clone(),
    });
    let app = build_router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
