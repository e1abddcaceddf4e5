//! Intake engine server
//!
//! Serves the questionnaire chat over HTTP.

use intake_engine::advisor::Advisor;
use intake_engine::api::{create_router, AppState};
use intake_engine::audit::{AuditSink, DisabledAuditLog, JsonlAuditLog};
use intake_engine::config::Config;
use intake_engine::conversation::ChatTurnHandler;
use intake_engine::extractor::{AnswerExtractor, LlmOracle};
use intake_engine::llm::ModelRegistry;
use intake_engine::workflow::WorkflowResolver;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_engine=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();

    // Invalid definitions abort startup
    let definition = Arc::new(config.load_workflow()?);
    tracing::info!(
        workflow = %definition.name(),
        version = %definition.version(),
        steps = definition.steps().len(),
        "Workflow definition loaded"
    );

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));
    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set OPENAI_API_KEY, ANTHROPIC_API_KEY or LLM_GATEWAY.");
    }

    let oracle_service = llm_registry
        .get_or_default(config.oracle_model.as_deref())
        .ok_or("No model available for answer extraction")?;
    let advisor_service = llm_registry
        .get_or_default(config.advisor_model.as_deref())
        .ok_or("No model available for the advisor")?;

    let audit: Arc<dyn AuditSink> = match &config.audit_log {
        Some(path) => {
            tracing::info!(path = %path.display(), "Audit log enabled");
            Arc::new(JsonlAuditLog::new(path))
        }
        None => {
            tracing::info!("Audit log disabled");
            Arc::new(DisabledAuditLog)
        }
    };

    let oracle = LlmOracle::new(oracle_service);
    let advisor = Advisor::new(advisor_service);
    tracing::info!(
        oracle = %oracle.model_id(),
        advisor = %advisor.model_id(),
        "Models selected"
    );

    let extractor = AnswerExtractor::new(definition, Arc::new(oracle), audit);
    let turns = ChatTurnHandler::new(WorkflowResolver::new(extractor), advisor);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(turns, llm_registry))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Intake engine listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
