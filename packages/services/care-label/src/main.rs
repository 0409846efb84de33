use std::net::SocketAddr;
use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{http::Method, response::Html, routing::get, Extension, Router};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use care_label_service::catalog::catalog_for;
use care_label_service::cli::{run_analyze, run_symbols, Cli, Command};
use care_label_service::config::Config;
use care_label_service::pipeline::AnalysisPipeline;
use care_label_service::schema::{build_schema, AppContext, CareLabelSchema};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load this crate's .env regardless of current working directory, and override any pre-set envs
    let _ = dotenvy::from_filename_override(concat!(env!("CARGO_MANIFEST_DIR"), "/.env"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(Config::from_env());
    // Missing backend settings are reported, not fatal; each operation checks what it needs
    cfg.validate();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg).await,
        Command::Analyze { path, mime, retries } => run_analyze(cfg, &path, mime, retries).await,
        Command::Symbols { category } => run_symbols(cfg, category).await,
    }
}

async fn serve(cfg: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!(
        endpoint = %cfg.endpoint,
        bucket = %cfg.bucket_id,
        function = %cfg.function_id,
        "Loaded configuration"
    );

    let schema = build_schema(AppContext {
        config: cfg.clone(),
        pipeline: Arc::new(AnalysisPipeline::from_config(cfg.clone())),
        catalog: catalog_for(cfg.clone()),
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route("/health", get(health_check))
        .layer(Extension(schema))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.port).parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(port = cfg.port, "Port is already in use. Try changing PORT env var or stop the other process.");
            }
            return Err(e.into());
        }
    };
    tracing::info!(port = cfg.port, "Care-label service listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn graphql_playground() -> Html<String> {
    Html(async_graphql::http::playground_source(
        async_graphql::http::GraphQLPlaygroundConfig::new("/graphql"),
    ))
}

async fn graphql_handler(
    Extension(schema): Extension<CareLabelSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn health_check() -> &'static str {
    "OK"
}
