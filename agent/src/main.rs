mod tools;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tandem_contract::{ThreadReader, Tool};
use tandem_graph::dispatch::tool_map_from_arc;
use tandem_graph::{EngineConfig, GenaiLlmExecutor, GraphDefinition, GraphEngine};
use tandem_server::http::router;
use tandem_server::AppState;
use tandem_store_adapters::FileStore;
use tools::{GetWeatherTool, SearchTool};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
struct Args {
    #[arg(long, env = "TANDEM_HTTP_ADDR", default_value = "127.0.0.1:3000")]
    http_addr: String,

    #[arg(long, env = "TANDEM_STORAGE_DIR", default_value = "./threads")]
    storage_dir: PathBuf,

    #[arg(long, env = "TANDEM_MODEL", default_value = "gpt-4o")]
    model: String,

    #[arg(long, env = "TANDEM_MAX_STEPS", default_value_t = 10)]
    max_steps: usize,

    #[arg(
        long,
        env = "TANDEM_SYSTEM_PROMPT",
        default_value = "You are a helpful assistant. Use tools proactively when users ask for \
                         current information or the weather."
    )]
    system_prompt: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(SearchTool), Arc::new(GetWeatherTool)];
    let store = Arc::new(FileStore::new(args.storage_dir));

    let config = EngineConfig::new(args.model)
        .with_system_prompt(args.system_prompt)
        .with_max_steps(args.max_steps);
    let engine = Arc::new(GraphEngine::new(
        GraphDefinition::react(),
        Arc::new(GenaiLlmExecutor::default()),
        tool_map_from_arc(tools),
        store.clone(),
        config,
    ));

    let state = AppState {
        engine,
        read_store: store as Arc<dyn ThreadReader>,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.http_addr)
        .await
        .expect("failed to bind server listener");
    tracing::info!(
        addr = %listener.local_addr().expect("listener has no local addr"),
        "tandem agent listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .expect("server crashed");
}
