use std::sync::Arc;
use taskforce_supervisor::{
    agents::{AgentRuntime, SimulatedExecutor},
    config::AgentConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AgentConfig::from_env().expect("Invalid agent configuration");

    tracing::info!(
        agent_id = %config.agent_id,
        capabilities = ?config.capabilities,
        "Agent starting"
    );

    let executor = Arc::new(SimulatedExecutor::new(config.step_delay));
    let runtime = AgentRuntime::new(config, executor);

    tokio::select! {
        _ = runtime.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(agent_id = %runtime.config().agent_id, "Agent shutting down");
        }
    }
}
