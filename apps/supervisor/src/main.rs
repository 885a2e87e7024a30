use taskforce_supervisor::{
    agents::{dispatcher, Supervisor},
    api,
    config::SupervisorConfig,
    infrastructure::ConnectionHub,
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

    let config = SupervisorConfig::from_env().expect("Invalid supervisor configuration");

    // Start the dispatcher that owns all supervisor state
    let supervisor = Supervisor::new(config.supervisor_id.clone(), ConnectionHub::new());
    let (handle, dispatcher_task) = dispatcher::spawn(supervisor, config.sweep_interval);

    tracing::info!(supervisor_id = %config.supervisor_id, "Supervisor started");

    // Build router
    let app = api::router(handle);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    // Agent sockets may still hold handles, so stop the loop explicitly
    dispatcher_task.abort();
    tracing::info!("Supervisor stopped");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to wait for ctrl-c");
    tracing::info!("Shutdown signal received");
}
