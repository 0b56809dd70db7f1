// ABOUTME: hotcue-bridge binary
// ABOUTME: Runs the line protocol ingress, the per-tick consumer and the scene state endpoint

use clap::Parser;
use hotcue_bridge::bridge::{
    spawn_tick_consumer, BridgeArgs, EventConsumer, EventQueue, SceneController, SceneProvider,
    StateServer, TcpEventListener,
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "hotcue-bridge")]
#[command(author, version, about = "Hot cue event bridge for broadcast renderers", long_about = None)]
struct Args {
    #[command(flatten)]
    bridge: BridgeArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Initialize tracing
    args.bridge.init_tracing();

    // Log startup info
    args.bridge.log_startup_info();

    let config = args.bridge.build_config();
    let host = Arc::new(args.bridge.create_scene_host()?);

    // Ingress: listener thread -> queue
    let queue = Arc::new(EventQueue::new());
    let mut listener = TcpEventListener::with_config(&config);
    if let Err(e) = listener.start(Arc::clone(&queue)) {
        tracing::error!("Event ingress disabled: {}", e);
    }

    // Consumer: drains the queue every tick
    let controller: Arc<dyn SceneController> = host.clone();
    let (consumer_handle, consumer_shutdown) = spawn_tick_consumer(
        EventConsumer::new(Arc::clone(&queue)),
        controller,
        config.tick_interval,
    );

    // State endpoint
    let provider: Arc<dyn SceneProvider> = host;
    let state_server =
        match StateServer::spawn(config.state_addr, provider, config.request_timeout).await {
            Ok(server) => Some(server),
            Err(e) => {
                tracing::error!("State endpoint disabled: {}", e);
                None
            }
        };

    tracing::info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    // Stop ingress first so no line is queued after the final drain
    tokio::task::spawn_blocking(move || {
        listener.stop();
        queue.close();
    })
    .await?;

    let _ = consumer_shutdown.send(true);
    if let Err(e) = consumer_handle.await {
        tracing::error!("Event consumer task failed: {}", e);
    }

    if let Some(server) = state_server {
        server.shutdown().await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
