//! StreamInject - live broadcast console for RTMP stream injection
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! The window lets an operator join an RTC channel as broadcaster, preview the
//! local camera and inject an external RTMP/HTTP stream into the channel. It
//! initializes:
//! - Configuration loading ([`ConfigManager`], `streaminject.yaml`)
//! - Logging infrastructure (file rotation + console output)
//! - Tokio runtime (the engine delivers its callbacks from runtime tasks)
//! - The engine event queue and the GUI controller
//!
//! The application uses a hybrid threading model:
//! - **Main thread**: Runs the Slint event loop and owns all dialog state
//! - **Tokio workers**: Engine callback delivery
//! - **Event pump**: std::thread moving queued engine events onto the event loop
//!
//! # Execution Flow
//!
//! 1. Load or create `streaminject.yaml` in the working directory
//! 2. Initialize logging → logs/streaminject.<date>
//! 3. Create tokio runtime with 2 worker threads
//! 4. Create the event queue and the engine
//! 5. Create GuiController (initializes the engine, starts the preview)
//! 6. Run Slint event loop (blocks until window closed), then tear the engine down
//! 7. Shutdown tokio runtime with 5s timeout

use anyhow::Result;
use std::sync::Arc;
use streaminject::ui::GuiController;
use streaminject::{APP_NAME, ConfigManager, Metrics, SimulatedEngine, VERSION, event_channel};

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(".")?;
    let config = config_manager.load_or_create()?;

    let _log_guard = streaminject::logging::setup_logging(&config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Using config {}", config_manager.config_path());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("streaminject-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", 2);

    let metrics = Arc::new(Metrics::new());
    let (poster, queue) = event_channel(Arc::clone(&metrics));

    let engine = SimulatedEngine::new(
        runtime.handle().clone(),
        config.simulation.clone(),
        config.injection.reserved_uid,
    );

    let gui_controller = GuiController::new(&config, engine, poster, queue, Arc::clone(&metrics))?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the window is closed; the engine is released before it returns
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");
    metrics.log_summary();

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
