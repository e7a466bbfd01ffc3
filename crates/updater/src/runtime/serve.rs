//! Serve — run the watcher as a background task and block on it.

use tracing::{error, info};

use crate::watch::EventWatcher;

/// Spawn the watch loop and wait for it. There is no shutdown path: this
/// only returns when the loop gives up on the event stream (or panics).
pub async fn serve(watcher: EventWatcher) -> Result<(), Box<dyn std::error::Error>> {
    let handle = tokio::spawn(async move { watcher.run().await });
    info!("Event watcher started");

    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!("Event watcher stopped: {}", e);
            Err(e.into())
        }
        Err(e) => {
            error!("Event watcher task failed: {}", e);
            Err(e.into())
        }
    }
}
