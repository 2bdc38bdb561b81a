use crate::services::DisplayClient;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use log::{info, warn};
use tokio::sync::RwLock;

/// Shared panel state: the connected display client and the last brightness
/// level pushed by the host.
#[derive(Clone, Default)]
pub struct PanelState {
    display: Arc<RwLock<Option<Arc<DisplayClient>>>>,
    last_brightness: Arc<AtomicU8>,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `client`, disposing any previous one.
    pub async fn connect(&self, client: DisplayClient) {
        let previous = self.display.write().await.replace(Arc::new(client));
        if let Some(previous) = previous {
            warn!("Replacing connected display client");
            previous.dispose();
        }
        info!("Display client connected");
    }

    pub async fn display(&self) -> Option<Arc<DisplayClient>> {
        self.display.read().await.clone()
    }

    /// Drop and dispose the connected client. Returns whether one was connected.
    pub async fn disconnect(&self) -> bool {
        match self.display.write().await.take() {
            Some(client) => {
                client.dispose();
                info!("Display client disconnected");
                true
            }
            None => false,
        }
    }

    pub fn last_brightness(&self) -> u8 {
        self.last_brightness.load(Ordering::SeqCst)
    }

    pub fn record_brightness(&self, level: u8) {
        self.last_brightness.store(level, Ordering::SeqCst);
    }
}
