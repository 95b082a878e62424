use std::sync::Arc;
use std::time::{Duration, Instant};

use resq_broadcaster::{BroadcastHub, RelayAdapter};

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    pub relay: Arc<RelayAdapter>,
    /// Per-frame send timeout for map clients
    pub send_timeout: Duration,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(hub: Arc<BroadcastHub>, send_timeout: Duration) -> Self {
        let relay = Arc::new(RelayAdapter::new(Arc::clone(&hub)));
        Self {
            hub,
            relay,
            send_timeout,
            started_at: Instant::now(),
        }
    }
}
