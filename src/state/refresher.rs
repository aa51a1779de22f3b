use crate::state::location::LocationProvider;
use crate::state::messages::SyncRequest;
use log::debug;
use pitchside_api::Coordinate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

pub const LOCATION_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Polls the location provider and moves the reference location when the
/// device has moved. Unknown positions are ignored.
pub struct PeriodicRefresher {
    provider: Arc<dyn LocationProvider>,
    sync_requests: mpsc::Sender<SyncRequest>,
    last_seen: Option<Coordinate>,
    every: Duration,
}

impl PeriodicRefresher {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        sync_requests: mpsc::Sender<SyncRequest>,
        last_seen: Option<Coordinate>,
    ) -> Self {
        Self { provider, sync_requests, last_seen, every: LOCATION_POLL_INTERVAL }
    }

    pub fn every(mut self, every: Duration) -> Self {
        self.every = every;
        self
    }

    pub async fn run(mut self) {
        let mut location_interval = interval(self.every);
        // Startup already resolved the location once.
        location_interval.tick().await;

        loop {
            location_interval.tick().await;
            let Some(coordinate) = self.poll().await else {
                continue;
            };
            if self.sync_requests.send(SyncRequest::SetLocation { coordinate }).await.is_err() {
                break;
            }
        }
    }

    /// The new position, if it differs from the last one seen.
    async fn poll(&mut self) -> Option<Coordinate> {
        let current = self.provider.current_coordinate().await?;
        if self.last_seen == Some(current) {
            return None;
        }
        debug!("device moved to {current:?}");
        self.last_seen = Some(current);
        Some(current)
    }
}
