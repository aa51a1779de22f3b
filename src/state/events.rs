use crate::state::filters::{MatchFilters, StadiumFilters};
use log::trace;
use pitchside_api::{Booking, Coordinate, Match, Skipped, Stadium};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Snapshot of stadium search state after a mutation.
#[derive(Debug, Clone)]
pub struct StadiumSnapshot {
    /// Filtered, sorted view.
    pub visible: Vec<Stadium>,
    pub total: usize,
    pub filters: StadiumFilters,
    pub origin: Coordinate,
    pub using_remote_data: bool,
    pub error: Option<String>,
    pub skipped: Vec<Skipped>,
}

#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub visible: Vec<Match>,
    pub total: usize,
    pub filters: MatchFilters,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BookingSnapshot {
    pub bookings: Vec<Booking>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StoreEvent {
    Stadiums(StadiumSnapshot),
    Matches(MatchSnapshot),
    Bookings(BookingSnapshot),
}

/// Publishing side of the store event channel. Events sent while nobody
/// listens are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: StoreEvent) {
        if self.sender.send(event).is_err() {
            trace!("store event dropped: no subscribers");
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
