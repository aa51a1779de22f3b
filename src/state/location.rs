use async_trait::async_trait;
use log::{debug, warn};
use pitchside_api::Coordinate;
use std::path::PathBuf;

/// Algiers city centre.
pub const DEFAULT_COORDINATE: Coordinate = Coordinate { latitude: 36.7538, longitude: 3.0588 };

/// On-device position source. `None` means "unknown right now".
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_coordinate(&self) -> Option<Coordinate>;
}

/// A position fixed at startup (e.g. from `PITCHSIDE_LOCATION`).
#[derive(Debug, Clone, Copy)]
pub struct StaticLocation(pub Option<Coordinate>);

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn current_coordinate(&self) -> Option<Coordinate> {
        self.0
    }
}

/// Reads `lat,lon` from a file on every poll, so the position can be moved
/// while the app runs.
#[derive(Debug, Clone)]
pub struct FileLocation {
    path: PathBuf,
}

impl FileLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LocationProvider for FileLocation {
    async fn current_coordinate(&self) -> Option<Coordinate> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("no location at {}: {e}", self.path.display());
                return None;
            }
        };
        let coordinate = Coordinate::parse(content.trim());
        if coordinate.is_none() {
            warn!("ignoring malformed location in {}", self.path.display());
        }
        coordinate
    }
}

/// Provider position, or `fallback` when the provider has none.
pub async fn resolve_location(provider: &dyn LocationProvider, fallback: Coordinate) -> Coordinate {
    provider.current_coordinate().await.unwrap_or(fallback)
}
