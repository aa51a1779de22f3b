use crate::state::events::{EventSink, StadiumSnapshot, StoreEvent};
use crate::state::filters::{StadiumFilters, apply_filters};
use crate::state::geo::{distance_between, rank_by_distance};
use crate::state::remote::StadiumSource;
use chrono::NaiveDate;
use log::{debug, info, warn};
use pitchside_api::client::{ApiError, ApiResult};
use pitchside_api::{AvailabilitySlot, Coordinate, Review, ReviewDraft, Skipped, Stadium};
use std::sync::Arc;

pub const NO_STADIUMS_NEARBY: &str = "No stadiums nearby";
pub const STADIUM_FETCH_FAILED: &str = "Could not load stadiums from the server";

/// Stadium search: the fetched collection, the reference location every
/// `distance` is measured from, and the filtered view.
pub struct StadiumStore {
    source: Arc<dyn StadiumSource>,
    events: EventSink,
    radius_km: f64,
    stadiums: Vec<Stadium>,
    visible: Vec<Stadium>,
    filters: StadiumFilters,
    origin: Coordinate,
    using_remote_data: bool,
    search_error: Option<String>,
    last_skipped: Vec<Skipped>,
}

impl StadiumStore {
    pub fn new(
        source: Arc<dyn StadiumSource>,
        events: EventSink,
        origin: Coordinate,
        radius_km: f64,
    ) -> Self {
        Self {
            source,
            events,
            radius_km,
            stadiums: Vec::new(),
            visible: Vec::new(),
            filters: StadiumFilters::default(),
            origin,
            using_remote_data: false,
            search_error: None,
            last_skipped: Vec::new(),
        }
    }

    pub fn stadiums(&self) -> &[Stadium] {
        &self.stadiums
    }

    pub fn visible(&self) -> &[Stadium] {
        &self.visible
    }

    pub fn filters(&self) -> &StadiumFilters {
        &self.filters
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn search_error(&self) -> Option<&str> {
        self.search_error.as_deref()
    }

    pub fn using_remote_data(&self) -> bool {
        self.using_remote_data
    }

    pub fn last_skipped(&self) -> &[Skipped] {
        &self.last_skipped
    }

    pub fn find(&self, id: &str) -> Option<&Stadium> {
        self.stadiums.iter().find(|s| s.id == id)
    }

    /// Fetch stadiums around `origin`, which becomes the reference location.
    /// On failure the previously held stadiums stay, re-ranked for `origin`.
    pub async fn refresh(&mut self, origin: Coordinate) -> &[Stadium] {
        self.origin = origin;
        self.search_error = None;

        match self.source.nearby(origin, self.radius_km).await {
            Ok(normalized) => {
                for skipped in &normalized.skipped {
                    warn!("skipped stadium {:?}: {}", skipped.id, skipped.reason);
                }
                self.last_skipped = normalized.skipped;
                self.stadiums = normalized.items;
                self.using_remote_data = !self.stadiums.is_empty();
                if self.stadiums.is_empty() {
                    self.search_error = Some(NO_STADIUMS_NEARBY.to_owned());
                }
                debug!("fetched {} stadiums", self.stadiums.len());
            }
            Err(e) => {
                warn!("stadium fetch failed: {e}");
                self.using_remote_data = false;
                self.search_error = Some(STADIUM_FETCH_FAILED.to_owned());
            }
        }

        rank_by_distance(&mut self.stadiums, self.origin);
        self.reapply();
        &self.visible
    }

    /// Re-derive every distance against the new reference location.
    pub fn set_user_location(&mut self, origin: Coordinate) {
        self.origin = origin;
        rank_by_distance(&mut self.stadiums, origin);
        self.reapply();
    }

    pub fn apply_filters(&mut self, filters: StadiumFilters) -> &[Stadium] {
        self.filters = filters;
        self.reapply();
        &self.visible
    }

    pub fn clear_filters(&mut self) -> &[Stadium] {
        self.apply_filters(StadiumFilters::default())
    }

    pub fn clear_search_error(&mut self) {
        if self.search_error.take().is_some() {
            self.publish();
        }
    }

    /// Server copy first, the held copy when the server cannot answer.
    pub async fn details(&self, id: &str) -> Option<Stadium> {
        match self.source.stadium(id).await {
            Ok(mut stadium) => {
                stadium.distance = distance_between(self.origin, stadium.coordinate);
                Some(stadium)
            }
            Err(e) => {
                warn!("stadium {id} details failed: {e}");
                self.find(id).cloned()
            }
        }
    }

    pub async fn availability(&self, id: &str, date: NaiveDate) -> Vec<AvailabilitySlot> {
        self.source.availability(id, date).await.unwrap_or_else(|e| {
            warn!("availability for {id} failed: {e}");
            Vec::new()
        })
    }

    pub async fn reviews(&self, id: &str) -> Vec<Review> {
        self.source.reviews(id).await.unwrap_or_else(|e| {
            warn!("reviews for {id} failed: {e}");
            Vec::new()
        })
    }

    /// Post a review. Failures go back to the caller; nothing is kept locally.
    pub async fn add_review(&self, id: &str, draft: ReviewDraft) -> ApiResult<Review> {
        draft.validate().map_err(|e| ApiError::Other(e.to_string()))?;
        let echoed = self.source.add_review(id, &draft).await.inspect_err(|e| {
            warn!("review for {id} failed: {e}");
        })?;
        info!("posted a {}-star review for {id}", draft.rating);
        Ok(echoed.unwrap_or(Review {
            rating: f64::from(draft.rating),
            comment: draft.comment,
            author: None,
        }))
    }

    fn reapply(&mut self) {
        self.visible = apply_filters(&self.stadiums, &self.filters);
        self.publish();
    }

    fn publish(&self) {
        self.events.publish(StoreEvent::Stadiums(self.snapshot()));
    }

    pub fn snapshot(&self) -> StadiumSnapshot {
        StadiumSnapshot {
            visible: self.visible.clone(),
            total: self.stadiums.len(),
            filters: self.filters.clone(),
            origin: self.origin,
            using_remote_data: self.using_remote_data,
            error: self.search_error.clone(),
            skipped: self.last_skipped.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::filters::SortBy;
    use async_trait::async_trait;
    use pitchside_api::{FieldSize, Normalized};
    use std::sync::Mutex;

    /// Scripted stadium backend: answers from a queue, failing when it runs dry.
    #[derive(Default)]
    struct ScriptedStadiums {
        responses: Mutex<Vec<ApiResult<Normalized<Stadium>>>>,
        posted: Mutex<Vec<(String, ReviewDraft)>>,
    }

    impl ScriptedStadiums {
        fn answering(responses: Vec<ApiResult<Normalized<Stadium>>>) -> Arc<Self> {
            let mut responses = responses;
            responses.reverse();
            Arc::new(Self { responses: Mutex::new(responses), ..Self::default() })
        }
    }

    #[async_trait]
    impl StadiumSource for ScriptedStadiums {
        async fn nearby(&self, _: Coordinate, _: f64) -> ApiResult<Normalized<Stadium>> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ApiError::Other("offline".into())))
        }
        async fn stadium(&self, id: &str) -> ApiResult<Stadium> {
            Err(ApiError::NotFound(id.to_owned()))
        }
        async fn availability(&self, _: &str, _: NaiveDate) -> ApiResult<Vec<AvailabilitySlot>> {
            Err(ApiError::Other("offline".into()))
        }
        async fn reviews(&self, _: &str) -> ApiResult<Vec<Review>> {
            Ok(vec![Review { rating: 4.0, comment: "Good turf".into(), author: None }])
        }
        async fn add_review(&self, id: &str, review: &ReviewDraft) -> ApiResult<Option<Review>> {
            if id == "closed" {
                return Err(ApiError::Api { status: 403, message: "Reviews are closed".into(), url: String::new() });
            }
            self.posted.lock().unwrap().push((id.to_owned(), review.clone()));
            Ok(None)
        }
    }

    const HOME: Coordinate = Coordinate { latitude: 36.7538, longitude: 3.0588 };

    fn north_of(origin: Coordinate, km: f64) -> Coordinate {
        Coordinate::new(origin.latitude + km / 111.195, origin.longitude)
    }

    fn stadium(id: &str, at: Coordinate, size: FieldSize, price: u32) -> Stadium {
        Stadium {
            id: id.to_owned(),
            name: format!("Stade {id}"),
            address: "Alger".into(),
            coordinate: at,
            price_per_hour: price,
            field_size: size,
            rating: 4.0,
            amenities: vec!["parking".into()],
            image: None,
            distance: 0.0,
        }
    }

    fn fetched(items: Vec<Stadium>) -> ApiResult<Normalized<Stadium>> {
        Ok(Normalized { items, skipped: Vec::new() })
    }

    fn ids(stadiums: &[Stadium]) -> Vec<&str> {
        stadiums.iter().map(|s| s.id.as_str()).collect()
    }

    fn abc() -> Vec<Stadium> {
        vec![
            stadium("A", north_of(HOME, 2.0), FieldSize::FiveASide, 4000),
            stadium("B", north_of(HOME, 5.0), FieldSize::SevenASide, 3000),
            stadium("C", north_of(HOME, 1.0), FieldSize::FiveASide, 6000),
        ]
    }

    #[tokio::test]
    async fn refresh_ranks_by_distance_and_resorts_on_move() {
        let source = ScriptedStadiums::answering(vec![fetched(abc())]);
        let mut store = StadiumStore::new(source, EventSink::new(), HOME, 10.0);

        assert_eq!(ids(store.refresh(HOME).await), ["C", "A", "B"]);
        assert!(store.using_remote_data());
        assert_eq!(store.search_error(), None);

        // Place the user where A and B are both 1 km away and C is 10 km away.
        let moved = Coordinate::new(HOME.latitude + 1.0, HOME.longitude + 1.0);
        let mut relocated = store.stadiums().to_vec();
        for s in relocated.iter_mut() {
            s.coordinate = match s.id.as_str() {
                "C" => north_of(moved, 10.0),
                _ => north_of(moved, 1.0),
            };
        }
        store.stadiums = relocated;
        store.set_user_location(moved);

        assert_eq!(ids(store.visible()), ["A", "B", "C"]);
        assert_eq!(store.stadiums()[2].distance, 10.0);

        store.set_user_location(moved);
        assert_eq!(ids(store.visible()), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_stadiums_with_error() {
        let source = ScriptedStadiums::answering(vec![fetched(abc())]);
        let mut store = StadiumStore::new(source, EventSink::new(), HOME, 10.0);
        store.refresh(HOME).await;

        let visible = store.refresh(HOME).await;
        assert_eq!(ids(visible), ["C", "A", "B"]);
        assert_eq!(store.search_error(), Some(STADIUM_FETCH_FAILED));
        assert!(!store.using_remote_data());

        store.clear_search_error();
        assert_eq!(store.search_error(), None);
    }

    #[tokio::test]
    async fn empty_result_reports_nothing_nearby() {
        let source = ScriptedStadiums::answering(vec![fetched(Vec::new())]);
        let mut store = StadiumStore::new(source, EventSink::new(), HOME, 10.0);
        assert!(store.refresh(HOME).await.is_empty());
        assert_eq!(store.search_error(), Some(NO_STADIUMS_NEARBY));
    }

    #[tokio::test]
    async fn skipped_entities_are_kept_for_inspection() {
        let normalized = Normalized {
            items: abc(),
            skipped: vec![Skipped { id: Some("zz".into()), reason: "missing coordinates".into() }],
        };
        let source = ScriptedStadiums::answering(vec![Ok(normalized)]);
        let mut store = StadiumStore::new(source, EventSink::new(), HOME, 10.0);
        store.refresh(HOME).await;
        assert_eq!(store.stadiums().len(), 3);
        assert_eq!(store.last_skipped()[0].id.as_deref(), Some("zz"));
    }

    #[tokio::test]
    async fn filters_narrow_and_clearing_restores_location_order() {
        let source = ScriptedStadiums::answering(vec![fetched(abc())]);
        let mut store = StadiumStore::new(source, EventSink::new(), HOME, 10.0);
        store.refresh(HOME).await;
        let full = store.visible().len();

        let five = store.apply_filters(StadiumFilters {
            field_size: Some(FieldSize::FiveASide),
            sort_by: SortBy::Price,
            ..Default::default()
        });
        assert_eq!(ids(five), ["A", "C"]);
        assert!(five.len() <= full);

        let near = store.apply_filters(StadiumFilters { max_distance: Some(2.0), ..Default::default() });
        assert_eq!(ids(near), ["C", "A"]);

        let cleared = store.clear_filters();
        assert_eq!(cleared.len(), full);
        assert_eq!(ids(cleared), ["C", "A", "B"]);
        assert_eq!(store.filters(), &StadiumFilters::default());
    }

    #[tokio::test]
    async fn details_fall_back_to_held_copy() {
        let source = ScriptedStadiums::answering(vec![fetched(abc())]);
        let mut store = StadiumStore::new(source, EventSink::new(), HOME, 10.0);
        store.refresh(HOME).await;

        assert_eq!(store.details("A").await.map(|s| s.distance), Some(2.0));
        assert!(store.details("missing").await.is_none());
        assert!(store.availability("A", NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()).await.is_empty());
        assert_eq!(store.reviews("A").await.len(), 1);
    }

    #[tokio::test]
    async fn mutations_publish_snapshots() {
        let events = EventSink::new();
        let mut rx = events.subscribe();
        let source = ScriptedStadiums::answering(vec![fetched(abc())]);
        let mut store = StadiumStore::new(source, events, HOME, 10.0);
        store.refresh(HOME).await;

        match rx.recv().await.unwrap() {
            StoreEvent::Stadiums(snapshot) => {
                assert_eq!(snapshot.total, 3);
                assert_eq!(ids(&snapshot.visible), ["C", "A", "B"]);
                assert!(snapshot.using_remote_data);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn reviews_are_validated_then_posted() {
        let source = ScriptedStadiums::answering(Vec::new());
        let store = StadiumStore::new(source.clone(), EventSink::new(), HOME, 10.0);

        let posted = store
            .add_review("A", ReviewDraft { rating: 5, comment: "Lights are great".into() })
            .await
            .unwrap();
        assert_eq!(posted.rating, 5.0);
        assert_eq!(posted.comment, "Lights are great");
        assert_eq!(source.posted.lock().unwrap().len(), 1);

        assert!(store.add_review("A", ReviewDraft { rating: 0, comment: String::new() }).await.is_err());
        assert_eq!(source.posted.lock().unwrap().len(), 1);

        let refused = store
            .add_review("closed", ReviewDraft { rating: 3, comment: String::new() })
            .await
            .unwrap_err();
        assert_eq!(refused.to_string(), "Reviews are closed");
    }
}
