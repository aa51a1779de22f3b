use crate::state::bookings::BookingStore;
use crate::state::matches::MatchStore;
use crate::state::messages::{SyncRequest, SyncResponse};
use crate::state::remote::AssistantSource;
use crate::state::stadiums::StadiumStore;
use log::{debug, error};
use pitchside_api::client::{ApiError, ApiResult};
use pitchside_api::{ChatRequest, MatchQuery, is_local_id};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Owns every store and applies requests one at a time, in the order they
/// were queued. Store snapshots go out on the stores' event sink; everything
/// else comes back as a `SyncResponse`.
pub struct SyncWorker {
    stadiums: StadiumStore,
    matches: MatchStore,
    bookings: BookingStore,
    assistant: Arc<dyn AssistantSource>,
    player_name: Option<String>,
    matches_loaded: bool,
    requests: mpsc::Receiver<SyncRequest>,
    responses: mpsc::Sender<SyncResponse>,
    is_loading: Arc<AtomicBool>,
}

impl SyncWorker {
    pub fn new(
        stadiums: StadiumStore,
        matches: MatchStore,
        bookings: BookingStore,
        assistant: Arc<dyn AssistantSource>,
        requests: mpsc::Receiver<SyncRequest>,
        responses: mpsc::Sender<SyncResponse>,
    ) -> Self {
        Self {
            stadiums,
            matches,
            bookings,
            assistant,
            player_name: None,
            matches_loaded: false,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Name sent along with join requests.
    pub fn with_player_name(mut self, player_name: Option<String>) -> Self {
        self.player_name = player_name.filter(|n| !n.trim().is_empty());
        self
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            self.start_loading_animation().await;

            debug!("sync request: {request:?}");
            let result = self.handle(request).await;

            self.stop_loading_animation(result.is_ok()).await;

            let response = match result {
                Ok(Some(response)) => response,
                Ok(None) => continue,
                Err(err) => SyncResponse::Error { message: err.to_string() },
            };

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send sync response: {e}");
                break;
            }
        }
    }

    async fn handle(&mut self, request: SyncRequest) -> ApiResult<Option<SyncResponse>> {
        match request {
            SyncRequest::RefreshStadiums => {
                let origin = self.stadiums.origin();
                self.stadiums.refresh(origin).await;
                Ok(None)
            }
            SyncRequest::SetLocation { coordinate } => {
                debug!("reference location moved to {coordinate:?}");
                self.stadiums.set_user_location(coordinate);
                self.stadiums.refresh(coordinate).await;
                Ok(None)
            }
            SyncRequest::ApplyStadiumFilters { filters } => {
                self.stadiums.apply_filters(filters);
                Ok(None)
            }
            SyncRequest::ClearStadiumFilters => {
                self.stadiums.clear_filters();
                Ok(None)
            }
            SyncRequest::StadiumDetails { id, date } => {
                let stadium = self
                    .stadiums
                    .details(&id)
                    .await
                    .ok_or_else(|| ApiError::NotFound(format!("stadium {id}")))?;
                let availability = self.stadiums.availability(&id, date).await;
                let reviews = self.stadiums.reviews(&id).await;
                Ok(Some(SyncResponse::StadiumDetailLoaded { stadium, availability, reviews }))
            }
            SyncRequest::AddReview { stadium_id, draft } => {
                let review = self.stadiums.add_review(&stadium_id, draft).await?;
                Ok(Some(SyncResponse::ReviewAdded { stadium_id, review }))
            }
            SyncRequest::RefreshMatches => {
                let query = self.match_query();
                if self.matches_loaded {
                    self.matches.refresh(&query).await;
                } else {
                    self.matches.initialize(&query).await;
                    self.matches_loaded = true;
                }
                Ok(None)
            }
            SyncRequest::MatchDetails { id } => {
                let detail = self
                    .matches
                    .details(&id)
                    .await
                    .ok_or_else(|| ApiError::NotFound(format!("match {id}")))?;
                Ok(Some(SyncResponse::MatchDetailLoaded { detail }))
            }
            SyncRequest::CreateMatch { draft } => {
                let created = self.matches.create(draft).await;
                let message = if is_local_id(&created.id) {
                    format!("Match at {} saved on this device", created.stadium.name)
                } else {
                    format!("Match at {} created", created.stadium.name)
                };
                Ok(Some(SyncResponse::Notice { message }))
            }
            SyncRequest::JoinMatch { id } => {
                if self.matches.join(&id, self.player_name.as_deref()).await {
                    Ok(Some(SyncResponse::Notice { message: "Joined match".into() }))
                } else {
                    Err(ApiError::Other(self.slot_failure("join")))
                }
            }
            SyncRequest::LeaveMatch { id } => {
                if self.matches.leave(&id).await {
                    Ok(Some(SyncResponse::Notice { message: "Left match".into() }))
                } else {
                    Err(ApiError::Other(self.slot_failure("leave")))
                }
            }
            SyncRequest::DiscardLocalMatch { id } => {
                if self.matches.discard_local(&id).await {
                    Ok(Some(SyncResponse::Notice { message: "Local match discarded".into() }))
                } else {
                    Err(ApiError::Other("only matches kept on this device can be discarded".into()))
                }
            }
            SyncRequest::ApplyMatchFilters { filters } => {
                self.matches.apply_filters(filters);
                Ok(None)
            }
            SyncRequest::ClearMatchFilters => {
                self.matches.clear_filters();
                Ok(None)
            }
            SyncRequest::RefreshBookings { status } => {
                self.bookings.refresh(status).await;
                Ok(None)
            }
            SyncRequest::CreateBooking { draft } => {
                let created = self
                    .bookings
                    .create(draft)
                    .await
                    .map_err(|e| ApiError::Other(e.to_string()))?;
                let message = if is_local_id(&created.id) {
                    format!("Booking at {} saved offline, awaiting confirmation", created.stadium.name)
                } else {
                    format!("Booked {} for {} DA", created.stadium.name, created.total_price)
                };
                Ok(Some(SyncResponse::Notice { message }))
            }
            SyncRequest::BookingDetails { id } => {
                let booking = self
                    .bookings
                    .details(&id)
                    .await
                    .ok_or_else(|| ApiError::NotFound(format!("booking {id}")))?;
                Ok(Some(SyncResponse::BookingDetailLoaded { booking }))
            }
            SyncRequest::CancelBooking { id, reason } => {
                if self.bookings.cancel(&id, &reason).await {
                    Ok(Some(SyncResponse::Notice { message: "Booking cancelled".into() }))
                } else {
                    let reason = self.bookings.error().unwrap_or("cancellation failed");
                    Err(ApiError::Other(reason.to_string()))
                }
            }
            SyncRequest::PayBooking { id, method } => {
                let receipt = self.bookings.pay(&id, method).await?;
                Ok(Some(SyncResponse::PaymentCompleted { booking_id: id, receipt }))
            }
            SyncRequest::SendChat { message } => {
                let origin = self.stadiums.origin();
                let request = ChatRequest {
                    message,
                    latitude: origin.latitude,
                    longitude: origin.longitude,
                    skill_level: self.matches.filters().skill_level,
                    field_size: self.stadiums.filters().field_size,
                    date: None,
                };
                let reply = self.assistant.ask(&request).await?;
                Ok(Some(SyncResponse::ChatReplied { reply: reply.response }))
            }
            SyncRequest::DismissErrors => {
                self.stadiums.clear_search_error();
                self.matches.clear_error();
                self.bookings.clear_error();
                Ok(None)
            }
        }
    }

    fn match_query(&self) -> MatchQuery {
        MatchQuery {
            skill_level: self.matches.filters().skill_level,
            near: Some(self.stadiums.origin()),
        }
    }

    fn slot_failure(&self, action: &str) -> String {
        match self.matches.error() {
            Some(reason) => format!("Could not {action} match: {reason}"),
            None => format!("Could not {action} match"),
        }
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state = LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(SyncResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(SyncResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(SyncResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::events::{EventSink, StoreEvent};
    use crate::state::local_store::{
        LOCAL_BOOKINGS_KEY, LOCAL_MATCHES_KEY, LocalEntities, MemoryStore,
    };
    use crate::state::location::DEFAULT_COORDINATE;
    use crate::state::matches::SlotPolicy;
    use crate::state::remote::{BookingSource, MatchSource, StadiumSource};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use pitchside_api::{
        AvailabilitySlot, Booking, BookingDraft, BookingStatus, ChatReply, Coordinate, FieldSize,
        Match, MatchDetail, MatchDraft, MatchDraftKind, MatchPlayer, Normalized, PaymentMethod,
        PaymentReceipt, Review, ReviewDraft, SkillLevel, Stadium, StadiumRef,
    };
    use std::sync::Mutex;

    /// Server that is never reachable, except for the chat assistant which
    /// echoes the request it got.
    #[derive(Default)]
    struct Unreachable {
        chats: Mutex<Vec<ChatRequest>>,
    }

    fn down<T>() -> ApiResult<T> {
        Err(ApiError::Other("connection refused".into()))
    }

    #[async_trait]
    impl StadiumSource for Unreachable {
        async fn nearby(&self, _: Coordinate, _: f64) -> ApiResult<Normalized<Stadium>> {
            down()
        }
        async fn stadium(&self, _: &str) -> ApiResult<Stadium> {
            down()
        }
        async fn availability(&self, _: &str, _: NaiveDate) -> ApiResult<Vec<AvailabilitySlot>> {
            down()
        }
        async fn reviews(&self, _: &str) -> ApiResult<Vec<Review>> {
            down()
        }
        async fn add_review(&self, _: &str, _: &ReviewDraft) -> ApiResult<Option<Review>> {
            down()
        }
    }

    #[async_trait]
    impl MatchSource for Unreachable {
        async fn matches(&self, _: &MatchQuery) -> ApiResult<Normalized<Match>> {
            down()
        }
        async fn create_match(&self, _: &MatchDraft) -> ApiResult<Match> {
            down()
        }
        async fn join_match(&self, _: &str, _: Option<&str>) -> ApiResult<Option<Match>> {
            down()
        }
        async fn leave_match(&self, _: &str) -> ApiResult<Option<Match>> {
            down()
        }
        async fn match_detail(&self, _: &str) -> ApiResult<MatchDetail> {
            down()
        }
        async fn match_players(&self, _: &str) -> ApiResult<Vec<MatchPlayer>> {
            down()
        }
    }

    #[async_trait]
    impl BookingSource for Unreachable {
        async fn bookings(&self, _: Option<BookingStatus>) -> ApiResult<Normalized<Booking>> {
            down()
        }
        async fn booking(&self, _: &str) -> ApiResult<Booking> {
            down()
        }
        async fn create_booking(&self, _: &BookingDraft) -> ApiResult<Booking> {
            down()
        }
        async fn cancel_booking(&self, _: &str, _: &str) -> ApiResult<()> {
            down()
        }
        async fn pay_booking(&self, _: &str, _: PaymentMethod) -> ApiResult<PaymentReceipt> {
            down()
        }
    }

    #[async_trait]
    impl AssistantSource for Unreachable {
        async fn ask(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
            self.chats.lock().unwrap().push(request.clone());
            Ok(ChatReply { response: format!("you said: {}", request.message) })
        }
    }

    fn stadium_ref() -> StadiumRef {
        StadiumRef { id: "s1".into(), name: "Stade 5 Juillet".into(), ..StadiumRef::default() }
    }

    fn team_draft() -> MatchDraft {
        MatchDraft {
            stadium: stadium_ref(),
            date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            field_size: FieldSize::FiveASide,
            skill_level: SkillLevel::Beginner,
            organizer_name: Some("Amine".into()),
            kind: MatchDraftKind::Team { team_name: "FC Test".into() },
        }
    }

    fn booking_draft() -> BookingDraft {
        BookingDraft {
            stadium: stadium_ref(),
            date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            start_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            duration_hours: 2,
            price_per_hour: 4000,
        }
    }

    struct Harness {
        requests: mpsc::Sender<SyncRequest>,
        responses: mpsc::Receiver<SyncResponse>,
        events: EventSink,
        server: Arc<Unreachable>,
    }

    fn spawn_worker() -> Harness {
        let server = Arc::new(Unreachable::default());
        let events = EventSink::new();
        let kv = Arc::new(MemoryStore::new());

        let stadiums = StadiumStore::new(server.clone(), events.clone(), DEFAULT_COORDINATE, 10.0);
        let matches = MatchStore::new(
            server.clone(),
            LocalEntities::new(kv.clone(), LOCAL_MATCHES_KEY),
            events.clone(),
            SlotPolicy::Optimistic,
        );
        let bookings =
            BookingStore::new(server.clone(), LocalEntities::new(kv, LOCAL_BOOKINGS_KEY), events.clone());

        let (req_tx, req_rx) = mpsc::channel(16);
        let (resp_tx, resp_rx) = mpsc::channel(256);
        let worker = SyncWorker::new(stadiums, matches, bookings, server.clone(), req_rx, resp_tx)
            .with_player_name(Some("Amine".into()));
        tokio::spawn(worker.run());

        Harness { requests: req_tx, responses: resp_rx, events, server }
    }

    /// Drain replies until the worker and its spinners have hung up, keeping
    /// everything except spinner frames plus the final spinner state of each
    /// request.
    async fn drain(mut responses: mpsc::Receiver<SyncResponse>) -> (Vec<SyncResponse>, Vec<char>) {
        let mut replies = Vec::new();
        let mut finished = Vec::new();
        while let Some(response) = responses.recv().await {
            match response {
                SyncResponse::LoadingStateChanged { loading_state } if !loading_state.is_loading => {
                    finished.push(loading_state.spinner_char);
                }
                SyncResponse::LoadingStateChanged { .. } => {}
                other => replies.push(other),
            }
        }
        (replies, finished)
    }

    #[tokio::test]
    async fn offline_creates_stay_on_device_and_are_announced() {
        let harness = spawn_worker();
        let mut store_events = harness.events.subscribe();

        harness.requests.send(SyncRequest::CreateMatch { draft: team_draft() }).await.unwrap();
        harness.requests.send(SyncRequest::CreateBooking { draft: booking_draft() }).await.unwrap();
        drop(harness.requests);

        let (replies, finished) = drain(harness.responses).await;
        assert_eq!(finished, vec![' ', ' ']);
        let notices: Vec<String> = replies
            .into_iter()
            .filter_map(|r| match r {
                SyncResponse::Notice { message } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(
            notices,
            vec![
                "Match at Stade 5 Juillet saved on this device".to_string(),
                "Booking at Stade 5 Juillet saved offline, awaiting confirmation".to_string(),
            ]
        );

        let mut saw_team_match = false;
        let mut saw_offline_booking = false;
        while let Ok(event) = store_events.try_recv() {
            match event {
                StoreEvent::Matches(snapshot) => {
                    saw_team_match |= snapshot.visible.iter().any(|m| is_local_id(&m.id));
                }
                StoreEvent::Bookings(snapshot) => {
                    saw_offline_booking |= snapshot
                        .bookings
                        .iter()
                        .any(|b| is_local_id(&b.id) && b.status == BookingStatus::Pending);
                }
                StoreEvent::Stadiums(_) => {}
            }
        }
        assert!(saw_team_match);
        assert!(saw_offline_booking);
    }

    #[tokio::test]
    async fn failures_come_back_as_errors_with_error_spinner() {
        let harness = spawn_worker();

        harness.requests.send(SyncRequest::JoinMatch { id: "m-404".into() }).await.unwrap();
        harness
            .requests
            .send(SyncRequest::PayBooking { id: "b-404".into(), method: PaymentMethod::Cash })
            .await
            .unwrap();
        drop(harness.requests);

        let (replies, finished) = drain(harness.responses).await;
        assert_eq!(finished, vec![ERROR_CHAR, ERROR_CHAR]);
        assert_eq!(replies.len(), 2);
        assert!(replies.iter().all(|r| matches!(r, SyncResponse::Error { .. })));
    }

    #[tokio::test]
    async fn chat_carries_location_and_active_filters() {
        let harness = spawn_worker();
        let oran = Coordinate::new(35.6971, -0.6308);

        harness.requests.send(SyncRequest::SetLocation { coordinate: oran }).await.unwrap();
        harness
            .requests
            .send(SyncRequest::ApplyMatchFilters {
                filters: crate::state::filters::MatchFilters {
                    skill_level: Some(SkillLevel::Advanced),
                    match_type: None,
                },
            })
            .await
            .unwrap();
        harness.requests.send(SyncRequest::SendChat { message: "any games tonight?".into() }).await.unwrap();
        drop(harness.requests);

        let (replies, _) = drain(harness.responses).await;
        assert!(replies.iter().any(|r| matches!(
            r,
            SyncResponse::ChatReplied { reply } if reply == "you said: any games tonight?"
        )));

        let sent = harness.server.chats.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!((sent[0].latitude, sent[0].longitude), (oran.latitude, oran.longitude));
        assert_eq!(sent[0].skill_level, Some(SkillLevel::Advanced));
        assert_eq!(sent[0].field_size, None);
    }

    #[tokio::test]
    async fn late_bookings_and_bad_reviews_are_refused() {
        let harness = spawn_worker();
        let mut store_events = harness.events.subscribe();

        let late = BookingDraft { start_time: NaiveTime::from_hms_opt(23, 0, 0).unwrap(), ..booking_draft() };
        harness.requests.send(SyncRequest::CreateBooking { draft: late }).await.unwrap();
        harness
            .requests
            .send(SyncRequest::AddReview {
                stadium_id: "s1".into(),
                draft: ReviewDraft { rating: 9, comment: String::new() },
            })
            .await
            .unwrap();
        harness.requests.send(SyncRequest::DismissErrors).await.unwrap();
        drop(harness.requests);

        let (replies, finished) = drain(harness.responses).await;
        assert_eq!(finished, vec![ERROR_CHAR, ERROR_CHAR, ' ']);
        let errors: Vec<String> = replies
            .into_iter()
            .filter_map(|r| match r {
                SyncResponse::Error { message } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("past midnight"));
        assert!(errors[1].contains("rating must be between 1 and 5"));

        let mut last_booking_error = Some(String::new());
        while let Ok(event) = store_events.try_recv() {
            if let StoreEvent::Bookings(snapshot) = event {
                assert!(snapshot.bookings.is_empty());
                last_booking_error = snapshot.error;
            }
        }
        assert_eq!(last_booking_error, None);
    }

    #[tokio::test]
    async fn match_filters_clear_and_missing_details_fail() {
        let harness = spawn_worker();
        let mut store_events = harness.events.subscribe();
        let advanced = crate::state::filters::MatchFilters {
            skill_level: Some(SkillLevel::Advanced),
            match_type: None,
        };

        harness.requests.send(SyncRequest::ApplyMatchFilters { filters: advanced }).await.unwrap();
        harness.requests.send(SyncRequest::ClearMatchFilters).await.unwrap();
        harness.requests.send(SyncRequest::MatchDetails { id: "m-404".into() }).await.unwrap();
        drop(harness.requests);

        let (replies, finished) = drain(harness.responses).await;
        assert_eq!(finished, vec![' ', ' ', ERROR_CHAR]);
        assert!(matches!(&replies[..], [SyncResponse::Error { .. }]));

        let mut seen = Vec::new();
        while let Ok(event) = store_events.try_recv() {
            if let StoreEvent::Matches(snapshot) = event {
                seen.push(snapshot.filters.is_active());
            }
        }
        assert_eq!(seen.first(), Some(&true));
        assert_eq!(seen.last(), Some(&false));
    }
}
