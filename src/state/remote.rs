use async_trait::async_trait;
use chrono::NaiveDate;
use pitchside_api::client::{ApiResult, PitchsideApi};
use pitchside_api::{
    AvailabilitySlot, Booking, BookingDraft, BookingStatus, ChatReply, ChatRequest, Coordinate,
    Match, MatchDetail, MatchDraft, MatchPlayer, MatchQuery, Normalized, PaymentMethod,
    PaymentReceipt, Review, ReviewDraft, Stadium,
};

#[async_trait]
pub trait StadiumSource: Send + Sync {
    async fn nearby(&self, origin: Coordinate, radius_km: f64) -> ApiResult<Normalized<Stadium>>;
    async fn stadium(&self, id: &str) -> ApiResult<Stadium>;
    async fn availability(&self, id: &str, date: NaiveDate) -> ApiResult<Vec<AvailabilitySlot>>;
    async fn reviews(&self, id: &str) -> ApiResult<Vec<Review>>;
    /// `Ok(None)` when the server acknowledged without returning the review.
    async fn add_review(&self, id: &str, review: &ReviewDraft) -> ApiResult<Option<Review>>;
}

#[async_trait]
pub trait MatchSource: Send + Sync {
    async fn matches(&self, query: &MatchQuery) -> ApiResult<Normalized<Match>>;
    async fn match_detail(&self, id: &str) -> ApiResult<MatchDetail>;
    async fn match_players(&self, id: &str) -> ApiResult<Vec<MatchPlayer>>;
    async fn create_match(&self, draft: &MatchDraft) -> ApiResult<Match>;
    /// `Ok(None)` when the server acknowledged without returning the match.
    async fn join_match(&self, id: &str, player_name: Option<&str>) -> ApiResult<Option<Match>>;
    async fn leave_match(&self, id: &str) -> ApiResult<Option<Match>>;
}

#[async_trait]
pub trait BookingSource: Send + Sync {
    async fn bookings(&self, status: Option<BookingStatus>) -> ApiResult<Normalized<Booking>>;
    async fn booking(&self, id: &str) -> ApiResult<Booking>;
    async fn create_booking(&self, draft: &BookingDraft) -> ApiResult<Booking>;
    async fn cancel_booking(&self, id: &str, reason: &str) -> ApiResult<()>;
    async fn pay_booking(&self, id: &str, method: PaymentMethod) -> ApiResult<PaymentReceipt>;
}

#[async_trait]
pub trait AssistantSource: Send + Sync {
    async fn ask(&self, request: &ChatRequest) -> ApiResult<ChatReply>;
}

#[async_trait]
impl StadiumSource for PitchsideApi {
    async fn nearby(&self, origin: Coordinate, radius_km: f64) -> ApiResult<Normalized<Stadium>> {
        self.fetch_nearby_stadiums(origin, radius_km).await
    }

    async fn stadium(&self, id: &str) -> ApiResult<Stadium> {
        self.fetch_stadium(id).await
    }

    async fn availability(&self, id: &str, date: NaiveDate) -> ApiResult<Vec<AvailabilitySlot>> {
        self.fetch_availability(id, date).await
    }

    async fn reviews(&self, id: &str) -> ApiResult<Vec<Review>> {
        self.fetch_reviews(id).await
    }

    async fn add_review(&self, id: &str, review: &ReviewDraft) -> ApiResult<Option<Review>> {
        PitchsideApi::add_review(self, id, review).await
    }
}

#[async_trait]
impl MatchSource for PitchsideApi {
    async fn matches(&self, query: &MatchQuery) -> ApiResult<Normalized<Match>> {
        self.fetch_matches(query).await
    }

    async fn match_detail(&self, id: &str) -> ApiResult<MatchDetail> {
        self.fetch_match(id).await
    }

    async fn match_players(&self, id: &str) -> ApiResult<Vec<MatchPlayer>> {
        self.fetch_match_players(id).await
    }

    async fn create_match(&self, draft: &MatchDraft) -> ApiResult<Match> {
        PitchsideApi::create_match(self, draft).await
    }

    async fn join_match(&self, id: &str, player_name: Option<&str>) -> ApiResult<Option<Match>> {
        PitchsideApi::join_match(self, id, player_name).await
    }

    async fn leave_match(&self, id: &str) -> ApiResult<Option<Match>> {
        PitchsideApi::leave_match(self, id).await
    }
}

#[async_trait]
impl BookingSource for PitchsideApi {
    async fn bookings(&self, status: Option<BookingStatus>) -> ApiResult<Normalized<Booking>> {
        self.fetch_bookings(status).await
    }

    async fn booking(&self, id: &str) -> ApiResult<Booking> {
        self.fetch_booking(id).await
    }

    async fn create_booking(&self, draft: &BookingDraft) -> ApiResult<Booking> {
        PitchsideApi::create_booking(self, draft).await
    }

    async fn cancel_booking(&self, id: &str, reason: &str) -> ApiResult<()> {
        PitchsideApi::cancel_booking(self, id, reason).await
    }

    async fn pay_booking(&self, id: &str, method: PaymentMethod) -> ApiResult<PaymentReceipt> {
        self.process_payment(id, method, None).await
    }
}

#[async_trait]
impl AssistantSource for PitchsideApi {
    async fn ask(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        self.send_chat(request).await
    }
}
