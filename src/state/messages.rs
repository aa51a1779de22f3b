use crate::state::filters::{MatchFilters, StadiumFilters};
use crate::state::network::LoadingState;
use chrono::NaiveDate;
use crossterm::event::KeyEvent;
use pitchside_api::{
    AvailabilitySlot, Booking, BookingDraft, BookingStatus, Coordinate, MatchDetail, MatchDraft,
    PaymentMethod, PaymentReceipt, Review, ReviewDraft, Stadium,
};

#[derive(Debug, Clone)]
pub enum SyncRequest {
    /// Re-fetch stadiums around the current reference location.
    RefreshStadiums,
    SetLocation { coordinate: Coordinate },
    ApplyStadiumFilters { filters: StadiumFilters },
    ClearStadiumFilters,
    StadiumDetails { id: String, date: NaiveDate },
    AddReview { stadium_id: String, draft: ReviewDraft },
    RefreshMatches,
    MatchDetails { id: String },
    CreateMatch { draft: MatchDraft },
    JoinMatch { id: String },
    LeaveMatch { id: String },
    DiscardLocalMatch { id: String },
    ApplyMatchFilters { filters: MatchFilters },
    ClearMatchFilters,
    RefreshBookings { status: Option<BookingStatus> },
    CreateBooking { draft: BookingDraft },
    BookingDetails { id: String },
    CancelBooking { id: String, reason: String },
    PayBooking { id: String, method: PaymentMethod },
    SendChat { message: String },
    /// Forget the error every store is currently reporting.
    DismissErrors,
}

/// Worker replies that are not store snapshots. Snapshots arrive on the
/// `StoreEvent` broadcast instead.
#[derive(Debug)]
pub enum SyncResponse {
    LoadingStateChanged { loading_state: LoadingState },
    StadiumDetailLoaded {
        stadium: Stadium,
        availability: Vec<AvailabilitySlot>,
        reviews: Vec<Review>,
    },
    ReviewAdded { stadium_id: String, review: Review },
    MatchDetailLoaded { detail: MatchDetail },
    BookingDetailLoaded { booking: Booking },
    PaymentCompleted { booking_id: String, receipt: PaymentReceipt },
    ChatReplied { reply: String },
    Notice { message: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
}
