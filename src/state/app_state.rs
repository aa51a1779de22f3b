use crate::app::MenuItem;
use crate::state::chat::ChatState;
use crate::state::events::{BookingSnapshot, MatchSnapshot, StadiumSnapshot};
use crate::state::filters::{MatchFilters, StadiumFilters};
use pitchside_api::{
    AvailabilitySlot, Booking, BookingStatus, MAX_RATING, MIN_RATING, Match, MatchDetail, Review,
    ReviewDraft, Stadium,
};

/// Moves a list cursor by `delta`, clamped to `len`.
fn step(selected: usize, len: usize, delta: isize) -> usize {
    if len == 0 {
        return 0;
    }
    selected.saturating_add_signed(delta).min(len - 1)
}

#[derive(Debug, Clone)]
pub struct StadiumDetail {
    pub stadium: Stadium,
    pub availability: Vec<AvailabilitySlot>,
    pub reviews: Vec<Review>,
}

// ---------------------------------------------------------------------------
// Stadium search
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StadiumsView {
    /// Last snapshot published by the stadium store.
    pub snapshot: Option<StadiumSnapshot>,
    pub selected: usize,
    pub detail: Option<StadiumDetail>,
}

impl StadiumsView {
    pub fn apply(&mut self, snapshot: StadiumSnapshot) {
        self.selected = self.selected.min(snapshot.visible.len().saturating_sub(1));
        self.snapshot = Some(snapshot);
    }

    pub fn visible(&self) -> &[Stadium] {
        self.snapshot.as_ref().map(|s| s.visible.as_slice()).unwrap_or_default()
    }

    pub fn filters(&self) -> StadiumFilters {
        self.snapshot.as_ref().map(|s| s.filters.clone()).unwrap_or_default()
    }

    pub fn selected_stadium(&self) -> Option<&Stadium> {
        self.visible().get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.selected = step(self.selected, self.visible().len(), delta);
    }
}

/// Review being written for one stadium.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewComposer {
    pub stadium_id: String,
    pub stadium_name: String,
    pub rating: u8,
    pub comment: String,
}

impl ReviewComposer {
    pub fn new(stadium: &Stadium) -> Self {
        Self {
            stadium_id: stadium.id.clone(),
            stadium_name: stadium.name.clone(),
            rating: MAX_RATING,
            comment: String::new(),
        }
    }

    pub fn adjust_rating(&mut self, delta: i8) {
        self.rating = self.rating.saturating_add_signed(delta).clamp(MIN_RATING, MAX_RATING);
    }

    pub fn draft(&self) -> ReviewDraft {
        ReviewDraft { rating: self.rating, comment: self.comment.trim().to_string() }
    }
}

// ---------------------------------------------------------------------------
// Matchmaking
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MatchesView {
    pub snapshot: Option<MatchSnapshot>,
    pub selected: usize,
    pub detail: Option<MatchDetail>,
}

impl MatchesView {
    pub fn apply(&mut self, snapshot: MatchSnapshot) {
        self.selected = self.selected.min(snapshot.visible.len().saturating_sub(1));
        self.snapshot = Some(snapshot);
    }

    pub fn visible(&self) -> &[Match] {
        self.snapshot.as_ref().map(|s| s.visible.as_slice()).unwrap_or_default()
    }

    pub fn filters(&self) -> MatchFilters {
        self.snapshot.as_ref().map(|s| s.filters).unwrap_or_default()
    }

    pub fn selected_match(&self) -> Option<&Match> {
        self.visible().get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.selected = step(self.selected, self.visible().len(), delta);
    }
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BookingsView {
    pub snapshot: Option<BookingSnapshot>,
    pub selected: usize,
    /// Status the list was last fetched with; `None` shows every booking.
    pub status: Option<BookingStatus>,
    pub detail: Option<Booking>,
}

impl BookingsView {
    pub fn apply(&mut self, snapshot: BookingSnapshot) {
        self.selected = self.selected.min(snapshot.bookings.len().saturating_sub(1));
        self.snapshot = Some(snapshot);
    }

    pub fn bookings(&self) -> &[Booking] {
        self.snapshot.as_ref().map(|s| s.bookings.as_slice()).unwrap_or_default()
    }

    pub fn selected_booking(&self) -> Option<&Booking> {
        self.bookings().get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.selected = step(self.selected, self.bookings().len(), delta);
    }

    /// All, then each status in turn.
    pub fn cycle_status(&mut self) -> Option<BookingStatus> {
        self.status = match self.status {
            None => Some(BookingStatus::Pending),
            Some(BookingStatus::Pending) => Some(BookingStatus::Confirmed),
            Some(BookingStatus::Confirmed) => Some(BookingStatus::Rejected),
            Some(BookingStatus::Rejected) => Some(BookingStatus::Cancelled),
            Some(BookingStatus::Cancelled) => None,
        };
        self.selected = 0;
        self.status
    }
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub notice: Option<String>,
    /// Open while a stadium review is being written.
    pub review: Option<ReviewComposer>,
    pub stadiums: StadiumsView,
    pub matches: MatchesView,
    pub bookings: BookingsView,
    pub chat: ChatState,
}

impl AppState {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            active_tab: MenuItem::default(),
            previous_tab: MenuItem::default(),
            show_logs: false,
            last_error: None,
            notice: None,
            review: None,
            stadiums: StadiumsView::default(),
            matches: MatchesView::default(),
            bookings: BookingsView::default(),
            chat: ChatState::new(username),
        }
    }
}
