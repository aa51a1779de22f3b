use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, ReviewComposer, StadiumDetail};
use crate::state::events::StoreEvent;
use crate::state::filters::{MatchFilters, StadiumFilters};
use crate::state::messages::SyncRequest;
use chrono::{Local, NaiveDate, NaiveTime};
use pitchside_api::{
    AvailabilitySlot, Booking, BookingDraft, FieldSize, MatchDetail, MatchDraft, MatchDraftKind,
    MatchType, PaymentMethod, PaymentReceipt, Review, SkillLevel, Stadium, StadiumRef,
    is_local_id,
};

const PRICE_STEPS: [u32; 3] = [3000, 5000, 8000];
const DISTANCE_STEPS: [f64; 3] = [2.0, 5.0, 10.0];
const EVENING_KICKOFF: (u32, u32) = (20, 0);

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Stadiums,
    Matches,
    Bookings,
    Chat,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        let username = settings.player_name.clone().unwrap_or_else(|| "player".to_string());
        let app = Self { state: AppState::new(username), settings };

        log::set_max_level(app.settings.log_level);
        tui_logger::set_default_level(app.settings.log_level);

        app
    }

    // -----------------------------------------------------------------------
    // Sync worker handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Stadiums(snapshot) => self.state.stadiums.apply(snapshot),
            StoreEvent::Matches(snapshot) => self.state.matches.apply(snapshot),
            StoreEvent::Bookings(snapshot) => self.state.bookings.apply(snapshot),
        }
    }

    pub fn on_stadium_detail(
        &mut self,
        stadium: Stadium,
        availability: Vec<AvailabilitySlot>,
        reviews: Vec<Review>,
    ) {
        self.state.last_error = None;
        self.state.stadiums.detail = Some(StadiumDetail { stadium, availability, reviews });
    }

    pub fn on_review_added(&mut self, stadium_id: &str, review: Review) {
        if let Some(detail) = self.state.stadiums.detail.as_mut()
            && detail.stadium.id == stadium_id
        {
            detail.reviews.insert(0, review);
        }
        self.on_notice("Review posted".to_string());
    }

    pub fn on_match_detail(&mut self, detail: MatchDetail) {
        self.state.last_error = None;
        self.state.matches.detail = Some(detail);
    }

    pub fn on_booking_detail(&mut self, booking: Booking) {
        self.state.last_error = None;
        self.state.bookings.detail = Some(booking);
    }

    pub fn on_payment_completed(&mut self, booking_id: &str, receipt: PaymentReceipt) {
        let reference = receipt.transaction_id.unwrap_or_else(|| "no reference".to_string());
        self.on_notice(format!("Booking {booking_id} paid ({reference})"));
    }

    pub fn on_chat_reply(&mut self, reply: String) {
        self.state.chat.push_reply(reply);
    }

    pub fn on_notice(&mut self, message: String) {
        self.state.last_error = None;
        self.state.notice = Some(message);
    }

    pub fn on_error(&mut self, message: String) {
        self.state.chat.reply_failed(&message);
        self.state.notice = None;
        self.state.last_error = Some(message);
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    /// Switches tab, returning the fetch the new tab needs on first show.
    pub fn update_tab(&mut self, next: MenuItem) -> Option<SyncRequest> {
        if self.state.active_tab == next {
            return None;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        match next {
            MenuItem::Matches if self.state.matches.snapshot.is_none() => Some(SyncRequest::RefreshMatches),
            MenuItem::Bookings if self.state.bookings.snapshot.is_none() => {
                Some(SyncRequest::RefreshBookings { status: self.state.bookings.status })
            }
            MenuItem::Chat => {
                self.state.chat.scroll_offset = 0;
                None
            }
            _ => None,
        }
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    /// Clears the status line here and the errors the stores hold.
    pub fn dismiss_errors(&mut self) -> SyncRequest {
        self.state.last_error = None;
        self.state.notice = None;
        SyncRequest::DismissErrors
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    /// Refetch whatever the active tab shows.
    pub fn refresh_active_tab(&self) -> Option<SyncRequest> {
        match self.state.active_tab {
            MenuItem::Stadiums => Some(SyncRequest::RefreshStadiums),
            MenuItem::Matches => Some(SyncRequest::RefreshMatches),
            MenuItem::Bookings => Some(SyncRequest::RefreshBookings { status: self.state.bookings.status }),
            MenuItem::Chat | MenuItem::Help => None,
        }
    }

    // -----------------------------------------------------------------------
    // Stadium search
    // -----------------------------------------------------------------------

    pub fn cycle_field_size_filter(&self) -> SyncRequest {
        let mut filters = self.state.stadiums.filters();
        filters.field_size = cycle_option(filters.field_size, &FieldSize::ALL);
        SyncRequest::ApplyStadiumFilters { filters }
    }

    pub fn cycle_max_price_filter(&self) -> SyncRequest {
        let mut filters = self.state.stadiums.filters();
        filters.max_price = cycle_option(filters.max_price, &PRICE_STEPS);
        SyncRequest::ApplyStadiumFilters { filters }
    }

    pub fn cycle_max_distance_filter(&self) -> SyncRequest {
        let mut filters = self.state.stadiums.filters();
        filters.max_distance = cycle_option(filters.max_distance, &DISTANCE_STEPS);
        SyncRequest::ApplyStadiumFilters { filters }
    }

    pub fn cycle_sort(&self) -> SyncRequest {
        let filters = self.state.stadiums.filters();
        SyncRequest::ApplyStadiumFilters {
            filters: StadiumFilters { sort_by: filters.sort_by.next(), ..filters },
        }
    }

    pub fn stadium_details(&self) -> Option<SyncRequest> {
        let stadium = self.state.stadiums.selected_stadium()?;
        Some(SyncRequest::StadiumDetails { id: stadium.id.clone(), date: today() })
    }

    pub fn close_stadium_details(&mut self) {
        self.state.stadiums.detail = None;
    }

    pub fn start_review(&mut self) {
        if let Some(stadium) = self.state.stadiums.selected_stadium() {
            self.state.review = Some(ReviewComposer::new(stadium));
        }
    }

    pub fn submit_review(&mut self) -> Option<SyncRequest> {
        let composer = self.state.review.take()?;
        Some(SyncRequest::AddReview { draft: composer.draft(), stadium_id: composer.stadium_id })
    }

    pub fn book_selected_stadium(&self) -> Option<SyncRequest> {
        let stadium = self.state.stadiums.selected_stadium()?;
        Some(SyncRequest::CreateBooking { draft: booking_draft(stadium, today()) })
    }

    pub fn organize_at_selected_stadium(&self, match_type: MatchType) -> Option<SyncRequest> {
        let stadium = self.state.stadiums.selected_stadium()?;
        let organizer = self.settings.player_name.as_deref();
        Some(SyncRequest::CreateMatch {
            draft: match_draft(stadium, today(), match_type, organizer),
        })
    }

    // -----------------------------------------------------------------------
    // Matchmaking
    // -----------------------------------------------------------------------

    pub fn join_selected_match(&self) -> Option<SyncRequest> {
        let selected = self.state.matches.selected_match()?;
        Some(SyncRequest::JoinMatch { id: selected.id.clone() })
    }

    pub fn leave_selected_match(&self) -> Option<SyncRequest> {
        let selected = self.state.matches.selected_match()?;
        Some(SyncRequest::LeaveMatch { id: selected.id.clone() })
    }

    pub fn match_details(&self) -> Option<SyncRequest> {
        let selected = self.state.matches.selected_match()?;
        Some(SyncRequest::MatchDetails { id: selected.id.clone() })
    }

    pub fn close_match_details(&mut self) {
        self.state.matches.detail = None;
    }

    pub fn discard_selected_match(&self) -> Option<SyncRequest> {
        let selected = self.state.matches.selected_match()?;
        is_local_id(&selected.id).then(|| SyncRequest::DiscardLocalMatch { id: selected.id.clone() })
    }

    pub fn cycle_skill_filter(&self) -> SyncRequest {
        let filters = self.state.matches.filters();
        SyncRequest::ApplyMatchFilters {
            filters: MatchFilters {
                skill_level: cycle_option(filters.skill_level, &SkillLevel::ALL),
                ..filters
            },
        }
    }

    pub fn cycle_match_type_filter(&self) -> SyncRequest {
        let filters = self.state.matches.filters();
        SyncRequest::ApplyMatchFilters {
            filters: MatchFilters {
                match_type: cycle_option(filters.match_type, &[MatchType::Player, MatchType::Team]),
                ..filters
            },
        }
    }

    // -----------------------------------------------------------------------
    // Bookings
    // -----------------------------------------------------------------------

    pub fn cycle_booking_status(&mut self) -> SyncRequest {
        let status = self.state.bookings.cycle_status();
        SyncRequest::RefreshBookings { status }
    }

    pub fn booking_details(&self) -> Option<SyncRequest> {
        let booking = self.state.bookings.selected_booking()?;
        Some(SyncRequest::BookingDetails { id: booking.id.clone() })
    }

    pub fn close_booking_details(&mut self) {
        self.state.bookings.detail = None;
    }

    pub fn cancel_selected_booking(&self) -> Option<SyncRequest> {
        let booking = self.state.bookings.selected_booking()?;
        Some(SyncRequest::CancelBooking {
            id: booking.id.clone(),
            reason: "Cancelled by player".to_string(),
        })
    }

    pub fn pay_selected_booking(&self, method: PaymentMethod) -> Option<SyncRequest> {
        let booking = self.state.bookings.selected_booking()?;
        Some(SyncRequest::PayBooking { id: booking.id.clone(), method })
    }

    // -----------------------------------------------------------------------
    // Assistant chat
    // -----------------------------------------------------------------------

    pub fn submit_chat(&mut self) -> Option<SyncRequest> {
        let message = self.state.chat.submit_input()?;
        Some(SyncRequest::SendChat { message })
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn evening_kickoff() -> NaiveTime {
    let (hour, minute) = EVENING_KICKOFF;
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

/// `None`, then each of `all` in turn, then `None` again.
fn cycle_option<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(value) => {
            let at = all.iter().position(|candidate| *candidate == value)?;
            all.get(at + 1).copied()
        }
    }
}

/// One hour at the evening kickoff slot.
fn booking_draft(stadium: &Stadium, date: NaiveDate) -> BookingDraft {
    BookingDraft {
        stadium: StadiumRef::from(stadium),
        date,
        start_time: evening_kickoff(),
        duration_hours: 1,
        price_per_hour: stadium.price_per_hour,
    }
}

/// Player matches split the hourly price between a full roster.
fn match_draft(
    stadium: &Stadium,
    date: NaiveDate,
    match_type: MatchType,
    organizer: Option<&str>,
) -> MatchDraft {
    let field_size = stadium.field_size;
    let kind = match match_type {
        MatchType::Player => {
            let max_players = field_size.max_players();
            MatchDraftKind::Player {
                slots_needed: max_players.saturating_sub(1),
                price_per_player: stadium.price_per_hour / max_players.max(1),
            }
        }
        MatchType::Team => MatchDraftKind::Team {
            team_name: format!("{} FC", organizer.unwrap_or("Pitchside")),
        },
    };
    MatchDraft {
        stadium: StadiumRef::from(stadium),
        date,
        time: evening_kickoff(),
        field_size,
        skill_level: SkillLevel::default(),
        organizer_name: organizer.map(str::to_string),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchside_api::Coordinate;

    fn stadium() -> Stadium {
        Stadium {
            id: "s1".into(),
            name: "Stade Omnisport".into(),
            address: "Bab Ezzouar".into(),
            coordinate: Coordinate::new(36.72, 3.18),
            price_per_hour: 7000,
            field_size: FieldSize::SevenASide,
            rating: 4.5,
            amenities: Vec::new(),
            image: None,
            distance: 1.2,
        }
    }

    #[test]
    fn option_cycle_wraps_through_none() {
        let all = [1, 2, 3];
        let mut current = None;
        let mut seen = Vec::new();
        for _ in 0..5 {
            current = cycle_option(current, &all);
            seen.push(current);
        }
        assert_eq!(seen, vec![Some(1), Some(2), Some(3), None, Some(1)]);
        assert_eq!(cycle_option(Some(9), &all), None);
    }

    #[test]
    fn player_draft_fills_the_roster_minus_organizer() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let draft = match_draft(&stadium(), date, MatchType::Player, Some("Amine"));
        assert_eq!(draft.field_size, FieldSize::SevenASide);
        assert_eq!(draft.organizer_name.as_deref(), Some("Amine"));
        assert_eq!(
            draft.kind,
            MatchDraftKind::Player { slots_needed: 13, price_per_player: 500 }
        );

        let team = match_draft(&stadium(), date, MatchType::Team, None);
        assert_eq!(team.kind, MatchDraftKind::Team { team_name: "Pitchside FC".into() });
    }

    #[test]
    fn booking_draft_is_one_evening_hour() {
        let date = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let draft = booking_draft(&stadium(), date);
        assert_eq!(draft.stadium.id, "s1");
        assert_eq!(draft.start_time, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        assert_eq!(draft.total_price(), Ok(7000));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn first_visit_to_a_tab_fetches_it() {
        let mut app = App { settings: AppSettings::default(), state: AppState::new("amine") };
        assert!(matches!(app.update_tab(MenuItem::Matches), Some(SyncRequest::RefreshMatches)));
        assert!(matches!(
            app.update_tab(MenuItem::Bookings),
            Some(SyncRequest::RefreshBookings { status: None })
        ));
        assert!(app.update_tab(MenuItem::Bookings).is_none());

        app.update_tab(MenuItem::Help);
        app.exit_help();
        assert_eq!(app.state.active_tab, MenuItem::Bookings);
    }

    #[test]
    fn review_flow_targets_the_selected_stadium() {
        use crate::state::events::StadiumSnapshot;

        let mut app = App { settings: AppSettings::default(), state: AppState::new("amine") };
        app.start_review();
        assert!(app.state.review.is_none());

        app.state.stadiums.apply(StadiumSnapshot {
            visible: vec![stadium()],
            total: 1,
            filters: StadiumFilters::default(),
            origin: Coordinate::default(),
            using_remote_data: true,
            error: None,
            skipped: Vec::new(),
        });
        app.state.stadiums.detail =
            Some(StadiumDetail { stadium: stadium(), availability: Vec::new(), reviews: Vec::new() });
        app.start_review();
        if let Some(composer) = app.state.review.as_mut() {
            composer.adjust_rating(-1);
            composer.comment.push_str("Nice lights");
        }

        let Some(SyncRequest::AddReview { stadium_id, draft }) = app.submit_review() else {
            panic!("expected a review request");
        };
        assert_eq!(stadium_id, "s1");
        assert_eq!(draft.rating, 4);
        assert!(app.state.review.is_none());

        let review = Review { rating: 4.0, comment: draft.comment, author: None };
        app.on_review_added("s1", review.clone());
        assert_eq!(app.state.stadiums.detail.as_ref().unwrap().reviews, vec![review]);
        assert_eq!(app.state.notice.as_deref(), Some("Review posted"));

        app.on_error("boom".into());
        assert!(matches!(app.dismiss_errors(), SyncRequest::DismissErrors));
        assert_eq!(app.state.last_error, None);
    }
}
