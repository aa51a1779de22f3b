pub mod client;
pub mod tokens;
pub mod wire;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Domain types, normalized once at the API boundary and independent of wire shape
// ---------------------------------------------------------------------------

/// Ids minted on-device carry this prefix; server ids never do.
pub const LOCAL_ID_PREFIX: &str = "local_";

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Parse `"lat,lon"` as used by the environment overrides.
    pub fn parse(s: &str) -> Option<Self> {
        let (lat, lon) = s.split_once(',')?;
        let latitude = lat.trim().parse::<f64>().ok()?;
        let longitude = lon.trim().parse::<f64>().ok()?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self { latitude, longitude })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSize {
    #[serde(rename = "5v5")]
    FiveASide,
    #[default]
    #[serde(rename = "7v7")]
    SevenASide,
    #[serde(rename = "11v11")]
    ElevenASide,
}

impl FieldSize {
    pub const ALL: [FieldSize; 3] = [FieldSize::FiveASide, FieldSize::SevenASide, FieldSize::ElevenASide];

    pub fn label(&self) -> &'static str {
        match self {
            FieldSize::FiveASide => "5v5",
            FieldSize::SevenASide => "7v7",
            FieldSize::ElevenASide => "11v11",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "5v5" => Some(FieldSize::FiveASide),
            "7v7" => Some(FieldSize::SevenASide),
            "11v11" => Some(FieldSize::ElevenASide),
            _ => None,
        }
    }

    /// Players on the pitch for a full game of this size.
    pub fn max_players(&self) -> u32 {
        match self {
            FieldSize::FiveASide => 10,
            FieldSize::SevenASide => 14,
            FieldSize::ElevenASide => 22,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stadium {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinate: Coordinate,
    pub price_per_hour: u32,
    pub field_size: FieldSize,
    pub rating: f64,
    pub amenities: Vec<String>,
    pub image: Option<String>,
    /// Derived: km from the current reference location. Never ground truth.
    #[serde(default)]
    pub distance: f64,
}

/// Denormalized stadium fields carried by bookings and matches for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StadiumRef {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub image: Option<String>,
}

impl From<&Stadium> for StadiumRef {
    fn from(stadium: &Stadium) -> Self {
        Self {
            id: stadium.id.clone(),
            name: stadium.name.clone(),
            address: Some(stadium.address.clone()),
            image: stadium.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "rejected" => Some(BookingStatus::Rejected),
            "cancelled" | "canceled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub stadium: StadiumRef,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_hours: u32,
    pub total_price: u32,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Successful payment moves a pending booking to confirmed.
    /// Returns false when the booking is not awaiting payment.
    pub fn confirm_payment(&mut self) -> bool {
        if self.status != BookingStatus::Pending || self.payment_status == PaymentStatus::Paid {
            return false;
        }
        self.status = BookingStatus::Confirmed;
        self.payment_status = PaymentStatus::Paid;
        true
    }

    /// Any state may be cancelled.
    pub fn cancel(&mut self) {
        self.status = BookingStatus::Cancelled;
    }

    /// The slot finishes after midnight, on the day after `date`.
    pub fn ends_next_day(&self) -> bool {
        self.end_time <= self.start_time && self.end_time != NaiveTime::MIN
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Professional,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 4] = [
        SkillLevel::Beginner,
        SkillLevel::Intermediate,
        SkillLevel::Advanced,
        SkillLevel::Professional,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(SkillLevel::Beginner),
            "intermediate" => Some(SkillLevel::Intermediate),
            "advanced" => Some(SkillLevel::Advanced),
            "professional" => Some(SkillLevel::Professional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
            SkillLevel::Professional => "professional",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Open,
    Full,
    InProgress,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Some(MatchStatus::Open),
            "full" => Some(MatchStatus::Full),
            "in_progress" => Some(MatchStatus::InProgress),
            "completed" => Some(MatchStatus::Completed),
            "cancelled" | "canceled" => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Open => "open",
            MatchStatus::Full => "full",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Player,
    Team,
}

/// Per-player economics of a pickup match.
///
/// Invariant: `current_players + slots_needed == max_players`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlots {
    pub slots_needed: u32,
    pub max_players: u32,
    pub current_players: u32,
    pub price_per_player: u32,
}

impl PlayerSlots {
    /// Slots for a freshly organized match: the organizer fills the first place.
    pub fn opened_by_organizer(field_size: FieldSize, price_per_player: u32) -> Self {
        let max_players = field_size.max_players();
        Self {
            slots_needed: max_players.saturating_sub(1),
            max_players,
            current_players: 1.min(max_players),
            price_per_player,
        }
    }

    pub fn is_full(&self) -> bool {
        self.slots_needed == 0
    }

    /// Take one slot. No-op (false) when the match is already full.
    pub fn join(&mut self) -> bool {
        if self.slots_needed == 0 || self.current_players >= self.max_players {
            return false;
        }
        self.slots_needed -= 1;
        self.current_players += 1;
        true
    }

    /// Free one slot. No-op (false) when nobody is signed up.
    pub fn leave(&mut self) -> bool {
        if self.current_players == 0 || self.slots_needed >= self.max_players {
            return false;
        }
        self.current_players -= 1;
        self.slots_needed += 1;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEntry {
    pub team_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "matchType", rename_all = "lowercase")]
pub enum MatchKind {
    Player(PlayerSlots),
    Team(TeamEntry),
}

impl MatchKind {
    pub fn match_type(&self) -> MatchType {
        match self {
            MatchKind::Player(_) => MatchType::Player,
            MatchKind::Team(_) => MatchType::Team,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub stadium: StadiumRef,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub field_size: FieldSize,
    pub skill_level: SkillLevel,
    pub status: MatchStatus,
    pub organizer_name: Option<String>,
    #[serde(flatten)]
    pub kind: MatchKind,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_local: bool,
}

impl Match {
    pub fn match_type(&self) -> MatchType {
        self.kind.match_type()
    }

    pub fn slots(&self) -> Option<&PlayerSlots> {
        match &self.kind {
            MatchKind::Player(slots) => Some(slots),
            MatchKind::Team(_) => None,
        }
    }

    pub fn slots_mut(&mut self) -> Option<&mut PlayerSlots> {
        match &mut self.kind {
            MatchKind::Player(slots) => Some(slots),
            MatchKind::Team(_) => None,
        }
    }
}

/// A player signed up for a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPlayer {
    pub id: Option<String>,
    pub name: String,
    pub joined_at: Option<DateTime<Utc>>,
}

/// A match with its roster, as served by the match detail endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDetail {
    pub game: Match,
    pub players: Vec<MatchPlayer>,
}

/// Everything the organizer chooses when creating a match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDraft {
    pub stadium: StadiumRef,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub field_size: FieldSize,
    pub skill_level: SkillLevel,
    pub organizer_name: Option<String>,
    pub kind: MatchDraftKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchDraftKind {
    Player { slots_needed: u32, price_per_player: u32 },
    Team { team_name: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchQuery {
    pub skill_level: Option<SkillLevel>,
    pub near: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub stadium: StadiumRef,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_hours: u32,
    pub price_per_hour: u32,
}

/// Why a booking draft cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftError {
    NoDuration,
    PastMidnight,
    PriceOverflow,
    RatingOutOfRange,
}

impl fmt::Display for DraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftError::NoDuration => write!(f, "a booking lasts at least one hour"),
            DraftError::PastMidnight => write!(f, "bookings cannot run past midnight"),
            DraftError::PriceOverflow => write!(f, "booking price is out of range"),
            DraftError::RatingOutOfRange => {
                write!(f, "rating must be between {MIN_RATING} and {MAX_RATING}")
            }
        }
    }
}

impl std::error::Error for DraftError {}

const SECONDS_PER_DAY: u64 = 86_400;

impl BookingDraft {
    /// End of the slot on the booking's own date. A slot may end exactly at
    /// midnight but not later.
    pub fn end_time(&self) -> Result<NaiveTime, DraftError> {
        if self.duration_hours == 0 {
            return Err(DraftError::NoDuration);
        }
        let start = u64::from(self.start_time.num_seconds_from_midnight());
        let end = start + u64::from(self.duration_hours) * 3600;
        if end > SECONDS_PER_DAY {
            return Err(DraftError::PastMidnight);
        }
        Ok(self.start_time + chrono::Duration::hours(i64::from(self.duration_hours)))
    }

    pub fn total_price(&self) -> Result<u32, DraftError> {
        self.price_per_hour
            .checked_mul(self.duration_hours)
            .ok_or(DraftError::PriceOverflow)
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        self.end_time()?;
        self.total_price()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Edahabia,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub time: String,
    pub available: bool,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub rating: f64,
    pub comment: String,
    pub author: Option<String>,
}

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A review the player is about to post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDraft {
    pub rating: u8,
    pub comment: String,
}

impl ReviewDraft {
    pub fn validate(&self) -> Result<(), DraftError> {
        if (MIN_RATING..=MAX_RATING).contains(&self.rating) {
            Ok(())
        } else {
            Err(DraftError::RatingOutOfRange)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub response: String,
}

/// Chat assistant request; location anchors the assistant's suggestions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<SkillLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_size: Option<FieldSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// An entity dropped during normalization, kept for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub id: Option<String>,
    pub reason: String,
}

/// Result of normalizing a list payload: valid entities plus what was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub items: Vec<T>,
    pub skipped: Vec<Skipped>,
}

impl<T> Default for Normalized<T> {
    fn default() -> Self {
        Self { items: Vec::new(), skipped: Vec::new() }
    }
}
