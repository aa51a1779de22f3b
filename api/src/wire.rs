//! Raw wire types: serde shapes for the backend's JSON payloads.
//! The backend is loose about field names and number encodings, so numbers and
//! ids stay as `Value` here and are coerced by the mapping layer in client.rs.
use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Stadiums
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawStadium {
    #[serde(alias = "_id")]
    pub id: Option<Value>,
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(alias = "lat")]
    pub latitude: Option<Value>,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: Option<Value>,
    #[serde(alias = "price")]
    pub price_per_hour: Option<Value>,
    pub field_size: Option<String>,
    pub rating: Option<Value>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(alias = "imageUrl")]
    pub image: Option<String>,
}

/// Nested stadium object some match/booking payloads embed instead of
/// flat `stadiumName`/`stadiumImage` fields.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawStadiumRef {
    #[serde(alias = "_id")]
    pub id: Option<Value>,
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawAvailabilitySlot {
    pub time: Option<String>,
    pub available: Option<bool>,
    pub price: Option<Value>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawReview {
    pub rating: Option<Value>,
    pub comment: Option<String>,
    #[serde(alias = "userName")]
    pub author: Option<String>,
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawBooking {
    #[serde(alias = "_id")]
    pub id: Option<Value>,
    pub stadium_id: Option<Value>,
    pub stadium_name: Option<String>,
    pub stadium_image: Option<String>,
    pub stadium: Option<RawStadiumRef>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<Value>,
    pub total_price: Option<Value>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawPayment {
    pub transaction_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    #[serde(alias = "_id")]
    pub id: Option<Value>,
    pub stadium_id: Option<Value>,
    pub stadium_name: Option<String>,
    pub stadium_address: Option<String>,
    pub stadium_image: Option<String>,
    pub stadium: Option<RawStadiumRef>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub field_size: Option<String>,
    pub skill_level: Option<String>,
    pub match_type: Option<String>,
    pub slots_needed: Option<Value>,
    pub max_players: Option<Value>,
    pub current_players: Option<Value>,
    pub price_per_player: Option<Value>,
    pub team_name: Option<String>,
    pub organizer_name: Option<String>,
    /// Older payloads send the organizer under this name.
    pub organizer: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

/// Roster entry. Some payloads list bare names instead of objects; those
/// are handled in the mapping layer.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawMatchPlayer {
    #[serde(alias = "_id", alias = "userId")]
    pub id: Option<Value>,
    #[serde(alias = "playerName", alias = "username")]
    pub name: Option<String>,
    pub joined_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Auth / chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawAuthResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<RawUser>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawUser {
    #[serde(alias = "_id")]
    pub id: Option<Value>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawChatResponse {
    #[serde(alias = "message", alias = "reply")]
    pub response: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawErrorBody {
    pub message: Option<String>,
    pub error: Option<RawErrorDetail>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RawErrorDetail {
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Pull the list out of a `[...]`, `{<key>: [...]}` or `{data: [...]}` payload.
/// Anything else yields an empty list.
pub fn unwrap_list(payload: Value, key: &str) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key).or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Pull a single entity out of a bare object or a `{<key>: {...}}` /
/// `{data: {...}}` envelope. `None` when the payload carries no entity
/// (ack-only responses such as `{success: true}`).
pub fn unwrap_entity(payload: Value, key: &str) -> Option<Value> {
    let Value::Object(mut map) = payload else {
        return None;
    };
    if let Some(inner @ Value::Object(_)) = map.remove(key) {
        return Some(inner);
    }
    if let Some(inner @ Value::Object(_)) = map.remove("data") {
        return Some(inner);
    }
    if map.contains_key("id") || map.contains_key("_id") {
        return Some(Value::Object(map));
    }
    None
}
