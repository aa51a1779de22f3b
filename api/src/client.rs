use crate::tokens::TokenStore;
use crate::wire::{
    RawAuthResponse, RawAvailabilitySlot, RawBooking, RawChatResponse, RawErrorBody, RawMatch,
    RawMatchPlayer, RawPayment, RawReview, RawStadium, RawStadiumRef, RawUser, unwrap_entity,
    unwrap_list,
};
use crate::{
    AvailabilitySlot, Booking, BookingDraft, BookingStatus, ChatReply, ChatRequest, Coordinate,
    FieldSize, Match, MatchDetail, MatchDraft, MatchDraftKind, MatchKind,
    MatchPlayer, MatchQuery, MatchStatus, Normalized, PaymentMethod, PaymentReceipt,
    PaymentStatus, PlayerSlots, Review, ReviewDraft, SkillLevel, Skipped, Stadium, StadiumRef,
    TeamEntry, User, is_local_id,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use log::{debug, warn};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the booking/matchmaking backend.
#[derive(Debug, Clone)]
pub struct PitchsideApi {
    client: Client,
    base_url: String,
    timeout: Duration,
    tokens: Arc<dyn TokenStore>,
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api { status: u16, message: String, url: String },
    Parsing(String, String),
    Unauthorized(String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api { message, .. } => write!(f, "{message}"),
            ApiError::Parsing(detail, url) => write!(f, "Parse error for {url}: {detail}"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl PitchsideApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("pitchside/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            timeout,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // -----------------------------------------------------------------------
    // Stadiums
    // -----------------------------------------------------------------------

    /// Stadiums around `origin`, server-sorted by distance.
    pub async fn fetch_nearby_stadiums(
        &self,
        origin: Coordinate,
        radius_km: f64,
    ) -> ApiResult<Normalized<Stadium>> {
        let query = [
            ("latitude", origin.latitude.to_string()),
            ("longitude", origin.longitude.to_string()),
            ("radius", radius_km.to_string()),
            ("sortBy", "distance".to_owned()),
        ];
        let payload = self.get("/stadiums", &query).await?;
        Ok(normalize_list(unwrap_list(payload, "stadiums"), map_stadium))
    }

    pub async fn fetch_stadium(&self, id: &str) -> ApiResult<Stadium> {
        let path = format!("/stadiums/{id}");
        let payload = self.get(&path, &[]).await?;
        decode_single(payload, "stadium", map_stadium, &path)
    }

    pub async fn fetch_availability(
        &self,
        stadium_id: &str,
        date: NaiveDate,
    ) -> ApiResult<Vec<AvailabilitySlot>> {
        let path = format!("/stadiums/{stadium_id}/availability");
        let payload = self.get(&path, &[("date", date.format("%Y-%m-%d").to_string())]).await?;
        Ok(unwrap_list(payload, "slots")
            .into_iter()
            .filter_map(|v| serde_json::from_value::<RawAvailabilitySlot>(v).ok())
            .filter_map(|raw| {
                Some(AvailabilitySlot {
                    time: raw.time?,
                    available: raw.available.unwrap_or(false),
                    price: raw.price.as_ref().and_then(value_to_u32).unwrap_or_default(),
                })
            })
            .collect())
    }

    pub async fn fetch_reviews(&self, stadium_id: &str) -> ApiResult<Vec<Review>> {
        let path = format!("/stadiums/{stadium_id}/reviews");
        let payload = self.get(&path, &[]).await?;
        Ok(unwrap_list(payload, "reviews")
            .into_iter()
            .filter_map(|v| serde_json::from_value::<RawReview>(v).ok())
            .map(map_review)
            .collect())
    }

    /// Post a review. `None` when the server acknowledged without echoing it.
    pub async fn add_review(&self, stadium_id: &str, review: &ReviewDraft) -> ApiResult<Option<Review>> {
        review.validate().map_err(|e| ApiError::Other(e.to_string()))?;
        let path = format!("/stadiums/{stadium_id}/reviews");
        let body = json!({ "rating": review.rating, "comment": review.comment });
        let payload = self.post(&path, &body).await?;
        let Some(raw) = unwrap_entity(payload, "review") else {
            return Ok(None);
        };
        let raw: RawReview =
            serde_json::from_value(raw).map_err(|e| ApiError::Parsing(e.to_string(), path))?;
        Ok(Some(map_review(raw)))
    }

    // -----------------------------------------------------------------------
    // Bookings
    // -----------------------------------------------------------------------

    pub async fn fetch_bookings(
        &self,
        status: Option<BookingStatus>,
    ) -> ApiResult<Normalized<Booking>> {
        let query: Vec<(&str, String)> =
            status.map(|s| ("status", s.as_str().to_owned())).into_iter().collect();
        let payload = self.get("/bookings", &query).await?;
        Ok(normalize_list(unwrap_list(payload, "bookings"), map_booking))
    }

    pub async fn fetch_booking(&self, id: &str) -> ApiResult<Booking> {
        let path = format!("/bookings/{id}");
        let payload = self.get(&path, &[]).await?;
        decode_single(payload, "booking", map_booking, &path)
    }

    pub async fn create_booking(&self, draft: &BookingDraft) -> ApiResult<Booking> {
        let end_time = draft.end_time().map_err(|e| ApiError::Other(e.to_string()))?;
        let total_price = draft.total_price().map_err(|e| ApiError::Other(e.to_string()))?;
        let body = json!({
            "stadiumId": draft.stadium.id,
            "stadiumName": draft.stadium.name,
            "stadiumImage": draft.stadium.image,
            "date": draft.date.format("%Y-%m-%d").to_string(),
            "startTime": draft.start_time.format("%H:%M").to_string(),
            "endTime": end_time.format("%H:%M").to_string(),
            "duration": draft.duration_hours,
            "totalPrice": total_price,
        });
        let payload = self.post("/bookings", &body).await?;
        decode_single(payload, "booking", map_booking, "/bookings")
    }

    pub async fn cancel_booking(&self, id: &str, reason: &str) -> ApiResult<()> {
        self.post(&format!("/bookings/{id}/cancel"), &json!({ "reason": reason })).await?;
        Ok(())
    }

    pub async fn process_payment(
        &self,
        id: &str,
        method: PaymentMethod,
        card_token: Option<&str>,
    ) -> ApiResult<PaymentReceipt> {
        let mut body = json!({ "paymentMethod": method });
        if let Some(token) = card_token {
            body["cardToken"] = json!(token);
        }
        let path = format!("/bookings/{id}/payment");
        let payload = self.post(&path, &body).await?;
        // An empty 2xx body is a receipt without a reference.
        if payload.is_null() {
            return Ok(PaymentReceipt { transaction_id: None });
        }
        let raw: RawPayment =
            serde_json::from_value(payload).map_err(|e| ApiError::Parsing(e.to_string(), path))?;
        Ok(PaymentReceipt { transaction_id: raw.transaction_id })
    }

    // -----------------------------------------------------------------------
    // Matches
    // -----------------------------------------------------------------------

    pub async fn fetch_matches(&self, query: &MatchQuery) -> ApiResult<Normalized<Match>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(level) = query.skill_level {
            params.push(("skillLevel", level.as_str().to_owned()));
        }
        if let Some(near) = query.near {
            params.push(("latitude", near.latitude.to_string()));
            params.push(("longitude", near.longitude.to_string()));
        }
        let payload = self.get("/matches", &params).await?;
        Ok(normalize_list(unwrap_list(payload, "matches"), map_match))
    }

    pub async fn create_match(&self, draft: &MatchDraft) -> ApiResult<Match> {
        let payload = self.post("/matches", &match_draft_body(draft)).await?;
        decode_single(payload, "match", map_match, "/matches")
    }

    /// A match plus its roster when the server sends one alongside.
    pub async fn fetch_match(&self, id: &str) -> ApiResult<MatchDetail> {
        let path = format!("/matches/{id}");
        let mut payload = self.get(&path, &[]).await?;
        let players = payload
            .as_object_mut()
            .and_then(|map| map.remove("players"))
            .map(map_players)
            .unwrap_or_default();
        let game = decode_single(payload, "match", map_match, &path)?;
        Ok(MatchDetail { game, players })
    }

    pub async fn fetch_match_players(&self, id: &str) -> ApiResult<Vec<MatchPlayer>> {
        let payload = self.get(&format!("/matches/{id}/players"), &[]).await?;
        Ok(map_players(Value::Array(unwrap_list(payload, "players"))))
    }

    /// Join a match. `None` means the server acknowledged without echoing the match.
    pub async fn join_match(&self, id: &str, player_name: Option<&str>) -> ApiResult<Option<Match>> {
        let body = match player_name {
            Some(name) => json!({ "playerName": name }),
            None => json!({}),
        };
        let path = format!("/matches/{id}/join");
        let payload = self.post(&path, &body).await?;
        decode_optional(payload, "match", map_match, &path)
    }

    pub async fn leave_match(&self, id: &str) -> ApiResult<Option<Match>> {
        let path = format!("/matches/{id}/leave");
        let payload = self.post(&path, &json!({})).await?;
        decode_optional(payload, "match", map_match, &path)
    }

    // -----------------------------------------------------------------------
    // Chat assistant
    // -----------------------------------------------------------------------

    pub async fn send_chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::Other(format!("could not encode chat request: {e}")))?;
        let payload = self.post("/chat", &body).await?;
        let raw: RawChatResponse = serde_json::from_value(payload)
            .map_err(|e| ApiError::Parsing(e.to_string(), "/chat".to_owned()))?;
        Ok(ChatReply { response: raw.response.unwrap_or_default() })
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let payload = self
            .post("/auth/login", &json!({ "email": email, "password": password }))
            .await?;
        self.accept_session(payload, "/auth/login")
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let payload = self
            .post(
                "/auth/signup",
                &json!({ "name": name, "email": email, "password": password }),
            )
            .await?;
        self.accept_session(payload, "/auth/signup")
    }

    /// Tokens are dropped locally even when the server call fails.
    pub async fn logout(&self, user_id: Option<&str>) -> ApiResult<()> {
        let result = self.post("/auth/logout", &json!({ "userId": user_id })).await;
        self.tokens.clear_tokens();
        result.map(|_| ())
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        let payload = self.get("/auth/me", &[]).await?;
        let raw = unwrap_entity(payload, "user")
            .ok_or_else(|| ApiError::NotFound("no user in /auth/me response".into()))?;
        let raw: RawUser = serde_json::from_value(raw)
            .map_err(|e| ApiError::Parsing(e.to_string(), "/auth/me".to_owned()))?;
        map_user(raw).ok_or_else(|| ApiError::Parsing("user without id".into(), "/auth/me".into()))
    }

    fn accept_session(&self, payload: Value, path: &str) -> ApiResult<User> {
        let raw: RawAuthResponse = serde_json::from_value(payload)
            .map_err(|e| ApiError::Parsing(e.to_string(), path.to_owned()))?;
        if let Some(access) = raw.access_token.as_deref() {
            self.tokens.set_tokens(access, raw.refresh_token.as_deref());
        }
        raw.user
            .and_then(map_user)
            .ok_or_else(|| ApiError::Parsing("session without user".into(), path.to_owned()))
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> ApiResult<Value> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// Send with the stored bearer token. A 401 triggers exactly one
    /// token refresh and retry; the retry's outcome is final.
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let url = self.url(path, query)?;
        debug!("{method} {url}");
        let response = self.send(method.clone(), url.clone(), body).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.refresh_tokens().await {
            debug!("retrying {url} after token refresh");
            let retried = self.send(method, url.clone(), body).await?;
            return read_body(retried, url.as_str()).await;
        }

        read_body(response, url.as_str()).await
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> ApiResult<reqwest::Response> {
        let url_str = url.to_string();
        let mut builder = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .header("Accept", "application/json");
        if let Some(token) = self.tokens.access_token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(|e| ApiError::Network(e, url_str))
    }

    async fn refresh_tokens(&self) -> bool {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            return false;
        };
        let Ok(url) = self.url("/auth/refresh-token", &[]) else {
            return false;
        };

        let response = match self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&json!({ "refreshToken": refresh_token }))
            .send()
            .await
        {
            Ok(res) if res.status().is_success() => res,
            Ok(res) => {
                debug!("token refresh rejected with {}", res.status());
                return false;
            }
            Err(e) => {
                warn!("token refresh failed: {e}");
                return false;
            }
        };

        match response.json::<RawAuthResponse>().await {
            Ok(RawAuthResponse { access_token: Some(access), refresh_token, .. }) => {
                self.tokens.set_tokens(&access, refresh_token.as_deref());
                true
            }
            _ => false,
        }
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Url> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut url =
            Url::parse(&raw).map_err(|e| ApiError::Other(format!("invalid url {raw}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

async fn read_body(response: reqwest::Response, url: &str) -> ApiResult<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e, url.to_owned()))?;

    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&text).map_err(|e| ApiError::Parsing(e.to_string(), url.to_owned()));
    }

    let message = server_message(&text).unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));
    match status {
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized(message)),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
        _ => Err(ApiError::Api { status: status.as_u16(), message, url: url.to_owned() }),
    }
}

fn server_message(body: &str) -> Option<String> {
    let raw: RawErrorBody = serde_json::from_str(body).ok()?;
    raw.message
        .or_else(|| raw.error.and_then(|e| e.message))
        .filter(|m| !m.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Mapping: wire types → normalized domain types
// ---------------------------------------------------------------------------

/// Decode every element independently so one malformed entity cannot sink
/// the whole list.
pub fn normalize_list<R, T>(values: Vec<Value>, map: fn(R) -> Result<T, Skipped>) -> Normalized<T>
where
    R: DeserializeOwned,
{
    let mut out = Normalized::default();
    for value in values {
        match decode_entity(value, map) {
            Ok(item) => out.items.push(item),
            Err(skipped) => out.skipped.push(skipped),
        }
    }
    out
}

fn decode_entity<R, T>(value: Value, map: fn(R) -> Result<T, Skipped>) -> Result<T, Skipped>
where
    R: DeserializeOwned,
{
    let id_hint = value.get("id").or_else(|| value.get("_id")).and_then(value_to_string);
    let raw: R = serde_json::from_value(value).map_err(|e| Skipped {
        id: id_hint,
        reason: format!("malformed payload: {e}"),
    })?;
    map(raw)
}

fn decode_single<R, T>(
    payload: Value,
    key: &str,
    map: fn(R) -> Result<T, Skipped>,
    path: &str,
) -> ApiResult<T>
where
    R: DeserializeOwned,
{
    decode_optional(payload, key, map, path)?
        .ok_or_else(|| ApiError::Parsing(format!("response carried no {key}"), path.to_owned()))
}

fn decode_optional<R, T>(
    payload: Value,
    key: &str,
    map: fn(R) -> Result<T, Skipped>,
    path: &str,
) -> ApiResult<Option<T>>
where
    R: DeserializeOwned,
{
    let Some(raw) = unwrap_entity(payload, key) else {
        return Ok(None);
    };
    decode_entity(raw, map)
        .map(Some)
        .map_err(|skipped| ApiError::Parsing(skipped.reason, path.to_owned()))
}

fn skipped(id: Option<&str>, reason: impl Into<String>) -> Skipped {
    Skipped { id: id.map(str::to_owned), reason: reason.into() }
}

pub fn map_stadium(raw: RawStadium) -> Result<Stadium, Skipped> {
    let id = raw
        .id
        .as_ref()
        .and_then(value_to_string)
        .ok_or_else(|| skipped(None, "missing id"))?;
    let latitude = raw.latitude.as_ref().and_then(value_to_f64);
    let longitude = raw.longitude.as_ref().and_then(value_to_f64);
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(skipped(Some(&id), "missing coordinates"));
    };

    Ok(Stadium {
        name: raw.name.unwrap_or_default(),
        address: raw.address.unwrap_or_default(),
        coordinate: Coordinate { latitude, longitude },
        price_per_hour: raw.price_per_hour.as_ref().and_then(value_to_u32).unwrap_or_default(),
        field_size: raw.field_size.as_deref().and_then(FieldSize::parse).unwrap_or_default(),
        rating: raw
            .rating
            .as_ref()
            .and_then(value_to_f64)
            .map(|r| r.clamp(0.0, 5.0))
            .unwrap_or_default(),
        amenities: raw.amenities,
        image: raw.image.filter(|s| !s.trim().is_empty()),
        distance: 0.0,
        id,
    })
}

/// Nested `stadium` object first, flat `stadiumName`-style fields second.
fn map_stadium_ref(
    nested: Option<RawStadiumRef>,
    id: Option<&Value>,
    name: Option<String>,
    address: Option<String>,
    image: Option<String>,
) -> StadiumRef {
    let nested = nested.unwrap_or_default();
    StadiumRef {
        id: nested
            .id
            .as_ref()
            .and_then(value_to_string)
            .or_else(|| id.and_then(value_to_string))
            .unwrap_or_default(),
        name: nested.name.or(name).unwrap_or_default(),
        address: nested.address.or(address),
        image: nested.image.or(image).filter(|s| !s.trim().is_empty()),
    }
}

pub fn map_match(raw: RawMatch) -> Result<Match, Skipped> {
    let id = raw
        .id
        .as_ref()
        .and_then(value_to_string)
        .ok_or_else(|| skipped(None, "missing id"))?;
    let date = raw
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| skipped(Some(&id), "missing or invalid date"))?;
    let time = raw
        .time
        .as_deref()
        .and_then(parse_time)
        .ok_or_else(|| skipped(Some(&id), "missing or invalid time"))?;
    let field_size = raw.field_size.as_deref().and_then(FieldSize::parse).unwrap_or_default();

    let kind = if raw.match_type.as_deref() == Some("team") {
        MatchKind::Team(TeamEntry { team_name: raw.team_name.unwrap_or_default() })
    } else {
        MatchKind::Player(reconcile_slots(
            field_size,
            raw.max_players.as_ref().and_then(value_to_u32),
            raw.current_players.as_ref().and_then(value_to_u32),
            raw.slots_needed.as_ref().and_then(value_to_u32),
            raw.price_per_player.as_ref().and_then(value_to_u32).unwrap_or_default(),
        ))
    };

    Ok(Match {
        stadium: map_stadium_ref(
            raw.stadium,
            raw.stadium_id.as_ref(),
            raw.stadium_name,
            raw.stadium_address,
            raw.stadium_image,
        ),
        date,
        time,
        field_size,
        skill_level: raw.skill_level.as_deref().and_then(SkillLevel::parse).unwrap_or_default(),
        status: raw.status.as_deref().and_then(MatchStatus::parse).unwrap_or_default(),
        organizer_name: raw.organizer_name.or(raw.organizer).filter(|s| !s.trim().is_empty()),
        kind,
        created_at: raw.created_at.as_deref().and_then(parse_timestamp),
        is_local: is_local_id(&id),
        id,
    })
}

/// Rebuild slot counts so `current + needed == max` holds. When the server
/// sends both counts and they disagree, `currentPlayers` wins.
fn reconcile_slots(
    field_size: FieldSize,
    max_players: Option<u32>,
    current_players: Option<u32>,
    slots_needed: Option<u32>,
    price_per_player: u32,
) -> PlayerSlots {
    let max_players = max_players.filter(|m| *m > 0).unwrap_or_else(|| field_size.max_players());
    let current_players = match (current_players, slots_needed) {
        (Some(current), _) => current.min(max_players),
        (None, Some(needed)) => max_players - needed.min(max_players),
        (None, None) => 0,
    };
    PlayerSlots {
        slots_needed: max_players - current_players,
        max_players,
        current_players,
        price_per_player,
    }
}

pub fn map_booking(raw: RawBooking) -> Result<Booking, Skipped> {
    let id = raw
        .id
        .as_ref()
        .and_then(value_to_string)
        .ok_or_else(|| skipped(None, "missing id"))?;
    let date = raw
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| skipped(Some(&id), "missing or invalid date"))?;
    let start_time = raw
        .start_time
        .as_deref()
        .and_then(parse_time)
        .ok_or_else(|| skipped(Some(&id), "missing or invalid start time"))?;

    let end_time = raw.end_time.as_deref().and_then(parse_time);
    let duration_hours = raw
        .duration
        .as_ref()
        .and_then(value_to_u32)
        .or_else(|| {
            // An end at or before the start is on the following day.
            let mut span = end_time? - start_time;
            if span <= chrono::Duration::zero() {
                span += chrono::Duration::days(1);
            }
            u32::try_from(span.num_hours()).ok()
        })
        .filter(|h| *h > 0)
        .unwrap_or(1);
    let end_time = end_time
        .unwrap_or_else(|| start_time + chrono::Duration::hours(i64::from(duration_hours)));

    Ok(Booking {
        stadium: map_stadium_ref(
            raw.stadium,
            raw.stadium_id.as_ref(),
            raw.stadium_name,
            None,
            raw.stadium_image,
        ),
        date,
        start_time,
        end_time,
        duration_hours,
        total_price: raw.total_price.as_ref().and_then(value_to_u32).unwrap_or_default(),
        status: raw.status.as_deref().and_then(BookingStatus::parse).unwrap_or_default(),
        payment_status: match raw.payment_status.as_deref() {
            Some("paid") => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        },
        created_at: raw.created_at.as_deref().and_then(parse_timestamp),
        id,
    })
}

fn map_review(raw: RawReview) -> Review {
    Review {
        rating: raw.rating.as_ref().and_then(value_to_f64).unwrap_or_default(),
        comment: raw.comment.unwrap_or_default(),
        author: raw.author,
    }
}

/// Roster entries may be objects or bare names. Entries with neither a name
/// nor an id are dropped.
fn map_players(payload: Value) -> Vec<MatchPlayer> {
    let Value::Array(entries) = payload else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(name) if !name.trim().is_empty() => {
                Some(MatchPlayer { id: None, name, joined_at: None })
            }
            other => {
                let raw: RawMatchPlayer = serde_json::from_value(other).ok()?;
                let id = raw.id.as_ref().and_then(value_to_string);
                let name = raw.name.filter(|n| !n.trim().is_empty()).or_else(|| id.clone())?;
                Some(MatchPlayer {
                    id,
                    name,
                    joined_at: raw.joined_at.as_deref().and_then(parse_timestamp),
                })
            }
        })
        .collect()
}

fn map_user(raw: RawUser) -> Option<User> {
    Some(User {
        id: raw.id.as_ref().and_then(value_to_string)?,
        email: raw.email,
        name: raw.name,
    })
}

fn match_draft_body(draft: &MatchDraft) -> Value {
    let mut body = json!({
        "stadiumId": draft.stadium.id,
        "stadiumName": draft.stadium.name,
        "stadiumAddress": draft.stadium.address,
        "stadiumImage": draft.stadium.image,
        "date": draft.date.format("%Y-%m-%d").to_string(),
        "time": draft.time.format("%H:%M").to_string(),
        "fieldSize": draft.field_size,
        "skillLevel": draft.skill_level,
        "organizerName": draft.organizer_name,
    });
    match &draft.kind {
        MatchDraftKind::Player { slots_needed, price_per_player } => {
            body["matchType"] = json!("player");
            body["slotsNeeded"] = json!(slots_needed);
            body["pricePerPlayer"] = json!(price_per_player);
        }
        MatchDraftKind::Team { team_name } => {
            body["matchType"] = json!("team");
            body["teamName"] = json!(team_name);
        }
    }
    body
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn value_to_u32(value: &Value) -> Option<u32> {
    let v = value_to_f64(value)?;
    if v < 0.0 || v > f64::from(u32::MAX) {
        return None;
    }
    Some(v.round() as u32)
}

/// Accepts plain ISO dates and full timestamps.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
