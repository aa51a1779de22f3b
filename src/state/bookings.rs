use crate::state::collection::{insert_front_unique, merge_local_first, new_local_id, replace_by_id};
use crate::state::events::{BookingSnapshot, EventSink, StoreEvent};
use crate::state::local_store::LocalEntities;
use crate::state::remote::BookingSource;
use chrono::Utc;
use log::{debug, info, warn};
use pitchside_api::client::{ApiError, ApiResult};
use pitchside_api::{
    Booking, BookingDraft, BookingStatus, DraftError, PaymentMethod, PaymentReceipt,
    PaymentStatus, is_local_id,
};
use std::sync::Arc;

/// The player's bookings: server bookings plus bookings created while the
/// server was unreachable.
pub struct BookingStore {
    source: Arc<dyn BookingSource>,
    persisted: LocalEntities<Booking>,
    events: EventSink,
    local: Vec<Booking>,
    bookings: Vec<Booking>,
    error: Option<String>,
}

impl BookingStore {
    pub fn new(source: Arc<dyn BookingSource>, persisted: LocalEntities<Booking>, events: EventSink) -> Self {
        Self {
            source,
            persisted,
            events,
            local: Vec::new(),
            bookings: Vec::new(),
            error: None,
        }
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.publish();
        }
    }

    pub fn find(&self, id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub async fn refresh(&mut self, status: Option<BookingStatus>) -> &[Booking] {
        if self.local.is_empty() {
            self.local = self.persisted.load().await;
        }
        self.error = None;

        let remote = match self.source.bookings(status).await {
            Ok(normalized) => {
                for skipped in &normalized.skipped {
                    warn!("skipped booking {:?}: {}", skipped.id, skipped.reason);
                }
                normalized.items
            }
            Err(e) => {
                warn!("booking fetch failed: {e}");
                self.error = Some(e.to_string());
                Vec::new()
            }
        };

        let local: Vec<Booking> = self
            .local
            .iter()
            .filter(|b| status.is_none_or(|s| b.status == s))
            .cloned()
            .collect();
        self.bookings = merge_local_first(&local, remote);
        debug!("{} bookings after merge", self.bookings.len());
        self.publish();
        &self.bookings
    }

    /// Book on the server, or keep an offline booking awaiting confirmation.
    /// Drafts that cannot be booked at all are refused before either.
    pub async fn create(&mut self, draft: BookingDraft) -> Result<Booking, DraftError> {
        self.error = None;
        if let Err(e) = draft.validate() {
            warn!("refusing booking at {}: {e}", draft.stadium.name);
            self.error = Some(e.to_string());
            self.publish();
            return Err(e);
        }

        match self.source.create_booking(&draft).await {
            Ok(created) => {
                insert_front_unique(&mut self.bookings, created.clone());
                self.publish();
                Ok(created)
            }
            Err(e) => {
                warn!("booking create failed, keeping it on this device: {e}");
                let offline = offline_booking(&draft, new_local_id())?;
                info!("created offline booking {}", offline.id);

                self.local.insert(0, offline.clone());
                self.persisted.save(&self.local).await;
                insert_front_unique(&mut self.bookings, offline.clone());
                self.publish();
                Ok(offline)
            }
        }
    }

    /// Offline bookings are cancelled on this device only. Server bookings
    /// change only once the server accepts the cancellation.
    pub async fn cancel(&mut self, id: &str, reason: &str) -> bool {
        self.error = None;
        if self.find(id).is_none() {
            self.error = Some(format!("Unknown booking {id}"));
            self.publish();
            return false;
        }

        if !is_local_id(id)
            && let Err(e) = self.source.cancel_booking(id, reason).await
        {
            warn!("cancel {id} failed: {e}");
            self.error = Some(e.to_string());
            self.publish();
            return false;
        }

        if let Some(booking) = self.bookings.iter_mut().find(|b| b.id == id) {
            booking.cancel();
        }
        if let Some(booking) = self.local.iter_mut().find(|b| b.id == id) {
            booking.cancel();
            self.persisted.save(&self.local).await;
        }
        self.publish();
        true
    }

    /// Pay a pending server booking. Never applied before the server confirms.
    pub async fn pay(&mut self, id: &str, method: PaymentMethod) -> ApiResult<PaymentReceipt> {
        self.error = None;
        let result = self.try_pay(id, method).await;
        if let Err(e) = &result {
            warn!("payment for {id} failed: {e}");
            self.error = Some(e.to_string());
        }
        self.publish();
        result
    }

    async fn try_pay(&mut self, id: &str, method: PaymentMethod) -> ApiResult<PaymentReceipt> {
        let held = self
            .find(id)
            .ok_or_else(|| ApiError::NotFound(format!("booking {id}")))?;
        if is_local_id(id) {
            return Err(ApiError::Other(
                "this booking has not reached the server yet and cannot be paid".into(),
            ));
        }
        if held.status != BookingStatus::Pending || held.payment_status == PaymentStatus::Paid {
            return Err(ApiError::Other("this booking is not awaiting payment".into()));
        }

        let receipt = self.source.pay_booking(id, method).await?;
        if let Some(booking) = self.bookings.iter_mut().find(|b| b.id == id) {
            booking.confirm_payment();
        }
        Ok(receipt)
    }

    /// Server copy first, the held copy when the server cannot answer.
    pub async fn details(&mut self, id: &str) -> Option<Booking> {
        if is_local_id(id) {
            return self.find(id).cloned();
        }
        match self.source.booking(id).await {
            Ok(fresh) => {
                if replace_by_id(&mut self.bookings, fresh.clone()) {
                    self.publish();
                }
                Some(fresh)
            }
            Err(e) => {
                warn!("booking {id} details failed: {e}");
                self.find(id).cloned()
            }
        }
    }

    fn publish(&self) {
        self.events.publish(StoreEvent::Bookings(self.snapshot()));
    }

    pub fn snapshot(&self) -> BookingSnapshot {
        BookingSnapshot { bookings: self.bookings.clone(), error: self.error.clone() }
    }
}

fn offline_booking(draft: &BookingDraft, id: String) -> Result<Booking, DraftError> {
    Ok(Booking {
        id,
        stadium: draft.stadium.clone(),
        date: draft.date,
        start_time: draft.start_time,
        end_time: draft.end_time()?,
        duration_hours: draft.duration_hours,
        total_price: draft.total_price()?,
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Pending,
        created_at: Some(Utc::now()),
    })
}
