use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDateTime, NaiveTime};
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::{MAX_BOOKINGS_PER_LISTING, MAX_LISTINGS};
use crate::model::*;
use crate::observability::{DECISION_DURATION_SECONDS, DECISIONS_TOTAL, LISTINGS_ACTIVE};

use super::{Engine, EngineError, validate};

/// Partial patch for an amend. Fields that don't apply to the booking's
/// kind are ignored, matching partial-update semantics at the API layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingPatch {
    pub stay: Option<Stay>,
    pub slot: Option<NaiveDateTime>,
    pub guests: Option<u32>,
}

fn record_decision<T>(op: &'static str, started: Instant, result: &Result<T, EngineError>) {
    let outcome = match result {
        Ok(_) => "accepted",
        Err(e) => e.label(),
    };
    metrics::counter!(DECISIONS_TOTAL, "op" => op, "outcome" => outcome).increment(1);
    metrics::histogram!(DECISION_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}

impl Engine {
    // ── Listing registry (attach points for the listing CRUD) ───

    pub async fn list_room(&self, id: Ulid) -> Result<(), EngineError> {
        if self.listings.len() >= MAX_LISTINGS {
            return Err(EngineError::LimitExceeded("too many listings"));
        }
        if self.listings.contains_key(&id) {
            return Err(EngineError::AlreadyListed(id));
        }
        let event = Event::RoomListed { id };
        self.journal_append(&event).await?;
        self.listings
            .insert(id, Arc::new(RwLock::new(ListingState::room(id))));
        metrics::gauge!(LISTINGS_ACTIVE).set(self.listings.len() as f64);
        self.notify.send(id, &event);
        Ok(())
    }

    /// Register an experience with its daily operating hours. Hours where
    /// `start == end` are legal but unbookable.
    pub async fn list_experience(
        &self,
        id: Ulid,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<(), EngineError> {
        if self.listings.len() >= MAX_LISTINGS {
            return Err(EngineError::LimitExceeded("too many listings"));
        }
        if self.listings.contains_key(&id) {
            return Err(EngineError::AlreadyListed(id));
        }
        let event = Event::ExperienceListed { id, start, end };
        self.journal_append(&event).await?;
        self.listings.insert(
            id,
            Arc::new(RwLock::new(ListingState::experience(id, start, end))),
        );
        metrics::gauge!(LISTINGS_ACTIVE).set(self.listings.len() as f64);
        self.notify.send(id, &event);
        Ok(())
    }

    /// Change an experience's hours. Later validations use the new hours;
    /// committed bookings are left alone.
    pub async fn set_experience_hours(
        &self,
        id: Ulid,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<(), EngineError> {
        let ls = self.get_listing(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = ls.write().await;
        if !matches!(guard.listing, Listing::Experience { .. }) {
            return Err(EngineError::NotFound(id));
        }
        let event = Event::HoursChanged { id, start, end };
        self.persist_and_apply(id, &mut guard, &event).await
    }

    /// Remove a listing and every booking attached to it (the CRUD layer
    /// calls this when the room/experience row is deleted).
    pub async fn remove_listing(&self, id: Ulid) -> Result<(), EngineError> {
        let ls = self.get_listing(&id).ok_or(EngineError::NotFound(id))?;
        let guard = ls.write().await;

        let event = Event::ListingRemoved { id };
        self.journal_append(&event).await?;
        for booking in &guard.bookings {
            self.booking_index.remove(&booking.id);
        }
        self.listings.remove(&id);
        metrics::gauge!(LISTINGS_ACTIVE).set(self.listings.len() as f64);
        self.notify.send(id, &event);
        self.notify.remove(&id);
        Ok(())
    }

    // ── Booking lifecycle ────────────────────────────────────────

    /// Create a room booking. Validation and commit run under the room's
    /// write guard, so concurrent overlapping requests serialize and at
    /// most one succeeds.
    pub async fn book_room(
        &self,
        room_id: Ulid,
        user: Ulid,
        stay: Stay,
        guests: u32,
    ) -> Result<Ulid, EngineError> {
        let started = Instant::now();
        let result = self.book_room_inner(room_id, user, stay, guests).await;
        record_decision("book_room", started, &result);
        result
    }

    async fn book_room_inner(
        &self,
        room_id: Ulid,
        user: Ulid,
        stay: Stay,
        guests: u32,
    ) -> Result<Ulid, EngineError> {
        let ls = self
            .get_listing(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let mut guard = ls.write().await;
        if guard.listing != Listing::Room {
            return Err(EngineError::NotFound(room_id));
        }
        if guard.bookings.len() >= MAX_BOOKINGS_PER_LISTING {
            return Err(EngineError::LimitExceeded("too many bookings on listing"));
        }

        validate::room_request(&guard, &stay, guests, self.clock.today(), None)?;

        let booking = Booking {
            id: Ulid::new(),
            user,
            guests,
            terms: Terms::Room { stay },
        };
        let id = booking.id;
        let event = Event::BookingCreated {
            listing_id: room_id,
            booking,
        };
        self.persist_and_apply(room_id, &mut guard, &event).await?;
        tracing::debug!(%room_id, booking = %id, "room booking accepted");
        Ok(id)
    }

    /// Create an experience booking for one time slot.
    pub async fn book_experience(
        &self,
        experience_id: Ulid,
        user: Ulid,
        slot: NaiveDateTime,
        guests: u32,
    ) -> Result<Ulid, EngineError> {
        let started = Instant::now();
        let result = self
            .book_experience_inner(experience_id, user, slot, guests)
            .await;
        record_decision("book_experience", started, &result);
        result
    }

    async fn book_experience_inner(
        &self,
        experience_id: Ulid,
        user: Ulid,
        slot: NaiveDateTime,
        guests: u32,
    ) -> Result<Ulid, EngineError> {
        let ls = self
            .get_listing(&experience_id)
            .ok_or(EngineError::NotFound(experience_id))?;
        let mut guard = ls.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_LISTING {
            return Err(EngineError::LimitExceeded("too many bookings on listing"));
        }

        // Kind check happens inside the validator, which needs the hours.
        validate::experience_request(&guard, slot, guests, self.clock.local_now(), None)?;

        let booking = Booking {
            id: Ulid::new(),
            user,
            guests,
            terms: Terms::Experience { slot },
        };
        let id = booking.id;
        let event = Event::BookingCreated {
            listing_id: experience_id,
            booking,
        };
        self.persist_and_apply(experience_id, &mut guard, &event)
            .await?;
        tracing::debug!(%experience_id, booking = %id, "experience booking accepted");
        Ok(id)
    }

    /// Amend a booking in place: merge the patch onto the stored booking,
    /// re-validate the merged candidate against everything else on the
    /// listing (excluding the booking itself), then commit or leave the
    /// stored row untouched.
    pub async fn amend_booking(
        &self,
        id: Ulid,
        user: Ulid,
        patch: BookingPatch,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = self.amend_booking_inner(id, user, patch).await;
        record_decision("amend_booking", started, &result);
        result
    }

    async fn amend_booking_inner(
        &self,
        id: Ulid,
        user: Ulid,
        patch: BookingPatch,
    ) -> Result<(), EngineError> {
        let (listing_id, mut guard) = self.resolve_booking_write(&id).await?;
        let existing = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if existing.user != user {
            return Err(EngineError::PermissionDenied(id));
        }

        let mut candidate = existing.clone();
        if let Some(guests) = patch.guests {
            candidate.guests = guests;
        }
        match &mut candidate.terms {
            Terms::Room { stay } => {
                if let Some(new_stay) = patch.stay {
                    *stay = new_stay;
                }
            }
            Terms::Experience { slot } => {
                if let Some(new_slot) = patch.slot {
                    *slot = new_slot;
                }
            }
        }

        match candidate.terms {
            Terms::Room { stay } => validate::room_request(
                &guard,
                &stay,
                candidate.guests,
                self.clock.today(),
                Some(id),
            )?,
            Terms::Experience { slot } => validate::experience_request(
                &guard,
                slot,
                candidate.guests,
                self.clock.local_now(),
                Some(id),
            )?,
        }

        let event = Event::BookingAmended {
            listing_id,
            booking: candidate,
        };
        self.persist_and_apply(listing_id, &mut guard, &event).await
    }

    /// Cancel a booking. Owner-only, never re-validated — removing a
    /// reservation cannot violate any exclusivity invariant.
    pub async fn cancel_booking(&self, id: Ulid, user: Ulid) -> Result<(), EngineError> {
        let started = Instant::now();
        let result = self.cancel_booking_inner(id, user).await;
        record_decision("cancel_booking", started, &result);
        result
    }

    async fn cancel_booking_inner(&self, id: Ulid, user: Ulid) -> Result<(), EngineError> {
        let (listing_id, mut guard) = self.resolve_booking_write(&id).await?;
        let existing = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if existing.user != user {
            return Err(EngineError::PermissionDenied(id));
        }
        let event = Event::BookingCancelled { id, listing_id };
        self.persist_and_apply(listing_id, &mut guard, &event).await
    }
}
