use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::availability::{experience_conflict, room_conflict, upcoming};
use super::{Engine, EngineError};

impl Engine {
    /// Public view of a room's not-yet-started bookings, soonest first.
    pub async fn upcoming_room_bookings(
        &self,
        room_id: Ulid,
    ) -> Result<Vec<BookingSummary>, EngineError> {
        let ls = self
            .get_listing(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = ls.read().await;
        if guard.listing != Listing::Room {
            return Err(EngineError::NotFound(room_id));
        }
        Ok(upcoming(&guard, self.clock.local_now())
            .map(BookingSummary::from)
            .collect())
    }

    /// Public view of an experience's future slots, soonest first.
    pub async fn upcoming_experience_bookings(
        &self,
        experience_id: Ulid,
    ) -> Result<Vec<BookingSummary>, EngineError> {
        let ls = self
            .get_listing(&experience_id)
            .ok_or(EngineError::NotFound(experience_id))?;
        let guard = ls.read().await;
        if !matches!(guard.listing, Listing::Experience { .. }) {
            return Err(EngineError::NotFound(experience_id));
        }
        Ok(upcoming(&guard, self.clock.local_now())
            .map(BookingSummary::from)
            .collect())
    }

    /// Private view of one booking — every column, owner-only.
    pub async fn booking_record(
        &self,
        id: Ulid,
        user: Ulid,
    ) -> Result<BookingRecord, EngineError> {
        let listing_id = self
            .listing_of_booking(&id)
            .ok_or(EngineError::NotFound(id))?;
        let ls = self
            .get_listing(&listing_id)
            .ok_or(EngineError::NotFound(listing_id))?;
        let guard = ls.read().await;
        let booking = guard.booking(id).ok_or(EngineError::NotFound(id))?;
        if booking.user != user {
            return Err(EngineError::PermissionDenied(id));
        }
        Ok(BookingRecord::new(listing_id, booking))
    }

    /// Availability probe: would this stay be conflict-free right now?
    /// Display-only — the authoritative check re-runs inside `book_room`.
    pub async fn room_is_free(&self, room_id: Ulid, stay: &Stay) -> Result<bool, EngineError> {
        let ls = self
            .get_listing(&room_id)
            .ok_or(EngineError::NotFound(room_id))?;
        let guard = ls.read().await;
        if guard.listing != Listing::Room {
            return Err(EngineError::NotFound(room_id));
        }
        Ok(room_conflict(&guard, stay, None).is_none())
    }

    /// Availability probe for an experience date.
    pub async fn experience_date_is_free(
        &self,
        experience_id: Ulid,
        date: NaiveDate,
    ) -> Result<bool, EngineError> {
        let ls = self
            .get_listing(&experience_id)
            .ok_or(EngineError::NotFound(experience_id))?;
        let guard = ls.read().await;
        if !matches!(guard.listing, Listing::Experience { .. }) {
            return Err(EngineError::NotFound(experience_id));
        }
        Ok(experience_conflict(&guard, date, None).is_none())
    }

    /// Registry snapshot, mainly for diagnostics.
    pub fn listings(&self) -> Vec<ListingInfo> {
        self.listings
            .iter()
            .map(|entry| {
                let ls = entry.value().clone();
                let guard = ls.try_read().expect("listings: uncontended read");
                ListingInfo {
                    id: guard.id,
                    listing: guard.listing,
                    bookings: guard.bookings.len(),
                }
            })
            .collect()
    }

    // ── Journal maintenance ──────────────────────────────────────

    /// Rewrite the journal down to the events that recreate current state.
    pub async fn compact_journal(&self) -> Result<(), EngineError> {
        let mut events = Vec::new();
        let listing_ids: Vec<Ulid> = self.listings.iter().map(|e| *e.key()).collect();
        for id in listing_ids {
            let Some(ls) = self.get_listing(&id) else {
                continue;
            };
            let guard = ls.read().await;
            match guard.listing {
                Listing::Room => events.push(Event::RoomListed { id: guard.id }),
                Listing::Experience { start, end } => events.push(Event::ExperienceListed {
                    id: guard.id,
                    start,
                    end,
                }),
            }
            for booking in &guard.bookings {
                events.push(Event::BookingCreated {
                    listing_id: guard.id,
                    booking: booking.clone(),
                });
            }
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.journal_tx
            .send(super::JournalCommand::Compact {
                events,
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Journal("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Journal("journal writer dropped response".into()))?
            .map_err(|e| EngineError::Journal(e.to_string()))
    }

    /// Appends since the last compaction — the compactor's trigger signal.
    pub async fn journal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self
            .journal_tx
            .send(super::JournalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
