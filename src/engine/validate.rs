use chrono::{NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::limits::{MAX_GUESTS, MAX_STAY_NIGHTS};
use crate::model::{Listing, ListingState, Stay};

use super::availability::{experience_conflict, room_conflict};
use super::error::{EngineError, RejectReason};

// ── Booking validator ─────────────────────────────────────────────
//
// Pure decision logic: request + committed state + clock reading in,
// accept (Ok) or reject (Err) out. No side effects. The check order is
// fixed so rejection reasons are deterministic.

fn party_size(guests: u32) -> Result<(), EngineError> {
    if guests == 0 {
        return Err(EngineError::Rejected(RejectReason::NoGuests));
    }
    if guests > MAX_GUESTS {
        return Err(EngineError::LimitExceeded("too many guests"));
    }
    Ok(())
}

/// Room request: past dates, then range shape, then conflict.
pub(super) fn room_request(
    state: &ListingState,
    stay: &Stay,
    guests: u32,
    today: NaiveDate,
    excluding: Option<Ulid>,
) -> Result<(), EngineError> {
    party_size(guests)?;
    if stay.check_in < today {
        return Err(EngineError::Rejected(RejectReason::PastDate));
    }
    if stay.check_out < today {
        return Err(EngineError::Rejected(RejectReason::PastDate));
    }
    if stay.check_out <= stay.check_in {
        return Err(EngineError::Rejected(RejectReason::InvalidRange));
    }
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    if let Some(taken) = room_conflict(state, stay, excluding) {
        return Err(EngineError::Conflict(taken));
    }
    Ok(())
}

/// Experience request: past instant, then date conflict, then operating
/// hours — strict at both boundaries, so a listing whose hours collapse to a
/// point (`start == end`) accepts nothing.
pub(super) fn experience_request(
    state: &ListingState,
    slot: NaiveDateTime,
    guests: u32,
    now: NaiveDateTime,
    excluding: Option<Ulid>,
) -> Result<(), EngineError> {
    let Listing::Experience { start, end } = state.listing else {
        return Err(EngineError::NotFound(state.id));
    };
    party_size(guests)?;
    if slot < now {
        return Err(EngineError::Rejected(RejectReason::PastDate));
    }
    if let Some(taken) = experience_conflict(state, slot.date(), excluding) {
        return Err(EngineError::Conflict(taken));
    }
    if slot.time() <= start || slot.time() >= end {
        return Err(EngineError::Rejected(RejectReason::OutsideHours));
    }
    Ok(())
}
