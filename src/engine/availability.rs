use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ulid::Ulid;

use crate::model::{Booking, ListingState, Stay, Terms};

// ── Availability store ────────────────────────────────────────────
//
// Read path over one listing's committed bookings. These queries are the
// single source of truth the validator consults; they never mutate.

/// Id of any other room booking whose stay overlaps `stay` under the
/// half-open test (`a.check_in < b.check_out && a.check_out > b.check_in`).
/// `excluding` lets an amend-in-place skip the booking being amended.
pub fn room_conflict(state: &ListingState, stay: &Stay, excluding: Option<Ulid>) -> Option<Ulid> {
    // Bookings starting at or after check-out can't overlap a half-open stay.
    let cutoff = stay.check_out.and_time(NaiveTime::MIN);
    state
        .starting_before(cutoff)
        .iter()
        .find(|b| {
            excluding != Some(b.id)
                && match b.terms {
                    Terms::Room { stay: booked } => booked.overlaps(stay),
                    Terms::Experience { .. } => false,
                }
        })
        .map(|b| b.id)
}

/// Id of any other experience booking on the same calendar date. One booking
/// per experience per day, whatever the times of day.
pub fn experience_conflict(
    state: &ListingState,
    date: NaiveDate,
    excluding: Option<Ulid>,
) -> Option<Ulid> {
    let candidates = match date.succ_opt() {
        Some(next) => state.starting_before(next.and_time(NaiveTime::MIN)),
        None => state.bookings.as_slice(),
    };
    candidates
        .iter()
        .find(|b| {
            excluding != Some(b.id)
                && match b.terms {
                    Terms::Experience { slot } => slot.date() == date,
                    Terms::Room { .. } => false,
                }
        })
        .map(|b| b.id)
}

/// The "active" bookings shown on a listing page: room stays checking in
/// strictly after today, experience slots strictly after now.
pub fn upcoming(state: &ListingState, now: NaiveDateTime) -> impl Iterator<Item = &Booking> {
    let today = now.date();
    state.bookings.iter().filter(move |b| match b.terms {
        Terms::Room { stay } => stay.check_in > today,
        Terms::Experience { slot } => slot > now,
    })
}
