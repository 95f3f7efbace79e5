use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Half-open date range `[check_in, check_out)`.
///
/// Constructible with any pair of dates — requests arrive inverted or
/// zero-length and the validator is responsible for rejecting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl Stay {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self { check_in, check_out }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Half-open overlap: back-to-back stays (one checks out the day the
    /// other checks in) do not overlap.
    pub fn overlaps(&self, other: &Stay) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }
}

/// What a booking reserves: a room stay or an experience slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terms {
    Room { stay: Stay },
    Experience { slot: NaiveDateTime },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingKind {
    Room,
    Experience,
}

/// A single committed reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub user: Ulid,
    pub guests: u32,
    pub terms: Terms,
}

impl Booking {
    pub fn kind(&self) -> BookingKind {
        match self.terms {
            Terms::Room { .. } => BookingKind::Room,
            Terms::Experience { .. } => BookingKind::Experience,
        }
    }

    /// Sort key: the instant the reservation begins.
    pub fn start_key(&self) -> NaiveDateTime {
        match self.terms {
            Terms::Room { stay } => stay.check_in.and_time(NaiveTime::MIN),
            Terms::Experience { slot } => slot,
        }
    }
}

/// What kind of listing a booking target is. Experiences carry their daily
/// operating hours; rooms have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Listing {
    Room,
    Experience { start: NaiveTime, end: NaiveTime },
}

impl Listing {
    pub fn kind(&self) -> BookingKind {
        match self {
            Listing::Room => BookingKind::Room,
            Listing::Experience { .. } => BookingKind::Experience,
        }
    }
}

/// Committed booking state of one listing. All bookings of a listing share
/// its kind; the vec stays sorted by `Booking::start_key`.
#[derive(Debug, Clone)]
pub struct ListingState {
    pub id: Ulid,
    pub listing: Listing,
    pub bookings: Vec<Booking>,
}

impl ListingState {
    pub fn room(id: Ulid) -> Self {
        Self {
            id,
            listing: Listing::Room,
            bookings: Vec::new(),
        }
    }

    pub fn experience(id: Ulid, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            id,
            listing: Listing::Experience { start, end },
            bookings: Vec::new(),
        }
    }

    /// Insert preserving sort order by start key.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.start_key(), Booking::start_key)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove_booking(&mut self, id: Ulid) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    pub fn booking(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Bookings whose start key is strictly before `cutoff`, in order.
    /// Everything at or past the cutoff cannot touch an interval that ends
    /// there, so conflict scans skip it.
    pub fn starting_before(&self, cutoff: NaiveDateTime) -> &[Booking] {
        let bound = self.bookings.partition_point(|b| b.start_key() < cutoff);
        &self.bookings[..bound]
    }
}

/// Journal record format — flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomListed {
        id: Ulid,
    },
    ExperienceListed {
        id: Ulid,
        start: NaiveTime,
        end: NaiveTime,
    },
    HoursChanged {
        id: Ulid,
        start: NaiveTime,
        end: NaiveTime,
    },
    ListingRemoved {
        id: Ulid,
    },
    BookingCreated {
        listing_id: Ulid,
        booking: Booking,
    },
    /// Full replacement snapshot of the amended booking.
    BookingAmended {
        listing_id: Ulid,
        booking: Booking,
    },
    BookingCancelled {
        id: Ulid,
        listing_id: Ulid,
    },
}

// ── Collaborator-facing views ────────────────────────────────────

/// Public shape of a booking, shown on a listing's availability page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub id: Ulid,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub experience_time: Option<NaiveDateTime>,
    pub guests: u32,
}

impl From<&Booking> for BookingSummary {
    fn from(b: &Booking) -> Self {
        let (check_in, check_out, experience_time) = match b.terms {
            Terms::Room { stay } => (Some(stay.check_in), Some(stay.check_out), None),
            Terms::Experience { slot } => (None, None, Some(slot)),
        };
        Self {
            id: b.id,
            check_in,
            check_out,
            experience_time,
            guests: b.guests,
        }
    }
}

/// Private shape — every column, shown only to the booking's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingRecord {
    pub id: Ulid,
    pub kind: BookingKind,
    pub listing_id: Ulid,
    pub user: Ulid,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub experience_time: Option<NaiveDateTime>,
    pub guests: u32,
}

impl BookingRecord {
    pub fn new(listing_id: Ulid, b: &Booking) -> Self {
        let (check_in, check_out, experience_time) = match b.terms {
            Terms::Room { stay } => (Some(stay.check_in), Some(stay.check_out), None),
            Terms::Experience { slot } => (None, None, Some(slot)),
        };
        Self {
            id: b.id,
            kind: b.kind(),
            listing_id,
            user: b.user,
            check_in,
            check_out,
            experience_time,
            guests: b.guests,
        }
    }
}

/// Registry row returned by `Engine::listings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingInfo {
    pub id: Ulid,
    pub listing: Listing,
    pub bookings: usize,
}
