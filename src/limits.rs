//! Request sanity limits. These bound resource usage, not business rules.

/// Max listings one engine will track.
pub const MAX_LISTINGS: usize = 100_000;

/// Max committed bookings per listing.
pub const MAX_BOOKINGS_PER_LISTING: usize = 10_000;

/// Max party size for a single booking.
pub const MAX_GUESTS: u32 = 100;

/// Max nights for a single room stay.
pub const MAX_STAY_NIGHTS: i64 = 365;
