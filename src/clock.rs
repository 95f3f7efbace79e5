use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Source of "now" for every date/time comparison in the engine.
///
/// The marketplace runs in a single configured local timezone; past-date
/// checks and upcoming-booking filters all go through this trait so tests
/// and replay tooling can pin the instant.
pub trait Clock: Send + Sync {
    /// Current instant in the configured local timezone.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Local calendar date, for date-only comparisons (room stays).
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Local wall-clock timestamp, for full comparisons (experience slots).
    fn local_now(&self) -> NaiveDateTime {
        self.now().naive_local()
    }
}

/// System clock shifted into the configured local offset.
pub struct WallClock {
    offset: FixedOffset,
}

impl WallClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self {
            offset: FixedOffset::east_opt(0).expect("zero offset is valid"),
        }
    }
}

impl Clock for WallClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Clock pinned to a fixed instant.
pub struct FrozenClock {
    at: DateTime<FixedOffset>,
}

impl FrozenClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self { at }
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.at
    }
}
