use ulid::Ulid;

/// Why the validator turned a booking request away. Reason strings are part
/// of the API surface — the CRUD layer forwards them to clients verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Interval starts or ends before the clock's current date/instant.
    PastDate,
    /// Check-out on or before check-in.
    InvalidRange,
    /// Experience slot at or outside the listing's operating hours.
    OutsideHours,
    /// Party of zero.
    NoGuests,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::PastDate => "past date",
            RejectReason::InvalidRange => "invalid range",
            RejectReason::OutsideHours => "invalid time",
            RejectReason::NoGuests => "no guests",
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    AlreadyListed(Ulid),
    PermissionDenied(Ulid),
    Rejected(RejectReason),
    Conflict(Ulid),
    LimitExceeded(&'static str),
    Journal(String),
}

impl EngineError {
    /// Short outcome label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::AlreadyListed(_) => "already_listed",
            EngineError::PermissionDenied(_) => "permission_denied",
            EngineError::Rejected(_) => "rejected",
            EngineError::Conflict(_) => "conflict",
            EngineError::LimitExceeded(_) => "limit_exceeded",
            EngineError::Journal(_) => "journal_error",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyListed(id) => write!(f, "already listed: {id}"),
            EngineError::PermissionDenied(id) => {
                write!(f, "submitter does not own booking: {id}")
            }
            EngineError::Rejected(reason) => write!(f, "rejected: {}", reason.as_str()),
            EngineError::Conflict(id) => write!(f, "conflicts with booking: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Journal(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
