//! Booking conflict/availability engine for a vacation-rental marketplace.
//!
//! The engine owns the committed booking state of every listing (rooms booked
//! by date range, experiences booked by time slot) and is the only writer.
//! The CRUD/HTTP layer calls into [`engine::Engine`] to create, amend, and
//! cancel bookings; every accepted write is journaled before it becomes
//! visible to readers.

pub mod clock;
pub mod engine;
pub mod journal;
pub mod limits;
pub mod maintenance;
pub mod model;
pub mod notify;
pub mod observability;
