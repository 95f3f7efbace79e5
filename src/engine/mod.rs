mod availability;
mod error;
mod mutations;
mod queries;
mod validate;

pub use availability::{experience_conflict, room_conflict, upcoming};
pub use error::{EngineError, RejectReason};
pub use mutations::BookingPatch;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};
use ulid::Ulid;

use crate::clock::Clock;
use crate::journal::Journal;
use crate::model::*;
use crate::notify::NotifyHub;

pub type SharedListingState = Arc<RwLock<ListingState>>;

// ── Group-commit journal channel ─────────────────────────

pub(super) enum JournalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the journal and batches appends for group
/// commit: block for the first append, drain whatever else is already
/// queued, fsync once, answer every waiter with the batch outcome.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            JournalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                loop {
                    match rx.try_recv() {
                        Ok(JournalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush what we have, then handle the non-append.
                            flush_and_respond(&mut journal, &mut batch);
                            handle_non_append(&mut journal, other);
                            break;
                        }
                        Err(_) => break, // channel drained — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut journal, &mut batch);
                }
            }
            other => handle_non_append(&mut journal, other),
        }
    }
}

type AppendWaiter = (Event, oneshot::Sender<io::Result<()>>);

fn flush_and_respond(journal: &mut Journal, batch: &mut Vec<AppendWaiter>) {
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_BATCH_SIZE)
        .record(batch.len() as f64);
    let started = std::time::Instant::now();
    let result = flush_batch(journal, batch);
    metrics::histogram!(crate::observability::JOURNAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(journal: &mut Journal, batch: &[AppendWaiter]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = journal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even on append error so partially buffered bytes don't leak
    // into the next batch (these waiters were told the batch failed).
    let flush_err = journal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Compact { events, response } => {
            let result = Journal::write_compacted(journal.path(), &events)
                .and_then(|()| journal.swap_compacted());
            let _ = response.send(result);
        }
        JournalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(journal.appends_since_compact());
        }
        JournalCommand::Append { .. } => unreachable!(),
    }
}

/// The booking engine: sole writer over every listing's committed bookings.
///
/// Each listing lives behind its own `RwLock`; a create/amend holds the
/// write guard across validate + journal append + apply, which serializes
/// conflicting writers on the same listing while leaving other listings
/// fully parallel.
pub struct Engine {
    pub(super) listings: DashMap<Ulid, SharedListingState>,
    pub(super) journal_tx: mpsc::Sender<JournalCommand>,
    pub notify: Arc<NotifyHub>,
    pub(super) clock: Arc<dyn Clock>,
    /// Reverse lookup: booking id → listing id.
    pub(super) booking_index: DashMap<Ulid, Ulid>,
}

/// Apply an event directly to a ListingState (no locking — caller holds the
/// write guard).
fn apply_to_listing(ls: &mut ListingState, event: &Event, index: &DashMap<Ulid, Ulid>) {
    match event {
        Event::HoursChanged { start, end, .. } => {
            ls.listing = Listing::Experience {
                start: *start,
                end: *end,
            };
        }
        Event::BookingCreated { listing_id, booking } => {
            index.insert(booking.id, *listing_id);
            ls.insert_booking(booking.clone());
        }
        Event::BookingAmended { listing_id, booking } => {
            ls.remove_booking(booking.id);
            index.insert(booking.id, *listing_id);
            ls.insert_booking(booking.clone());
        }
        Event::BookingCancelled { id, .. } => {
            ls.remove_booking(*id);
            index.remove(id);
        }
        // Listed/Removed are handled at the registry level, not here.
        Event::RoomListed { .. }
        | Event::ExperienceListed { .. }
        | Event::ListingRemoved { .. } => {}
    }
}

impl Engine {
    /// Replay the journal, rebuild all listing state, and start the
    /// group-commit writer.
    pub fn new(
        journal_path: PathBuf,
        clock: Arc<dyn Clock>,
        notify: Arc<NotifyHub>,
    ) -> io::Result<Self> {
        let events = Journal::replay(&journal_path)?;
        let journal = Journal::open(&journal_path)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let engine = Self {
            listings: DashMap::new(),
            journal_tx,
            notify,
            clock,
            booking_index: DashMap::new(),
        };

        // We are the sole owner of these Arcs during replay, so try_write
        // always succeeds instantly. Never block here — Engine::new may run
        // inside an async context.
        for event in &events {
            match event {
                Event::RoomListed { id } => {
                    engine
                        .listings
                        .insert(*id, Arc::new(RwLock::new(ListingState::room(*id))));
                }
                Event::ExperienceListed { id, start, end } => {
                    engine.listings.insert(
                        *id,
                        Arc::new(RwLock::new(ListingState::experience(*id, *start, *end))),
                    );
                }
                Event::ListingRemoved { id } => {
                    if let Some((_, ls)) = engine.listings.remove(id) {
                        let guard = ls.try_read().expect("replay: uncontended read");
                        for booking in &guard.bookings {
                            engine.booking_index.remove(&booking.id);
                        }
                    }
                }
                other => {
                    if let Some(listing_id) = event_listing_id(other)
                        && let Some(entry) = engine.listings.get(&listing_id)
                    {
                        let ls = entry.value().clone();
                        let mut guard = ls.try_write().expect("replay: uncontended write");
                        apply_to_listing(&mut guard, other, &engine.booking_index);
                    }
                }
            }
        }
        metrics::gauge!(crate::observability::LISTINGS_ACTIVE).set(engine.listings.len() as f64);

        Ok(engine)
    }

    /// Write event to the journal via the background group-commit writer.
    pub(super) async fn journal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::Journal("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::Journal("journal writer dropped response".into()))?
            .map_err(|e| EngineError::Journal(e.to_string()))
    }

    pub fn get_listing(&self, id: &Ulid) -> Option<SharedListingState> {
        self.listings.get(id).map(|e| e.value().clone())
    }

    pub fn listing_of_booking(&self, booking_id: &Ulid) -> Option<Ulid> {
        self.booking_index.get(booking_id).map(|e| *e.value())
    }

    /// Journal-append + apply + notify in one call — the atomic commit of
    /// every mutation. The append happens first; a journal failure leaves
    /// in-memory state untouched.
    pub(super) async fn persist_and_apply(
        &self,
        listing_id: Ulid,
        ls: &mut ListingState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.journal_append(event).await?;
        apply_to_listing(ls, event, &self.booking_index);
        self.notify.send(listing_id, event);
        Ok(())
    }

    /// Resolve a booking to its listing and take the listing's write guard.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &Ulid,
    ) -> Result<(Ulid, tokio::sync::OwnedRwLockWriteGuard<ListingState>), EngineError> {
        let listing_id = self
            .listing_of_booking(booking_id)
            .ok_or(EngineError::NotFound(*booking_id))?;
        let ls = self
            .get_listing(&listing_id)
            .ok_or(EngineError::NotFound(listing_id))?;
        let guard = ls.write_owned().await;
        Ok((listing_id, guard))
    }
}

/// Extract the listing id from a booking-level event.
fn event_listing_id(event: &Event) -> Option<Ulid> {
    match event {
        Event::BookingCreated { listing_id, .. }
        | Event::BookingAmended { listing_id, .. }
        | Event::BookingCancelled { listing_id, .. } => Some(*listing_id),
        Event::HoursChanged { id, .. } => Some(*id),
        Event::RoomListed { .. }
        | Event::ExperienceListed { .. }
        | Event::ListingRemoved { .. } => None,
    }
}
