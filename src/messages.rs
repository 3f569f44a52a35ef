//! Request, response, and wire types for the clock.
//!
//! Requests travel from the [`VClock`](crate::VClock) facade to the worker
//! task; each carries the channel its answer comes back on.
//! [`ClockSerialisation`] is the only type that leaves the process.

use smol::channel::Sender;
use vclock_api::{Clock, ClockError, Conditions, HistoryItem};

/// A single operation for the worker task, with its response channel.
pub(crate) enum ClockRequest {
    /// Install an identifier with an initial counter value.
    Set {
        id: String,
        value: u64,
        resp: Sender<Result<(), ClockError>>,
    },
    /// Advance an existing identifier by one.
    Tick {
        id: String,
        resp: Sender<Result<(), ClockError>>,
    },
    /// Combine the clock with another clock's snapshot.
    Merge {
        clock: Clock,
        resp: Sender<Result<(), ClockError>>,
    },
    /// Look up a single identifier in the latest state.
    Get {
        id: String,
        resp: Sender<GetterWithStatus>,
    },
    /// A copy of the latest state, with shortened or recovered keys.
    Snapshot {
        shortened: bool,
        resp: Sender<Result<Clock, ClockError>>,
    },
    /// Copies of every recorded state.
    History {
        resp: Sender<Result<Vec<Clock>, ClockError>>,
    },
    /// Every recorded state together with the event that produced it.
    FullHistory {
        resp: Sender<Result<Vec<HistoryItem>, ClockError>>,
    },
    /// The identifier holding the largest counter.
    LastUpdate {
        resp: Sender<Result<Getter, ClockError>>,
    },
    /// Discard all history other than the latest state.
    Prune {
        resp: Sender<Result<(), ClockError>>,
    },
    /// Relate another clock's snapshot to this clock.
    Compare {
        other: Clock,
        conditions: Conditions,
        resp: Sender<Result<bool, ClockError>>,
    },
}

/// An identifier and its counter value.
pub(crate) struct Getter {
    pub(crate) id: String,
    pub(crate) value: u64,
}

/// A [`Getter`] plus whether the identifier was found at all.
pub(crate) struct GetterWithStatus {
    pub(crate) getter: Getter,
    pub(crate) found: bool,
}

/// The encoded form of a clock produced by
/// [`VClock::bytes`](crate::VClock::bytes).
///
/// Carries the latest state under shortened identifiers, plus the name and
/// serialised reverse table of the shortener that produced them, so any
/// peer with the named shortener registered can recover the original
/// identifiers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct ClockSerialisation {
    pub(crate) shortener: String,
    pub(crate) state: Vec<u8>,
    pub(crate) clock: Clock,
}
