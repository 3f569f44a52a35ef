use crate::{Clock, ClockError};
use std::collections::hash_map::Entry;

/// A single update to a vector clock.
///
/// Events are what the clock's history records: every state the clock has
/// ever been in is the result of applying a sequence of events to the
/// initial map. Exactly one payload is carried per event.
///
/// ## Example
///
/// ```
/// use vclock_api::{Clock, Event};
///
/// let mut clock = Clock::new();
/// let identity = |id: &str| id.to_owned();
///
/// Event::Set { id: "a".to_owned(), value: 3 }.apply(&mut clock, identity).unwrap();
/// Event::Tick { id: "a".to_owned() }.apply(&mut clock, identity).unwrap();
///
/// assert_eq!(clock.get("a"), Some(&4));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    /// Install a previously-absent identifier with an initial counter.
    Set {
        /// The identifier to install.
        id: String,
        /// The initial counter value.
        value: u64,
    },
    /// Increment the counter of an existing identifier by one.
    Tick {
        /// The identifier to advance.
        id: String,
    },
    /// Combine with another clock, taking the pointwise maximum and
    /// installing entries absent from this clock.
    Merge(Clock),
}

impl Event {
    /// Attempts to assign the change to the supplied clock.
    ///
    /// Identifiers are passed through `shorten` before they are looked up
    /// or stored, so the clock only ever holds shortened keys. Callers
    /// without a shortener pass the identity function.
    ///
    /// Precondition failures leave the clock untouched:
    ///
    /// - `Set` fails with [`ClockError::EmptyIdentifier`] for an empty
    ///   identifier and [`ClockError::AlreadyInitialised`] for a present one.
    /// - `Tick` fails with [`ClockError::UnknownIdentifier`] for an absent
    ///   identifier.
    /// - `Merge` is defined for all inputs and never fails.
    pub fn apply(
        &self,
        clock: &mut Clock,
        shorten: impl Fn(&str) -> String,
    ) -> Result<(), ClockError> {
        match self {
            Event::Set { id, value } => {
                if id.is_empty() {
                    return Err(ClockError::EmptyIdentifier);
                }
                match clock.entry(shorten(id)) {
                    Entry::Vacant(entry) => {
                        entry.insert(*value);
                        Ok(())
                    }
                    Entry::Occupied(_) => Err(ClockError::AlreadyInitialised),
                }
            }
            Event::Tick { id } => match clock.get_mut(&shorten(id)) {
                Some(value) => {
                    *value += 1;
                    Ok(())
                }
                None => Err(ClockError::UnknownIdentifier),
            },
            Event::Merge(other) => {
                for (id, value) in other {
                    match clock.entry(shorten(id)) {
                        Entry::Vacant(entry) => {
                            entry.insert(*value);
                        }
                        Entry::Occupied(mut entry) => {
                            // pointwise maximum, counters never decrease
                            if *entry.get() < *value {
                                entry.insert(*value);
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// One state change in a clock's history.
///
/// Holds the event that produced the state and the clock after the event
/// was applied. Sequence numbers are contiguous from 0; the item at
/// sequence 0 carries no event, only the initial clock.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryItem {
    /// Position of this state change in the history.
    pub sequence: u64,
    /// The event that produced this state, or `None` for the initial state.
    pub event: Option<Event>,
    /// The clock after the event was applied.
    pub clock: Clock,
}
