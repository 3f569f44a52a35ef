use std::sync::Arc;

use vclock_api::{Clock, ClockError, Event, HistoryItem, IdentifierShortener};

/// Records the states a clock has moved through, subject to pruning.
///
/// Every item holds the clock with shortened identifiers; the identifiers
/// are recovered on the way out when the caller asked for them. Applying an
/// event works on a copy of the latest state, so a failed apply leaves the
/// history untouched.
pub(crate) struct History {
    last_id: u64,
    items: Vec<HistoryItem>,
    shortener: Arc<dyn IdentifierShortener>,
}

impl History {
    /// Seeds a history with the given clock at sequence 0.
    ///
    /// `shorten_init` is disabled when the seed map already holds shortened
    /// identifiers, as when decoding serialised bytes under the same
    /// shortener that produced them.
    pub(crate) fn new(
        init: Clock,
        shortener: Arc<dyn IdentifierShortener>,
        shorten_init: bool,
    ) -> Self {
        let clock = if shorten_init {
            init.iter()
                .map(|(id, value)| (shortener.shorten(id), *value))
                .collect()
        } else {
            init
        };
        History {
            last_id: 0,
            items: vec![HistoryItem {
                sequence: 0,
                event: None,
                clock,
            }],
            shortener,
        }
    }

    /// Attempts to extend the history by applying the event.
    pub(crate) fn apply(&mut self, event: Event) -> Result<(), ClockError> {
        let mut clock = self.latest().clone();
        let shortener = self.shortener.clone();
        event.apply(&mut clock, |id| shortener.shorten(id))?;

        let next_id = self.last_id + 1;
        self.items.push(HistoryItem {
            sequence: next_id,
            event: Some(event),
            clock,
        });
        self.last_id = next_id;
        Ok(())
    }

    /// The current clock value, always with shortened identifiers.
    pub(crate) fn latest(&self) -> &Clock {
        &self.items[self.last_id as usize].clock
    }

    pub(crate) fn last_id(&self) -> u64 {
        self.last_id
    }

    /// A copy of the current clock, with either shortened or recovered
    /// identifiers.
    pub(crate) fn latest_copy(&self, shortened: bool) -> Result<Clock, ClockError> {
        if shortened {
            Ok(self.latest().clone())
        } else {
            self.recover_keys(self.latest())
        }
    }

    /// Copies of the clocks in the inclusive sequence range.
    ///
    /// The bounds are normalised so `from <= to`; indices beyond the latest
    /// sequence are silently clipped.
    pub(crate) fn range(
        &self,
        from: u64,
        to: u64,
        shortened: bool,
    ) -> Result<Vec<Clock>, ClockError> {
        let (from, to) = if from > to { (to, from) } else { (from, to) };
        let mut clocks = Vec::new();
        for item in self.items.iter().take(to as usize + 1).skip(from as usize) {
            if shortened {
                clocks.push(item.clock.clone());
            } else {
                clocks.push(self.recover_keys(&item.clock)?);
            }
        }
        Ok(clocks)
    }

    /// Copies of the history items in the inclusive sequence range,
    /// normalised and clipped like [`range`](Self::range).
    pub(crate) fn full_range(
        &self,
        from: u64,
        to: u64,
        shortened: bool,
    ) -> Result<Vec<HistoryItem>, ClockError> {
        let (from, to) = if from > to { (to, from) } else { (from, to) };
        let mut items = Vec::new();
        for item in self.items.iter().take(to as usize + 1).skip(from as usize) {
            if shortened {
                items.push(item.clone());
            } else {
                items.push(HistoryItem {
                    sequence: item.sequence,
                    event: item.event.clone(),
                    clock: self.recover_keys(&item.clock)?,
                });
            }
        }
        Ok(items)
    }

    fn recover_keys(&self, clock: &Clock) -> Result<Clock, ClockError> {
        clock
            .iter()
            .map(|(id, value)| Ok((self.shortener.recover(id)?, *value)))
            .collect()
    }
}
