//! The single-writer worker task behind a [`VClock`](crate::VClock).

use crate::{
    history::History,
    messages::{ClockRequest, Getter, GetterWithStatus},
};
use futures::{FutureExt, StreamExt};
use smol::channel::{Receiver, Sender};
use std::sync::Arc;
use vclock_api::{compare, Clock, ClockError, Event, IdentifierShortener};

/// Owns the clock state and serialises all operations.
///
/// The worker is the only task that ever touches the history, so the clock
/// needs no locks: concurrency safety falls out of the request queue.
pub(crate) struct ClockActor {
    history: History,
    maintain_history: bool,
    shortener: Arc<dyn IdentifierShortener>,
}

impl ClockActor {
    /// Starts a detached worker bound to the given cancellation scope.
    pub(crate) fn spawn(
        scope: Receiver<()>,
        requests: Receiver<ClockRequest>,
        init: Clock,
        maintain_history: bool,
        shortener: Arc<dyn IdentifierShortener>,
        shorten_init: bool,
    ) {
        let actor = ClockActor {
            history: History::new(init, shortener.clone(), shorten_init),
            maintain_history,
            shortener,
        };
        smol::spawn(actor.run(scope, requests)).detach();
    }

    async fn run(mut self, scope: Receiver<()>, requests: Receiver<ClockRequest>) {
        log::debug!("vector clock worker started");

        let queue = requests.clone();
        let requests = requests.fuse();
        let cancelled = scope.recv().fuse();
        smol::pin!(requests);
        smol::pin!(cancelled);

        loop {
            futures::select! {
                _ = cancelled => break,
                request = requests.next() => match request {
                    Some(request) => self.process(request),
                    None => break,
                },
            }
        }

        // Pending and future requests fail fast once the worker is gone;
        // their response senders are dropped unanswered.
        queue.close();
        log::debug!("vector clock worker stopped");
    }

    fn process(&mut self, request: ClockRequest) {
        if !self.maintain_history {
            // Prune on every request so the history never accumulates
            self.prune();
        }

        match request {
            ClockRequest::Set { id, value, resp } => {
                respond(&resp, self.history.apply(Event::Set { id, value }));
            }
            ClockRequest::Tick { id, resp } => {
                let result = if id.is_empty() {
                    Err(ClockError::EmptyIdentifier)
                } else {
                    self.history.apply(Event::Tick { id })
                };
                respond(&resp, result);
            }
            ClockRequest::Merge { clock, resp } => {
                respond(&resp, self.history.apply(Event::Merge(clock)));
            }
            ClockRequest::Get { id, resp } => {
                let value = self.history.latest().get(&self.shortener.shorten(&id));
                respond(
                    &resp,
                    GetterWithStatus {
                        found: value.is_some(),
                        getter: Getter {
                            id,
                            value: value.copied().unwrap_or(0),
                        },
                    },
                );
            }
            ClockRequest::Snapshot { shortened, resp } => {
                respond(&resp, self.history.latest_copy(shortened));
            }
            ClockRequest::History { resp } => {
                respond(&resp, self.history.range(0, self.history.last_id(), false));
            }
            ClockRequest::FullHistory { resp } => {
                respond(
                    &resp,
                    self.history.full_range(0, self.history.last_id(), false),
                );
            }
            ClockRequest::LastUpdate { resp } => {
                let mut id = "";
                let mut last = 0;
                for (key, value) in self.history.latest() {
                    if *value > last {
                        id = key;
                        last = *value;
                    }
                }
                let result = if id.is_empty() {
                    Ok(Getter {
                        id: String::new(),
                        value: last,
                    })
                } else {
                    self.shortener.recover(id).map(|id| Getter { id, value: last })
                };
                respond(&resp, result);
            }
            ClockRequest::Prune { resp } => {
                self.prune();
                respond(&resp, Ok(()));
            }
            ClockRequest::Compare {
                other,
                conditions,
                resp,
            } => {
                let other: Clock = other
                    .into_iter()
                    .map(|(id, value)| (self.shortener.shorten(&id), value))
                    .collect();
                respond(
                    &resp,
                    Ok(compare(self.history.latest(), &other, conditions)),
                );
            }
        }
    }

    /// Replaces the history with a fresh one seeded from the latest state.
    fn prune(&mut self) {
        self.history = History::new(
            self.history.latest().clone(),
            self.shortener.clone(),
            false,
        );
    }
}

fn respond<T>(resp: &Sender<T>, value: T) {
    if resp.try_send(value).is_err() {
        log::debug!("dropping response, the caller has gone away");
    }
}
