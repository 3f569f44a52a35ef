//! The caller-facing vector clock handle and its constructors.

use crate::{
    actor::ClockActor,
    messages::{ClockRequest, ClockSerialisation},
};
use smol::channel::{self, Receiver, Sender};
use std::sync::Arc;
use vclock_api::{
    shorteners, Clock, ClockError, Conditions, HistoryItem, IdentifierShortener,
    DEFAULT_SHORTENER,
};

/// An instance of a vector clock that can support concurrent use across
/// multiple tasks.
///
/// All state lives in a single worker task; the handle only holds the
/// request queue. Methods take `&self`, so a clock wrapped in an
/// [`Arc`] can be driven from as many tasks as needed — operations are
/// applied in a total order, one at a time.
///
/// A clock stops accepting operations once [`close`](VClock::close) is
/// called or the cancellation scope passed at construction is closed; from
/// then on every operation fails with [`ClockError::ClosedClock`].
pub struct VClock {
    requests: Sender<ClockRequest>,
    scope: Receiver<()>,
    shortener: Arc<dyn IdentifierShortener>,
}

impl VClock {
    /// Returns a clock initialised with the specified entries, which will
    /// not maintain any history.
    ///
    /// The clock stops when `scope` is closed. The named shortener (which
    /// may be the empty string for the default) reduces the memory
    /// footprint of the clock when identifiers are large strings.
    pub fn new(
        scope: Receiver<()>,
        init: Clock,
        shortener_name: &str,
    ) -> Result<VClock, ClockError> {
        new_clock(scope, init, false, shortener_name, true)
    }

    /// Returns a clock initialised with the specified entries, which will
    /// maintain a full history of all updates until pruned.
    pub fn new_with_history(
        scope: Receiver<()>,
        init: Clock,
        shortener_name: &str,
    ) -> Result<VClock, ClockError> {
        new_clock(scope, init, true, shortener_name, true)
    }

    /// Stops the clock's worker task. Idempotent, also after cancellation.
    pub fn close(&self) {
        self.requests.close();
    }

    /// Assigns the specified value to the given identifier.
    ///
    /// The identifier must not be empty, nor can an identifier be set more
    /// than once.
    pub async fn set(&self, id: &str, value: u64) -> Result<(), ClockError> {
        self.call(|resp| ClockRequest::Set {
            id: id.to_owned(),
            value,
            resp,
        })
        .await?
    }

    /// Increments the clock entry with the specified identifier.
    ///
    /// Fails if the identifier is not present in the clock.
    pub async fn tick(&self, id: &str) -> Result<(), ClockError> {
        self.call(|resp| ClockRequest::Tick {
            id: id.to_owned(),
            resp,
        })
        .await?
    }

    /// Returns the latest value for the specified identifier, and whether
    /// the identifier was found at all. A closed clock reports `(0, false)`.
    pub async fn get(&self, id: &str) -> (u64, bool) {
        match self
            .call(|resp| ClockRequest::Get {
                id: id.to_owned(),
                resp,
            })
            .await
        {
            Ok(response) => (response.getter.value, response.found),
            Err(_) => (0, false),
        }
    }

    /// Returns a copy of the complete clock map. The caller may mutate the
    /// copy freely.
    pub async fn snapshot(&self) -> Result<Clock, ClockError> {
        self.call(|resp| ClockRequest::Snapshot {
            shortened: false,
            resp,
        })
        .await?
    }

    /// Returns a copy of each state the clock has moved through, oldest
    /// first.
    pub async fn history(&self) -> Result<Vec<Clock>, ClockError> {
        self.call(|resp| ClockRequest::History { resp }).await?
    }

    /// Returns each state change of the clock, including the event that
    /// produced it as well as the resulting state.
    pub async fn full_history(&self) -> Result<Vec<HistoryItem>, ClockError> {
        self.call(|resp| ClockRequest::FullHistory { resp }).await?
    }

    /// Returns the identifier holding the largest counter and its value.
    ///
    /// When several identifiers tie, one of them is returned; which one is
    /// unspecified. An empty or closed clock reports `("", 0)`.
    pub async fn last_update(&self) -> (String, u64) {
        match self.call(|resp| ClockRequest::LastUpdate { resp }).await {
            Ok(Ok(getter)) => (getter.id, getter.value),
            _ => (String::new(), 0),
        }
    }

    /// Combines the other clock into this one, taking the maximum of both
    /// values for every identifier and installing any that are absent.
    pub async fn merge(&self, other: &VClock) -> Result<(), ClockError> {
        let clock = other.snapshot().await?;
        self.call(|resp| ClockRequest::Merge { clock, resp }).await?
    }

    /// Resets the clock history, so that only the latest state remains.
    pub async fn prune(&self) -> Result<(), ClockError> {
        self.call(|resp| ClockRequest::Prune { resp }).await?
    }

    /// Returns an encoded form of the clock that [`from_bytes`] can
    /// reconstruct in another process.
    pub async fn bytes(&self) -> Result<Vec<u8>, ClockError> {
        let clock = self
            .call(|resp| ClockRequest::Snapshot {
                shortened: true,
                resp,
            })
            .await??;

        let encoded = ClockSerialisation {
            shortener: self.shortener.name().to_owned(),
            state: self.shortener.serialise()?,
            clock,
        };
        Ok(serde_json::to_vec(&encoded)?)
    }

    /// Creates a new clock bound to the same scope and initialised to this
    /// clock's current state.
    ///
    /// The copy never maintains history, regardless of how this clock was
    /// constructed, and its lifecycle is independent: closing one clock
    /// does not affect the other.
    pub async fn copy(&self) -> Result<VClock, ClockError> {
        let init = self.snapshot().await?;
        new_clock(self.scope.clone(), init, false, self.shortener.name(), true)
    }

    /// Returns true if the contents of the other clock exactly match this
    /// instance.
    pub async fn equal(&self, other: &VClock) -> Result<bool, ClockError> {
        self.compare(other, Conditions::EQUAL).await
    }

    /// Returns true if the contents of the other clock are either
    /// completely or partially distinct. Where partially distinct, matching
    /// identifiers in the clocks must have the same value.
    pub async fn concurrent(&self, other: &VClock) -> Result<bool, ClockError> {
        self.compare(other, Conditions::CONCURRENT).await
    }

    /// Returns true if the contents of the other clock show that it can
    /// have descended from this instance: all of this clock's identifiers
    /// are present in the other with values that are the same or greater,
    /// and the clocks are not equal.
    pub async fn descends_from(&self, other: &VClock) -> Result<bool, ClockError> {
        self.compare(other, Conditions::DESCENDANT).await
    }

    /// Returns true if the contents of this instance show that it can have
    /// descended from the other clock: all of the other clock's identifiers
    /// are present in this one with values that are the same or greater,
    /// and the clocks are not equal.
    pub async fn ancestor_of(&self, other: &VClock) -> Result<bool, ClockError> {
        self.compare(other, Conditions::ANCESTOR).await
    }

    async fn compare(&self, other: &VClock, conditions: Conditions) -> Result<bool, ClockError> {
        let other = other.snapshot().await?;
        self.call(|resp| ClockRequest::Compare {
            other,
            conditions,
            resp,
        })
        .await?
    }

    /// Sends a request to the worker and waits for its answer on the
    /// request's own response channel. Both the send and the receive fail
    /// with [`ClockError::ClosedClock`] once the worker has stopped.
    async fn call<T>(
        &self,
        build: impl FnOnce(Sender<T>) -> ClockRequest,
    ) -> Result<T, ClockError> {
        let (resp, answer) = channel::bounded(1);
        self.requests
            .send(build(resp))
            .await
            .map_err(|_| ClockError::ClosedClock)?;
        answer.recv().await.map_err(|_| ClockError::ClosedClock)
    }
}

/// Decodes a clock previously encoded with [`VClock::bytes`]. The new
/// clock does not maintain history.
///
/// The shortener that produced the encoded identifiers must be registered
/// in this process; its shipped reverse table is merged so recovery
/// succeeds locally. `shortener_name` selects the shortener for the new
/// clock (empty string for the default); when it differs from the encoding
/// side's, every identifier is recovered and re-shortened.
pub fn from_bytes(
    scope: Receiver<()>,
    data: &[u8],
    shortener_name: &str,
) -> Result<VClock, ClockError> {
    decode(scope, data, false, shortener_name)
}

/// Decodes a clock previously encoded with [`VClock::bytes`], maintaining
/// history from this point forwards.
pub fn from_bytes_with_history(
    scope: Receiver<()>,
    data: &[u8],
    shortener_name: &str,
) -> Result<VClock, ClockError> {
    decode(scope, data, true, shortener_name)
}

fn decode(
    scope: Receiver<()>,
    data: &[u8],
    maintain_history: bool,
    shortener_name: &str,
) -> Result<VClock, ClockError> {
    let encoded: ClockSerialisation = serde_json::from_slice(data)?;

    let desired = if shortener_name.is_empty() {
        DEFAULT_SHORTENER
    } else {
        shortener_name
    };

    let source = shorteners().get(&encoded.shortener)?;
    source.merge(&encoded.state)?;

    // The clock was serialised with shortened identifiers. If the desired
    // shortener matches the serialising side's, the map can be used as-is;
    // otherwise recover the original identifiers and re-shorten on init.
    if encoded.shortener == desired {
        new_clock(scope, encoded.clock, maintain_history, desired, false)
    } else {
        let recovered = encoded
            .clock
            .iter()
            .map(|(id, value)| Ok((source.recover(id)?, *value)))
            .collect::<Result<Clock, ClockError>>()?;
        new_clock(scope, recovered, maintain_history, desired, true)
    }
}

/// Starts a new clock, with or without history.
fn new_clock(
    scope: Receiver<()>,
    init: Clock,
    maintain_history: bool,
    shortener_name: &str,
    shorten_init: bool,
) -> Result<VClock, ClockError> {
    let shortener = shorteners().get(shortener_name)?;
    let (requests, queue) = channel::unbounded();

    ClockActor::spawn(
        scope.clone(),
        queue,
        init,
        maintain_history,
        shortener.clone(),
        shorten_init,
    );

    Ok(VClock {
        requests,
        scope,
        shortener,
    })
}
