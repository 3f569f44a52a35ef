//! A vector clock that supports concurrent use across multiple tasks.
//!
//! The [`VClock`] handle fronts a single-writer worker task that owns the
//! clock state: every operation is sent over a request queue and answered
//! on a per-call response channel, so no locks guard the clock itself.
//! Clocks can optionally record their full event history for replay, and
//! can serialise themselves to bytes that a peer process reconstructs with
//! [`from_bytes`].
//!
//! Identifier shortening (see [`vclock_api::shortener`]) keeps the memory
//! footprint down when participant identifiers are large strings.
//!
//! ## Example
//!
//! ```
//! use vclock::{Clock, VClock};
//!
//! let (cancel, scope) = smol::channel::unbounded::<()>();
//!
//! smol::block_on(async {
//!     let clock = VClock::new(scope, Clock::new(), "").unwrap();
//!
//!     clock.set("a", 0).await.unwrap();
//!     clock.tick("a").await.unwrap();
//!     assert_eq!(clock.get("a").await, (1, true));
//!
//!     clock.close();
//! });
//!
//! drop(cancel);
//! ```

pub use crate::clock::{from_bytes, from_bytes_with_history, VClock};
pub use vclock_api::{
    compare, shorteners, Clock, ClockError, Conditions, Event, HistoryItem, IdentifierShortener,
    NoOpShortener, Sha256Shortener, ShortenerRegistry, DEFAULT_SHORTENER, SHA256_SHORTENER,
};

mod actor;
mod clock;
mod history;
mod messages;
