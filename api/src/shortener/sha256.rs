use super::{IdentifierShortener, ShortenerState};
use crate::{sync_map::SyncMap, ClockError};
use sha2::{Digest, Sha256};

/// The name the default [`Sha256Shortener`] instance registers under.
pub const SHA256_SHORTENER: &str = "SHA256";

/// Shortens identifiers to the hex-encoded SHA-256 digest of their bytes.
///
/// Digests are not invertible, so the shortener keeps an in-memory reverse
/// table populated by every [`shorten`](IdentifierShortener::shorten) call.
/// Serialised clock bytes ship that table alongside the clock; a decoding
/// peer merges it into its own instance so that recovery succeeds there
/// too.
///
/// ## Example
///
/// ```
/// use vclock_api::{IdentifierShortener, Sha256Shortener};
///
/// let shortener = Sha256Shortener::new("SHA256");
/// let short = shortener.shorten("a-rather-long-node-identifier");
///
/// assert_eq!(short.len(), 64);
/// assert_eq!(
///     shortener.recover(&short).unwrap(),
///     "a-rather-long-node-identifier"
/// );
/// ```
pub struct Sha256Shortener {
    name: String,
    reverse: SyncMap<String, String>,
}

impl Sha256Shortener {
    /// Creates an instance with an empty reverse table.
    pub fn new(name: impl Into<String>) -> Self {
        Sha256Shortener {
            name: name.into(),
            reverse: SyncMap::new(),
        }
    }
}

impl IdentifierShortener for Sha256Shortener {
    fn name(&self) -> &str {
        &self.name
    }

    fn shorten(&self, id: &str) -> String {
        let short = hex::encode(Sha256::digest(id.as_bytes()));
        // Same input always digests to the same output, overwrites are
        // no-ops
        let _ = self.reverse.insert(short.clone(), id.to_owned(), false);
        short
    }

    fn recover(&self, short: &str) -> Result<String, ClockError> {
        self.reverse.get(short).ok_or(ClockError::UnknownShort)
    }

    fn serialise(&self) -> Result<Vec<u8>, ClockError> {
        let state = ShortenerState {
            name: self.name.clone(),
            table: self.reverse.snapshot(),
        };
        Ok(serde_json::to_vec(&state)?)
    }

    fn merge(&self, bytes: &[u8]) -> Result<(), ClockError> {
        let state: ShortenerState = serde_json::from_slice(bytes)?;
        if state.name != self.name {
            return Err(ClockError::SerialisationMismatch);
        }
        self.reverse
            .try_union(state.table)
            .map_err(|_| ClockError::ShortenerStateConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shorten_is_idempotent() {
        let shortener = Sha256Shortener::new("sha256-test");
        let first = shortener.shorten("alpha");
        let second = shortener.shorten("alpha");
        assert_eq!(first, second);
    }

    #[test]
    fn recover_requires_a_previous_shorten() {
        let shortener = Sha256Shortener::new("sha256-test");
        let short = shortener.shorten("alpha");
        assert_eq!(shortener.recover(&short).unwrap(), "alpha");
        assert_eq!(
            shortener.recover("unknown-digest").err(),
            Some(ClockError::UnknownShort)
        );
    }

    #[test]
    fn serialised_table_transfers_recovery() {
        let source = Sha256Shortener::new("sha256-test");
        let short = source.shorten("alpha");

        let sink = Sha256Shortener::new("sha256-test");
        assert_eq!(sink.recover(&short).err(), Some(ClockError::UnknownShort));

        sink.merge(&source.serialise().unwrap()).unwrap();
        assert_eq!(sink.recover(&short).unwrap(), "alpha");
    }

    #[test]
    fn merge_rejects_foreign_state() {
        let source = Sha256Shortener::new("sha256-test");
        let sink = Sha256Shortener::new("sha256-other");
        assert_eq!(
            sink.merge(&source.serialise().unwrap()),
            Err(ClockError::SerialisationMismatch)
        );
    }

    #[test]
    fn merge_rejects_contradicting_tables() {
        let sink = Sha256Shortener::new("sha256-test");
        let short = sink.shorten("alpha");

        let state = ShortenerState {
            name: "sha256-test".to_owned(),
            table: std::collections::HashMap::from([(short, "beta".to_owned())]),
        };
        let bytes = serde_json::to_vec(&state).unwrap();
        assert_eq!(sink.merge(&bytes), Err(ClockError::ShortenerStateConflict));
    }
}
