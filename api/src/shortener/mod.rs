//! Identifier shortening for clocks whose identifiers are large strings.
//!
//! A clock stores one counter per participant identifier. When identifiers
//! are long (URLs, certificate subjects, ...), storing them verbatim in
//! every snapshot and history item multiplies the memory footprint. An
//! [`IdentifierShortener`] maps caller identifiers to a compact storage
//! form and back; the clock stores only the shortened keys and recovers the
//! originals on the way out.
//!
//! Shorteners are shared by name across all clocks in the process through
//! the [`shorteners`] registry, so that clocks decoded from serialised
//! bytes find the same reverse table that the encoding side shipped.

use crate::{sync_map::SyncMap, ClockError};
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

pub use self::{noop::NoOpShortener, sha256::Sha256Shortener, sha256::SHA256_SHORTENER};

mod noop;
mod sha256;

/// The name resolved when a caller requests the empty shortener name.
pub const DEFAULT_SHORTENER: &str = "NoOp";

/// Bidirectional mapping between caller identifiers and their stored form.
///
/// Implementations must be safe to share between tasks: the same instance
/// serves every clock constructed under its name, and stateful
/// implementations mutate their reverse table on every `shorten` call.
pub trait IdentifierShortener: Send + Sync {
    /// The name this shortener registers under. Unique within a process.
    fn name(&self) -> &str;

    /// Returns the stored form of the identifier. Idempotent; stateful
    /// implementations also record the reverse mapping.
    fn shorten(&self, id: &str) -> String;

    /// Returns the original identifier for a stored form.
    fn recover(&self, short: &str) -> Result<String, ClockError>;

    /// Emits the shortener's name and reverse table as a byte blob that
    /// [`merge`](Self::merge) on a peer can consume.
    fn serialise(&self) -> Result<Vec<u8>, ClockError>;

    /// Unions a serialised reverse table into this shortener.
    ///
    /// Fails with [`ClockError::SerialisationMismatch`] if the blob was
    /// produced under a different name, and with
    /// [`ClockError::ShortenerStateConflict`] if it maps an already-known
    /// stored form to a different original.
    fn merge(&self, bytes: &[u8]) -> Result<(), ClockError>;
}

/// Serialised shortener state: the producing shortener's name plus its
/// reverse table (stored form to original identifier).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub(crate) struct ShortenerState {
    pub(crate) name: String,
    pub(crate) table: HashMap<String, String>,
}

/// Process-wide registry of [`IdentifierShortener`] instances by name.
pub struct ShortenerRegistry {
    shorteners: SyncMap<String, Arc<dyn IdentifierShortener>>,
}

impl ShortenerRegistry {
    /// Returns the shortener registered under `name`, resolving the empty
    /// string to [`DEFAULT_SHORTENER`].
    pub fn get(&self, name: &str) -> Result<Arc<dyn IdentifierShortener>, ClockError> {
        let name = if name.is_empty() {
            DEFAULT_SHORTENER
        } else {
            name
        };
        self.shorteners
            .get(name)
            .ok_or(ClockError::UnknownShortener)
    }

    /// Adds the shortener under its own name.
    ///
    /// Registering a name twice fails with
    /// [`ClockError::ShortenerNameConflict`] and leaves the existing
    /// instance in place.
    pub fn register(&self, shortener: Arc<dyn IdentifierShortener>) -> Result<(), ClockError> {
        self.shorteners
            .insert(shortener.name().to_owned(), shortener, true)
            .map(|_| ())
            .map_err(|_| ClockError::ShortenerNameConflict)
    }

    /// Returns the sorted list of registered names.
    pub fn names(&self) -> Vec<String> {
        self.shorteners.keys()
    }
}

/// Returns the process-wide shortener registry.
///
/// [`NoOpShortener`] and [`Sha256Shortener`] are pre-registered under
/// `"NoOp"` and `"SHA256"`; callers may register further instances.
pub fn shorteners() -> &'static ShortenerRegistry {
    static REGISTRY: OnceLock<ShortenerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let noop: Arc<dyn IdentifierShortener> = Arc::new(NoOpShortener);
        let sha256: Arc<dyn IdentifierShortener> =
            Arc::new(Sha256Shortener::new(SHA256_SHORTENER));
        ShortenerRegistry {
            shorteners: SyncMap::with(HashMap::from([
                (DEFAULT_SHORTENER.to_owned(), noop),
                (SHA256_SHORTENER.to_owned(), sha256),
            ])),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_shorteners_are_registered() {
        let names = shorteners().names();
        assert!(names.contains(&DEFAULT_SHORTENER.to_owned()));
        assert!(names.contains(&SHA256_SHORTENER.to_owned()));
    }

    #[test]
    fn empty_name_resolves_to_default() {
        let shortener = shorteners().get("").unwrap();
        assert_eq!(shortener.name(), DEFAULT_SHORTENER);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(
            shorteners().get("nope").err(),
            Some(ClockError::UnknownShortener)
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        assert_eq!(
            shorteners().register(Arc::new(NoOpShortener)).err(),
            Some(ClockError::ShortenerNameConflict)
        );
    }

    #[test]
    fn custom_instances_can_register() {
        let custom = Arc::new(Sha256Shortener::new("sha256-registry-test"));
        shorteners().register(custom).unwrap();
        let found = shorteners().get("sha256-registry-test").unwrap();
        assert_eq!(found.name(), "sha256-registry-test");
    }
}
