use super::{IdentifierShortener, ShortenerState, DEFAULT_SHORTENER};
use crate::ClockError;
use std::collections::HashMap;

/// The identity shortener, used when no shortener name is provided.
///
/// Stored keys are the caller's identifiers, so there is no reverse table
/// to maintain or ship.
pub struct NoOpShortener;

impl IdentifierShortener for NoOpShortener {
    fn name(&self) -> &str {
        DEFAULT_SHORTENER
    }

    fn shorten(&self, id: &str) -> String {
        id.to_owned()
    }

    fn recover(&self, short: &str) -> Result<String, ClockError> {
        Ok(short.to_owned())
    }

    fn serialise(&self) -> Result<Vec<u8>, ClockError> {
        let state = ShortenerState {
            name: self.name().to_owned(),
            table: HashMap::new(),
        };
        Ok(serde_json::to_vec(&state)?)
    }

    fn merge(&self, bytes: &[u8]) -> Result<(), ClockError> {
        let state: ShortenerState = serde_json::from_slice(bytes)?;
        if state.name != self.name() {
            return Err(ClockError::SerialisationMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shorten_and_recover_are_identity() {
        let shortener = NoOpShortener;
        assert_eq!(shortener.shorten("node-17"), "node-17");
        assert_eq!(shortener.recover("node-17").unwrap(), "node-17");
    }

    #[test]
    fn serialised_state_round_trips() {
        let shortener = NoOpShortener;
        let bytes = shortener.serialise().unwrap();
        shortener.merge(&bytes).unwrap();
    }

    #[test]
    fn merge_rejects_foreign_state() {
        let foreign = ShortenerState {
            name: "SHA256".to_owned(),
            table: HashMap::new(),
        };
        let bytes = serde_json::to_vec(&foreign).unwrap();
        assert_eq!(
            NoOpShortener.merge(&bytes),
            Err(ClockError::SerialisationMismatch)
        );
    }
}
