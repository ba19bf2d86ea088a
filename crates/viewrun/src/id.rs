//! Correlation id generation.

use uuid::Uuid;
use viewrpc::CallId;

/// Mints correlation ids for outbound calls.
///
/// Ids only need to be unique among the calls outstanding on one bridge; the
/// bridge itself re-mints if a generator ever hands out a live id.
pub trait IdGenerator: Send + Sync + 'static {
    fn next(&self) -> CallId;
}

/// Random UUID v4 ids rendered as 32 lowercase hex characters.
///
/// Stateless, so nothing can reset and start repeating after a reload.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next(&self) -> CallId {
        CallId::new(Uuid::new_v4().simple().to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_uuid_ids_are_hex() {
        let id = UuidGenerator.next();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_uuid_ids_do_not_repeat() {
        let ids: HashSet<CallId> = (0..10_000).map(|_| UuidGenerator.next()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
