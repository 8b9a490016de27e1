//! Synthetic keys for engine-derived events.
//!
//! Every write the engine performs is tagged with a deterministic key built
//! from the sync purpose and the origin event id. The pair
//! `(calendar_id, provider_event_id)` is the idempotency key for all derived
//! writes; the two purposes use disjoint prefixes so their key namespaces
//! can never collide.

use kronos_domain::EventId;

/// Key prefix for mirror copies placed on the master calendar.
pub const MIRROR_KEY_PREFIX: &str = "sync_";

/// Key prefix for busy-block placeholders placed on source calendars.
pub const BUSY_KEY_PREFIX: &str = "busy_";

/// Why a derived event exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPurpose {
    /// Copy of a source event on the master calendar.
    Mirror,
    /// Opaque placeholder on a source calendar for an event that lives on a
    /// different source calendar.
    Busy,
}

impl SyncPurpose {
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Self::Mirror => MIRROR_KEY_PREFIX,
            Self::Busy => BUSY_KEY_PREFIX,
        }
    }
}

/// Map a purpose and origin event to the derived event's
/// `provider_event_id`. Deterministic and injective per purpose.
pub fn derive_key(purpose: SyncPurpose, origin_event_id: EventId) -> String {
    format!("{}{}", purpose.key_prefix(), origin_event_id)
}

/// Recover the purpose and origin event id from a derived key.
///
/// Returns `None` for organic provider event ids.
pub fn parse_key(key: &str) -> Option<(SyncPurpose, EventId)> {
    let (purpose, rest) = if let Some(rest) = key.strip_prefix(MIRROR_KEY_PREFIX) {
        (SyncPurpose::Mirror, rest)
    } else if let Some(rest) = key.strip_prefix(BUSY_KEY_PREFIX) {
        (SyncPurpose::Busy, rest)
    } else {
        return None;
    };
    rest.parse::<EventId>().ok().map(|origin| (purpose, origin))
}

/// True when the provider event id lives in a derived-key namespace.
///
/// Derived events are distinguished from organic ones solely by this
/// prefix, so the prefix alone decides membership.
pub fn is_derived_key(key: &str) -> bool {
    key.starts_with(MIRROR_KEY_PREFIX) || key.starts_with(BUSY_KEY_PREFIX)
}
