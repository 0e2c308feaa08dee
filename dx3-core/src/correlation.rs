//! Pending erosion-roll correlation.
//!
//! Entry erosion can be rolled by an external dice bot. When a player asks
//! for the roll, the requester is parked here; the dice bot's next result
//! in the same server is credited to them.
//!
//! The map holds **one slot per server**. A new request overwrites the
//! previous one, so two players rolling at the same moment in one server
//! cannot be told apart: the later requester receives the next result.
//! Slots older than the configured TTL are ignored.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::types::{CharacterKey, ServerId};

/// A parked roll request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRoll {
    /// Character the result will be applied to.
    pub character: CharacterKey,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
}

/// Single-slot-per-server request map.
#[derive(Debug)]
pub struct PendingRolls {
    slots: HashMap<ServerId, PendingRoll>,
    ttl: Duration,
}

impl PendingRolls {
    /// Create an empty map whose slots expire after `ttl_secs`.
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            slots: HashMap::new(),
            ttl: Duration::seconds(
                i64::try_from(ttl_secs)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1000),
            ),
        }
    }

    /// Park a request. Returns the request it displaced, if any was still
    /// live.
    pub fn request(&mut self, character: CharacterKey, now: DateTime<Utc>) -> Option<PendingRoll> {
        let server = character.server;
        let previous = self.slots.insert(
            server,
            PendingRoll {
                character,
                requested_at: now,
            },
        );
        previous.filter(|p| !self.is_expired(p, now))
    }

    /// Consume the server's slot if it is still live.
    pub fn take(&mut self, server: ServerId, now: DateTime<Utc>) -> Option<PendingRoll> {
        let pending = self.slots.remove(&server)?;
        (!self.is_expired(&pending, now)).then_some(pending)
    }

    /// Whether a live request is parked for `server`.
    #[must_use]
    pub fn is_pending(&self, server: ServerId, now: DateTime<Utc>) -> bool {
        self.slots
            .get(&server)
            .is_some_and(|p| !self.is_expired(p, now))
    }

    fn is_expired(&self, pending: &PendingRoll, now: DateTime<Utc>) -> bool {
        now - pending.requested_at > self.ttl
    }
}
