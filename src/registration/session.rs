//! Session store: in-memory conversation state keyed by user id.
//!
//! Each user owns one slot guarded by its own async mutex. Holding the
//! slot's guard is the only way to read-modify-write a session, so two
//! turns for the same user can never interleave, while different users
//! never contend beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::state::ConversationState;

type Slot = Arc<Mutex<Option<ConversationState>>>;

/// Exclusive access to one user's session. `None` means no live session.
pub type SessionGuard = OwnedMutexGuard<Option<ConversationState>>;

/// What [`SessionStore::peek`] saw in a user's slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPeek {
    /// No live session.
    Vacant,
    /// A turn for this user is in flight.
    Busy,
    Live(ConversationState),
}

/// Process-wide mapping from user id to conversation state.
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<i64, Slot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the user's slot, creating an empty one on first contact.
    ///
    /// Waits while another turn for the same user is in progress.
    pub async fn lock(&self, user_id: i64) -> SessionGuard {
        let existing = self.slots.read().await.get(&user_id).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let mut slots = self.slots.write().await;
                Arc::clone(slots.entry(user_id).or_default())
            }
        };
        slot.lock_owned().await
    }

    /// Snapshot of a user's session, if any. Waits for an in-flight turn.
    #[cfg(test)]
    pub(crate) async fn get(&self, user_id: i64) -> Option<ConversationState> {
        let slot = self.slots.read().await.get(&user_id).cloned()?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Snapshot of a user's session without waiting for an in-flight turn.
    pub async fn peek(&self, user_id: i64) -> SessionPeek {
        let Some(slot) = self.slots.read().await.get(&user_id).cloned() else {
            return SessionPeek::Vacant;
        };
        match slot.try_lock() {
            Ok(guard) => guard.clone().map_or(SessionPeek::Vacant, SessionPeek::Live),
            Err(_) => SessionPeek::Busy,
        }
    }

    /// Number of users with a live session.
    ///
    /// Never waits on a turn: a locked slot counts as live.
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.try_lock().map_or(true, |guard| guard.is_some()))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions idle for longer than `idle_timeout`, and empty slots.
    ///
    /// Slots that are locked or referenced by a pending turn are skipped.
    /// Returns the number of slots removed.
    pub async fn prune_stale(&self, idle_timeout: Duration) -> usize {
        // An unrepresentable timeout means nothing is ever idle enough.
        let cutoff = chrono::Duration::from_std(idle_timeout)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle));

        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|user_id, slot| {
            // Someone besides the map holds this slot: a turn is pending.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(guard) = slot.try_lock() else {
                return true;
            };
            let keep = match (guard.as_ref(), cutoff) {
                (Some(state), Some(cutoff)) => state.updated_at > cutoff,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !keep {
                tracing::debug!(user_id, "Pruning idle session");
            }
            keep
        });
        before - slots.len()
    }
}
