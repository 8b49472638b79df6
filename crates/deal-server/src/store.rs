//! Versioned game-state store with optimistic concurrency.
//!
//! The engine is a pure reducer, so concurrent clients are serialized
//! here: read a versioned snapshot, compute the next state, and commit
//! only if the version is unchanged. [`StateStore::transact`] wraps the
//! read/compute/compare-and-swap loop with bounded retries.

use deal_core::GameState;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

pub type Version = u64;

/// Committed states kept for slow subscribers.
const UPDATE_BUFFER: usize = 64;
/// Attempts before a transaction gives up.
const MAX_RETRIES: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("state moved past version {expected} (now {actual})")]
pub struct WriteConflict {
    pub expected: Version,
    pub actual: Version,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Conflict(#[from] WriteConflict),

    #[error("gave up after {0} conflicting writes")]
    RetriesExhausted(u32),
}

struct Versioned {
    version: Version,
    state: GameState,
}

pub struct StateStore {
    inner: RwLock<Versioned>,
    updates: broadcast::Sender<GameState>,
}

impl StateStore {
    pub fn new(initial: GameState) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        StateStore {
            inner: RwLock::new(Versioned {
                version: 0,
                state: initial,
            }),
            updates,
        }
    }

    /// Snapshot the current state and its version.
    pub async fn read(&self) -> (Version, GameState) {
        let guard = self.inner.read().await;
        (guard.version, guard.state.clone())
    }

    /// Commit `next` if nothing was committed since `expected`. Every
    /// successful commit is pushed to subscribers.
    pub async fn write(
        &self,
        expected: Version,
        next: GameState,
    ) -> Result<Version, WriteConflict> {
        let mut guard = self.inner.write().await;
        if guard.version != expected {
            return Err(WriteConflict {
                expected,
                actual: guard.version,
            });
        }
        guard.version += 1;
        guard.state = next.clone();
        let version = guard.version;
        drop(guard);
        let _ = self.updates.send(next);
        Ok(version)
    }

    /// Receive every state committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<GameState> {
        self.updates.subscribe()
    }

    /// Read, compute, and commit; re-run `f` against the fresh state on
    /// each conflict.
    pub async fn transact<F>(&self, mut f: F) -> Result<GameState, StoreError>
    where
        F: FnMut(&GameState) -> GameState,
    {
        for _ in 0..MAX_RETRIES {
            let (version, state) = self.read().await;
            let next = f(&state);
            match self.write(version, next.clone()).await {
                Ok(_) => return Ok(next),
                Err(conflict) => {
                    tracing::debug!(%conflict, "transaction retry");
                }
            }
        }
        Err(StoreError::RetriesExhausted(MAX_RETRIES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::GameEvent;

    fn with_player(state: &GameState, id: &str) -> GameState {
        state.apply(&GameEvent::AddPlayer {
            id: id.to_string(),
            nickname: id.to_string(),
        })
    }

    #[tokio::test]
    async fn write_bumps_version() {
        let store = StateStore::new(GameState::new());
        let (version, state) = store.read().await;
        assert_eq!(version, 0);

        let next = with_player(&state, "p1");
        let committed = store.write(version, next.clone()).await.unwrap();
        assert_eq!(committed, 1);
        assert_eq!(store.read().await.1, next);
    }

    #[tokio::test]
    async fn stale_write_conflicts() {
        let store = StateStore::new(GameState::new());
        let (version, state) = store.read().await;

        store
            .write(version, with_player(&state, "p1"))
            .await
            .unwrap();
        let err = store
            .write(version, with_player(&state, "p2"))
            .await
            .unwrap_err();
        assert_eq!(err.expected, 0);
        assert_eq!(err.actual, 1);
    }

    #[tokio::test]
    async fn transact_retries_past_a_conflict() {
        let store = StateStore::new(GameState::new());
        let (version, state) = store.read().await;

        // a competing writer lands first
        let mut raced = false;
        let result = store
            .transact(|current| {
                if !raced {
                    raced = true;
                    // commit behind the transaction's back; the lock is
                    // free here so block_on resolves immediately
                    let interloper = with_player(&state, "racer");
                    futures_executor::block_on(store.write(version, interloper))
                        .unwrap();
                }
                with_player(current, "p1")
            })
            .await
            .unwrap();

        assert!(result.players.iter().any(|p| p.id == "racer"));
        assert!(result.players.iter().any(|p| p.id == "p1"));
        assert_eq!(store.read().await.0, 2);
    }

    #[tokio::test]
    async fn subscribers_see_every_commit() {
        let store = StateStore::new(GameState::new());
        let mut updates = store.subscribe();

        let committed = store.transact(|s| with_player(s, "p1")).await.unwrap();
        let seen = updates.recv().await.unwrap();
        assert_eq!(seen, committed);
    }
}
