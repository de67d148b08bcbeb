// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Versioned, single-writer state cells.
//!
//! Every mutation goes through acquire, compute and publish: a writer takes the
//! exclusive handle, builds the next value on a private copy and publishes it
//! with a compare-and-swap on the version it started from. Readers always see
//! one complete snapshot.

use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("state version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },
}

/// An immutable, versioned view of `S`.
#[derive(Debug)]
pub struct Snapshot<S> {
    version: u64,
    state: Arc<S>,
}

impl<S> Clone for Snapshot<S> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            state: self.state.clone(),
        }
    }
}

impl<S> Snapshot<S> {
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<S> std::ops::Deref for Snapshot<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.state
    }
}

#[derive(Debug)]
pub struct StateHandle<S> {
    current: RwLock<Snapshot<S>>,
    writer: Mutex<()>,
}

impl<S: Default> Default for StateHandle<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> StateHandle<S> {
    pub fn new(state: S) -> Self {
        Self {
            current: RwLock::new(Snapshot {
                version: 0,
                state: Arc::new(state),
            }),
            writer: Mutex::new(()),
        }
    }

    /// Returns the latest published snapshot without taking the writer lock.
    pub fn snapshot(&self) -> Snapshot<S> {
        self.current.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Takes the exclusive writer handle. Only one guard exists at a time.
    pub fn acquire(&self) -> StateGuard<'_, S> {
        let lock = self.writer.lock();
        let base = self.snapshot();
        StateGuard {
            handle: self,
            base,
            _lock: lock,
        }
    }

    fn compare_and_swap(&self, expected: u64, next: S) -> Result<u64, StateError> {
        let mut current = self.current.write();
        if current.version != expected {
            return Err(StateError::VersionConflict {
                expected,
                found: current.version,
            });
        }
        *current = Snapshot {
            version: expected + 1,
            state: Arc::new(next),
        };
        Ok(current.version)
    }
}

impl<S: Clone> StateHandle<S> {
    /// Runs `f` against a copy of the current state and publishes the copy if
    /// `f` succeeds. On error the published snapshot is left untouched.
    pub fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut S) -> Result<R, E>,
        E: From<StateError>,
    {
        let mut guard = self.acquire();
        let mut next = guard.state().clone();
        let ret = f(&mut next)?;
        guard.publish(next)?;
        Ok(ret)
    }
}

/// Exclusive writer handle on a [`StateHandle`].
pub struct StateGuard<'a, S> {
    handle: &'a StateHandle<S>,
    base: Snapshot<S>,
    _lock: MutexGuard<'a, ()>,
}

impl<S> StateGuard<'_, S> {
    /// The state as of the last publish through this guard.
    pub fn state(&self) -> &S {
        &self.base
    }

    /// Atomically replaces the published state. The guard stays valid and
    /// subsequent publishes build on `next`.
    pub fn publish(&mut self, next: S) -> Result<u64, StateError> {
        let version = self.handle.compare_and_swap(self.base.version, next)?;
        self.base = self.handle.snapshot();
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl From<StateError> for Boom {
        fn from(_: StateError) -> Self {
            Boom
        }
    }

    #[test]
    fn failed_transaction_leaves_snapshot_untouched() {
        let handle = StateHandle::new(vec![1u64]);
        let before = handle.snapshot();

        let res: Result<(), Boom> = handle.transaction(|s| {
            s.push(2);
            Err(Boom)
        });
        assert!(res.is_err());
        assert_eq!(handle.version(), before.version());
        assert_eq!(*handle.snapshot(), vec![1]);

        let res: Result<usize, Boom> = handle.transaction(|s| {
            s.push(3);
            Ok(s.len())
        });
        assert_eq!(res.unwrap(), 2);
        assert_eq!(handle.version(), 1);
        assert_eq!(*handle.snapshot(), vec![1, 3]);
        // Old snapshots stay readable.
        assert_eq!(*before, vec![1]);
    }

    #[test]
    fn publish_rejects_stale_version() {
        let handle = StateHandle::new(0u32);
        assert_eq!(
            handle.compare_and_swap(5, 1),
            Err(StateError::VersionConflict {
                expected: 5,
                found: 0
            })
        );
        let mut guard = handle.acquire();
        assert_eq!(guard.publish(7), Ok(1));
        assert_eq!(guard.publish(8), Ok(2));
        assert_eq!(*guard.state(), 8);
    }
}
