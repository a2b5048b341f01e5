use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::info;

/// Lifecycle of a [`crate::FirebaseManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Uninitialized,
    Initializing,
    DependenciesAvailable,
    InitializeFailed,
    FetchingRemoteDefaults,
    RemoteDefaultsFetched,
    Initialized,
}

impl Status {
    /// Whether an initialization attempt is still moving through this state.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Status::Initializing
                | Status::DependenciesAvailable
                | Status::FetchingRemoteDefaults
                | Status::RemoteDefaultsFetched
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Uninitialized => "Uninitialized",
            Status::Initializing => "Initializing",
            Status::DependenciesAvailable => "DependenciesAvailable",
            Status::InitializeFailed => "InitializeFailed",
            Status::FetchingRemoteDefaults => "FetchingRemoteDefaults",
            Status::RemoteDefaultsFetched => "RemoteDefaultsFetched",
            Status::Initialized => "Initialized",
        };
        f.write_str(name)
    }
}

/// Holds the current [`Status`] and notifies subscribers when it changes.
///
/// Setting the value it already holds is a no-op: nothing is logged and no
/// subscriber wakes up.
///
/// Every accepted [`StatusCell::try_begin`] opens a new attempt identified by
/// its generation. Writes tagged with an older generation are ignored, so an
/// attempt that has been superseded cannot overwrite the running one.
#[derive(Debug)]
pub struct StatusCell {
    tx: watch::Sender<Status>,
    // Only mutated inside `send_if_modified`, which holds the channel lock.
    generation: AtomicU64,
    #[cfg(test)]
    history: std::sync::Mutex<Vec<Status>>,
}

impl StatusCell {
    /// Creates a cell in the `Uninitialized` state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Status::Uninitialized);
        Self {
            tx,
            generation: AtomicU64::new(0),
            #[cfg(test)]
            history: std::sync::Mutex::new(vec![Status::Uninitialized]),
        }
    }

    /// The current status.
    pub fn get(&self) -> Status {
        *self.tx.borrow()
    }

    /// Generation of the most recently started attempt.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `next`, returning `true` when it differs from the previous value.
    pub fn set(&self, next: Status) -> bool {
        self.update(|current| *current != next, next)
    }

    /// Stores `next` only while `generation` is still the running attempt.
    ///
    /// Returns `true` when the value changed.
    pub fn set_if_current(&self, generation: u64, next: Status) -> bool {
        self.update(
            |current| self.generation.load(Ordering::Acquire) == generation && *current != next,
            next,
        )
    }

    /// Moves to `Initializing` unless an attempt is already running.
    ///
    /// Returns the new attempt's generation, or `None` when the request must
    /// be dropped.
    pub fn try_begin(&self) -> Option<u64> {
        let mut began = None;
        self.update(
            |current| {
                if *current == Status::Initializing {
                    return false;
                }
                began = Some(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
                true
            },
            Status::Initializing,
        );
        began
    }

    /// Returns a receiver that wakes on every change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.tx.subscribe()
    }

    fn update<F>(&self, mut accept: F, next: Status) -> bool
    where
        F: FnMut(&Status) -> bool,
    {
        let changed = self.tx.send_if_modified(|current| {
            if !accept(current) {
                return false;
            }
            *current = next;
            #[cfg(test)]
            self.history
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(next);
            true
        });
        if changed {
            info!(status = %next, "Firebase status changed");
        }
        changed
    }

    /// Every value the cell has held, oldest first.
    #[cfg(test)]
    pub(crate) fn history(&self) -> Vec<Status> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
