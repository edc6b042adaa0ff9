//! Lock-free last-write-wins snapshot exchange.
//!
//! A writer on any thread commits a whole value with `publish`; the control
//! tick takes a copy of the latest committed value with `read`. The slot
//! holds an immutable `Arc<T>` swapped atomically, so a reader sees either the
//! old or the new snapshot, never a mix. `read` neither blocks nor allocates.
//! There is no queue: values published between two reads are skipped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::types::{BlockConfig, Config, ShootCommand};

pub struct Exchange<T> {
    slot: ArcSwap<T>,
    version: AtomicU64,
}

impl<T: Copy + core::fmt::Debug> core::fmt::Debug for Exchange<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Exchange")
            .field("value", &**self.slot.load())
            .field("version", &self.version())
            .finish()
    }
}

impl<T: Copy + Default> Default for Exchange<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy> Exchange<T> {
    /// Create an exchange returning `initial` until the first publish.
    pub fn new(initial: T) -> Self {
        Self {
            slot: ArcSwap::from_pointee(initial),
            version: AtomicU64::new(0),
        }
    }

    /// Commit a complete snapshot. Concurrent publishers: last one wins.
    ///
    /// Allocates; call from non-real-time code only.
    pub fn publish(&self, value: T) {
        self.slot.store(Arc::new(value));
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Copy out the latest committed snapshot.
    #[inline]
    pub fn read(&self) -> T {
        **self.slot.load()
    }

    /// Number of publishes so far (0 = still on the initial value).
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

/// The three exchanges the controller reads every tick.
///
/// Owned by the surrounding runtime; the controller only borrows it.
#[derive(Debug, Default)]
pub struct Exchanges {
    pub config: Exchange<Config>,
    pub block: Exchange<BlockConfig>,
    pub command: Exchange<ShootCommand>,
}

impl Exchanges {
    pub fn new() -> Self {
        Self::default()
    }
}
